//! One fetch of one concrete package version

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::crawl::fetcher::Fetcher;
use crate::crawl::report::{LicenseEntry, UNKNOWN_VERSION};
use crate::metadata::error::RegistryError;
use crate::metadata::types::PackageMetadata;

/// Observable fetch state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    NotStarted,
    InFlight,
    FetchedOk,
    FetchedError,
}

/// What a completion listener receives when a record settles
#[derive(Debug, Clone)]
pub enum Settlement {
    Fetched {
        name: String,
        version: String,
        metadata: Arc<PackageMetadata>,
    },
    /// The fetch failed. The error itself stays with the record.
    Failed,
}

/// Resolves exactly once with the settlement of the record it was taken from
pub type Completion = oneshot::Receiver<Settlement>;

#[derive(Debug)]
enum FetchState {
    NotStarted,
    InFlight,
    Fetched(Arc<PackageMetadata>),
    Failed(RegistryError),
}

#[derive(Debug)]
struct RecordState {
    fetch: FetchState,
    listeners: Vec<oneshot::Sender<Settlement>>,
}

/// A (name, version) pair and the outcome of fetching it.
///
/// Clones share state; the spawned fetch task holds one clone and settles it.
#[derive(Debug, Clone)]
pub struct VersionRecord {
    name: String,
    version: String,
    state: Arc<Mutex<RecordState>>,
}

impl VersionRecord {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            state: Arc::new(Mutex::new(RecordState {
                fetch: FetchState::NotStarted,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Record state is only ever replaced whole under the lock, so a poisoned
    /// guard still holds a consistent value.
    fn lock_state(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start fetching this version in the background. Only the first call
    /// has an effect. A registry that panics settles the record as
    /// [`RegistryError::Aborted`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn fetch(&self, fetcher: &Fetcher) {
        {
            let mut state = self.lock_state();
            if !matches!(state.fetch, FetchState::NotStarted) {
                return;
            }
            state.fetch = FetchState::InFlight;
        }

        debug!("Starting fetch of {}@{}", self.name, self.version);

        let record = self.clone();
        let fetcher = fetcher.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(fetcher.fetch(&record.name, &record.version))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("Fetch of {}@{} panicked", record.name, record.version);
                    Err(RegistryError::Aborted)
                });
            record.settle(outcome);
        });
    }

    /// Settle the record and notify listeners in registration order.
    ///
    /// Returns false without changing anything if the record already settled.
    pub(crate) fn settle(&self, outcome: Result<PackageMetadata, RegistryError>) -> bool {
        let (settlement, listeners) = {
            let mut state = self.lock_state();
            if matches!(state.fetch, FetchState::Fetched(_) | FetchState::Failed(_)) {
                return false;
            }

            let settlement = match outcome {
                Ok(metadata) => {
                    let metadata = Arc::new(metadata);
                    state.fetch = FetchState::Fetched(Arc::clone(&metadata));
                    Settlement::Fetched {
                        name: self.name.clone(),
                        version: self.version.clone(),
                        metadata,
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch {}@{}: {}", self.name, self.version, e);
                    state.fetch = FetchState::Failed(e);
                    Settlement::Failed
                }
            };

            (settlement, std::mem::take(&mut state.listeners))
        };

        for listener in listeners {
            // A dropped receiver means nobody is waiting any more.
            let _ = listener.send(settlement.clone());
        }

        true
    }

    /// Register a one-shot completion listener.
    ///
    /// If the record has already settled the returned future is ready, but
    /// it is only observed on the caller's next await.
    pub fn subscribe(&self) -> Completion {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock_state();

        let settled = match &state.fetch {
            FetchState::Fetched(metadata) => Some(Settlement::Fetched {
                name: self.name.clone(),
                version: self.version.clone(),
                metadata: Arc::clone(metadata),
            }),
            FetchState::Failed(_) => Some(Settlement::Failed),
            FetchState::NotStarted | FetchState::InFlight => None,
        };

        match settled {
            Some(settlement) => {
                let _ = tx.send(settlement);
            }
            None => state.listeners.push(tx),
        }

        rx
    }

    pub fn status(&self) -> FetchStatus {
        match self.lock_state().fetch {
            FetchState::NotStarted => FetchStatus::NotStarted,
            FetchState::InFlight => FetchStatus::InFlight,
            FetchState::Fetched(_) => FetchStatus::FetchedOk,
            FetchState::Failed(_) => FetchStatus::FetchedError,
        }
    }

    /// True once the fetch reached a terminal state, successful or not
    pub fn is_settled(&self) -> bool {
        matches!(
            self.status(),
            FetchStatus::FetchedOk | FetchStatus::FetchedError
        )
    }

    /// License of this version keyed by version token, or the captured error
    /// keyed by [`UNKNOWN_VERSION`]. `None` while the fetch is outstanding.
    pub fn extract_license(&self) -> Option<(String, LicenseEntry)> {
        match &self.lock_state().fetch {
            FetchState::Fetched(metadata) => Some((
                self.version.clone(),
                LicenseEntry::License(metadata.license_value()),
            )),
            FetchState::Failed(error) => Some((
                UNKNOWN_VERSION.to_string(),
                LicenseEntry::Failed {
                    error: error.to_string(),
                    version: self.version.clone(),
                },
            )),
            FetchState::NotStarted | FetchState::InFlight => None,
        }
    }
}
