//! Registry metadata layer
//!
//! Everything the crawl needs to know about a single package version comes
//! through this layer: fetching its metadata from a remote registry and turning
//! a declared version range into the concrete token that gets fetched.
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching package metadata
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`range`]: Version range normalization
//! - [`semver`]: Ordering of version tokens
//! - [`types`]: The fetched metadata payload
//! - [`error`]: Error types for registry operations

pub mod error;
pub mod range;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
