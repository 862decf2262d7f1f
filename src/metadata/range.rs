//! Version range normalization
//!
//! The crawl fetches exactly one version per declared dependency range. A
//! normalizer decides which token that is; the registry is then asked for that
//! token verbatim.

use regex::Regex;

/// Dist-tag requested when a range names no concrete version
pub const LATEST_TAG: &str = "latest";

/// Trait for turning a declared version range into a single version token
pub trait RangeNormalizer: Send + Sync {
    /// Returns the version token to fetch for `range`
    fn normalize(&self, range: &str) -> String;
}

/// Strips comparison operators and keeps the first space-delimited token.
///
/// - `^1.2.3` -> `1.2.3`
/// - `~2.0.0` -> `2.0.0`
/// - `>=1.0.0 <2.0.0` -> `1.0.0`
/// - `1.0.0 - 2.0.0` -> `1.0.0`
/// - `^1.0.0 || ^2.0.0` -> `1.0.0`
/// - `*`, `x`, `""` -> `latest`
///
/// No range satisfaction is attempted: `^1.0.0` fetches `1.0.0` even when
/// newer compatible versions are published.
pub struct NaiveRangeNormalizer {
    operators: Regex,
}

impl NaiveRangeNormalizer {
    pub fn new() -> Self {
        Self {
            operators: Regex::new(r"[><=~^]+").expect("operator pattern is valid"),
        }
    }
}

impl Default for NaiveRangeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeNormalizer for NaiveRangeNormalizer {
    fn normalize(&self, range: &str) -> String {
        let stripped = self.operators.replace_all(range, "");
        let token = stripped.trim().split(' ').next().unwrap_or_default();

        match token {
            "" | "*" | "x" | "X" => LATEST_TAG.to_string(),
            token => token.to_string(),
        }
    }
}
