//! Runtime-configurable behavior of the strided transfer layer.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `STRATA_`) or by constructing a custom `StrataConfig`.

use crate::error::StrataError;
use std::str::FromStr;

/// How a strided request is handed to the underlying RMA primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StridedMethod {
    /// Describe both sides with a nested-block transfer type and issue a
    /// single typed operation under the target region's lock.
    #[default]
    Datatype,
    /// Flatten the request into an IO-vector of equal-length blocks and
    /// issue one vectorized operation.
    IoVector,
}

impl FromStr for StridedMethod {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datatype" | "direct" | "subarray" => Ok(StridedMethod::Datatype),
            "iov" | "iovec" | "iovector" => Ok(StridedMethod::IoVector),
            other => Err(StrataError::InvalidConfig(format!(
                "unknown strided method {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for StridedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StridedMethod::Datatype => f.write_str("datatype"),
            StridedMethod::IoVector => f.write_str("iov"),
        }
    }
}

/// Tuning parameters for strided operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrataConfig {
    /// Transfer strategy. Never changes the observable result.
    pub strided_method: StridedMethod,

    /// Hold the target region's lock around IO-vector transfers too, so both
    /// strategies serialize concurrent access to the same region.
    pub lock_iov_transfers: bool,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            strided_method: StridedMethod::Datatype,
            lock_iov_transfers: true,
        }
    }
}

impl StrataConfig {
    /// Config with the given strategy and defaults for everything else.
    pub fn with_method(strided_method: StridedMethod) -> Self {
        Self {
            strided_method,
            ..Self::default()
        }
    }

    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `STRATA_STRIDED_METHOD` (`datatype` | `iov`)
    /// - `STRATA_LOCK_IOV` (`1` | `0` | `true` | `false`)
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("STRATA_STRIDED_METHOD") {
            match v.parse::<StridedMethod>() {
                Ok(m) => cfg.strided_method = m,
                Err(e) => tracing::warn!("ignoring STRATA_STRIDED_METHOD: {e}"),
            }
        }
        if let Ok(v) = std::env::var("STRATA_LOCK_IOV") {
            match parse_flag(&v) {
                Some(b) => cfg.lock_iov_transfers = b,
                None => tracing::warn!(value = %v, "ignoring STRATA_LOCK_IOV"),
            }
        }

        cfg
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
