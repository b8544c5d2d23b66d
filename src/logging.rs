//! Subscriber set-up for the `spm` binary.
//!
//! `RUST_LOG` filters (default `info`).  `SPM_LOG_FORMAT=json`, or building
//! with the `logs-json` feature, switches to one JSON object per line.
//! Records the library emits through `log` are bridged in.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "SPM_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Format for a `SPM_LOG_FORMAT` value.
    pub fn select(value: Option<&str>) -> Self {
        if cfg!(feature = "logs-json") {
            return Self::Json;
        }
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }

    pub fn from_env() -> Self {
        Self::select(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

/// Install the global subscriber.  Fails if one is already set.
pub fn init() -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(feature = "logs-json"))]
    fn test_select_format() {
        assert_eq!(LogFormat::select(None), LogFormat::Text);
        assert_eq!(LogFormat::select(Some("text")), LogFormat::Text);
        assert_eq!(LogFormat::select(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::select(Some(" json ")), LogFormat::Json);
    }

    #[test]
    #[cfg(feature = "logs-json")]
    fn test_feature_forces_json() {
        assert_eq!(LogFormat::select(None), LogFormat::Json);
    }
}
