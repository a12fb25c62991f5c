//! Error types for the landing page tracker.
//!
//! Tracker initialization has exactly two fatal failure modes: a missing
//! token and an unavailable sink. Both are logged and leave the tracker
//! inert; neither escapes the public initialization call. Anything the sink
//! itself rejects is logged and dropped, never fatal.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during tracker operations.
///
/// # Examples
///
/// ```
/// use landing_tracker::config::ConfigError;
/// use landing_tracker::error::TrackerError;
///
/// let err: TrackerError = ConfigError::MissingToken.into();
/// assert_eq!(err.to_string(), "configuration error: sink token is required");
/// ```
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The analytics sink is not present at initialization time.
    #[error("analytics sink unavailable: {0}")]
    DependencyUnavailable(String),

    /// File system I/O error (replay scripts).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = TrackerError::Configuration(ConfigError::MissingToken);
        assert_eq!(
            err.to_string(),
            "configuration error: sink token is required"
        );
    }

    #[test]
    fn dependency_unavailable_display() {
        let err = TrackerError::DependencyUnavailable("sink not loaded".to_string());
        assert_eq!(err.to_string(), "analytics sink unavailable: sink not loaded");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrackerError = io_err.into();
        assert!(matches!(err, TrackerError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let err: TrackerError = json_err.into();
        assert!(matches!(err, TrackerError::Json(_)));
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: TrackerError = io_err.into();
        assert!(err.source().is_some());
    }

    #[test]
    fn result_type_alias_works() {
        fn ok() -> Result<u8> {
            Ok(1)
        }
        fn fails() -> Result<u8> {
            Err(TrackerError::DependencyUnavailable("missing".into()))
        }

        assert!(ok().is_ok());
        assert!(fails().is_err());
    }
}
