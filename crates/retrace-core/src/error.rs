//! Error types for Retrace operations
//!
//! The propagation policy follows one rule: anything that can change the
//! wrapped application's behavior (replay substitution failures, the
//! wrapped function's own errors) is surfaced to the caller, while purely
//! observational failures (record emission, value serialization) degrade
//! with a diagnostic log and never alter a call's outcome.

use thiserror::Error;

/// Result type alias for Retrace operations
pub type RetraceResult<T> = Result<T, RetraceError>;

/// Main error type for Retrace
#[derive(Error, Debug, Clone)]
pub enum RetraceError {
    /// A session-scoped operation was invoked with no active session
    #[error("no active session: {operation} requires a session scope")]
    NoActiveSession { operation: String },

    /// Evaluation was requested with a methodology that is not registered.
    /// The evaluation engine converts this into a failed `EvaluationResult`
    /// rather than surfacing it; it only escapes through direct registry use.
    #[error("unknown methodology: {name}")]
    UnknownMethodology { name: String },

    /// A value could not be serialized for capture or storage
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        context: Option<String>,
    },

    /// A record could not be delivered to its sink. Swallowed and logged at
    /// the call boundary; survives only where a sink is driven directly.
    #[error("emission error: {message}")]
    Emission { message: String },

    /// Replay substitution failed (see [`ReplayError`])
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Storage/persistence errors
    #[error("storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Configuration related errors
    #[error("configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// HTTP transport errors (remote store client)
    #[error("http error: {message}")]
    Http {
        message: String,
        url: Option<String>,
        status_code: Option<u16>,
    },

    /// An operation exceeded its deadline
    #[error("timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// Invalid input errors
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Resource not found
    #[error("not found: {message}")]
    NotFound { message: String },
}

impl RetraceError {
    /// Create a no-active-session error for the named operation
    pub fn no_active_session(operation: impl Into<String>) -> Self {
        Self::NoActiveSession {
            operation: operation.into(),
        }
    }

    /// Create an unknown-methodology error
    pub fn unknown_methodology(name: impl Into<String>) -> Self {
        Self::UnknownMethodology { name: name.into() }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            context: None,
        }
    }

    /// Create a serialization error with context
    pub fn serialization_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an emission error
    pub fn emission(message: impl Into<String>) -> Self {
        Self::Emission {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: None,
        }
    }

    /// Create a storage error with context
    pub fn storage_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an http error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            url: None,
            status_code: None,
        }
    }

    /// Create an http error carrying the failing URL and status
    pub fn http_with_status(
        message: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Http {
            message: message.into(),
            url: Some(url.into()),
            status_code: Some(status_code),
        }
    }

    /// Create a timeout error
    pub fn timeout(millis: u64) -> Self {
        Self::Timeout { millis }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error naming the offending field
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RetraceError {
    fn from(error: std::io::Error) -> Self {
        Self::storage(error.to_string())
    }
}

impl From<serde_json::Error> for RetraceError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

/// Error type for replay substitution failures.
///
/// These are execution-affecting: a historical value that cannot be applied
/// to the live call would silently change what the caller believes was
/// replayed, so the interceptor propagates them through the wrapped
/// function's own error type (`E: From<ReplayError>`). `anyhow::Error`
/// satisfies the bound out of the box; thiserror enums add a `#[from]`
/// variant.
#[derive(Debug, Error, Clone)]
pub enum ReplayError {
    /// A historical argument value could not be deserialized into the live
    /// parameter type
    #[error("replay override for argument {index} of `{label}` does not fit the live type: {message}")]
    ArgumentMismatch {
        label: String,
        index: usize,
        message: String,
    },

    /// A historical return value could not be deserialized into the live
    /// return type
    #[error("replay override for the return value of `{label}` does not fit the live type: {message}")]
    ReturnMismatch { label: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetraceError::no_active_session("install_replay_set");
        assert_eq!(
            err.to_string(),
            "no active session: install_replay_set requires a session scope"
        );

        let err = RetraceError::unknown_methodology("fuzzy_match");
        assert_eq!(err.to_string(), "unknown methodology: fuzzy_match");
    }

    #[test]
    fn test_replay_error_converts() {
        let replay = ReplayError::ReturnMismatch {
            label: "Svc.compute".to_string(),
            message: "expected u64".to_string(),
        };
        let err: RetraceError = replay.into();
        assert!(matches!(err, RetraceError::Replay(_)));
    }

    #[test]
    fn test_io_error_converts_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RetraceError = io.into();
        assert!(matches!(err, RetraceError::Storage { .. }));
    }
}
