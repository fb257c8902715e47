//! Error types for the session store
//!
//! No operation performs I/O, so every failure is immediate and
//! deterministic. We use `thiserror` for the `Display` and `Error`
//! implementations.

use thiserror::Error;

/// Result type alias for session store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the session store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Caller supplied an argument outside the accepted domain
    /// (non-positive timestamp, negative expiry interval, bucket index out of range)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires an existing session that is not a tombstone
    #[error("No session found")]
    NoSession,

    /// A mutation was issued from a context that breaks the single-writer contract
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
}

impl Error {
    /// Shorthand for building an `InvalidArgument` error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// True for business-rule outcomes callers are expected to handle
    ///
    /// `NoSession` means "nothing to update"; everything else is a
    /// programming error on the caller side.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_argument() {
        let err = Error::invalid_argument("Timestamp must be greater than 0");
        let msg = err.to_string();
        assert!(msg.contains("Invalid argument"));
        assert!(msg.contains("Timestamp must be greater than 0"));
    }

    #[test]
    fn test_error_display_no_session() {
        assert_eq!(Error::NoSession.to_string(), "No session found");
    }

    #[test]
    fn test_error_display_precondition() {
        let err = Error::PreconditionViolation("bucket 3 writer re-entered".to_string());
        assert!(err.to_string().contains("bucket 3"));
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::NoSession.is_recoverable());
        assert!(!Error::invalid_argument("x").is_recoverable());
        assert!(!Error::PreconditionViolation("x".into()).is_recoverable());
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
