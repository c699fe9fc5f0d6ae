//! Domain-level errors
//! Fatal spawn conditions and configuration problems. Health-check failures
//! are not errors at this level: they are recorded as probe outcomes.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // Worker lifecycle errors
    #[error("Binary not found at: {0}")]
    BinaryNotFound(String),

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_not_found_message_names_path() {
        let err = DomainError::BinaryNotFound("/opt/kp/cliproxy".to_string());
        assert_eq!(err.to_string(), "Binary not found at: /opt/kp/cliproxy");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DomainError = io.into();
        assert!(matches!(err, DomainError::Io(ref msg) if msg.contains("denied")));
    }
}
