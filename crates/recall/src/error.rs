//! Error types for Recall

use thiserror::Error;

/// Main error type for Recall operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// Lookup of an identifier that no tier holds
    #[error("Memory not found: {0}")]
    NotFound(String),

    /// An embedding-dependent operation was called without an embedder
    #[error("No embedder configured")]
    EmbedderUnavailable,

    /// Embedding service failures (network, timeout, bad response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Snapshot read/write failures
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecallError {
    /// Whether the caller can recover by changing its input or setup
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecallError::NotFound(_) | RecallError::EmbedderUnavailable
        )
    }
}

/// Result type alias for Recall operations
pub type Result<T> = std::result::Result<T, RecallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_id() {
        let err = RecallError::NotFound("lt_123".to_string());
        assert_eq!(err.to_string(), "Memory not found: lt_123");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(RecallError::NotFound("x".to_string()).is_recoverable());
        assert!(RecallError::EmbedderUnavailable.is_recoverable());
        assert!(!RecallError::Transport("timeout".to_string()).is_recoverable());
        assert!(!RecallError::Persistence("bad file".to_string()).is_recoverable());
        assert!(!RecallError::Config("bad toml".to_string()).is_recoverable());
    }
}
