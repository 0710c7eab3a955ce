use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Failed to read resolver file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Skipped line {line}: {reason}")]
    ParseSkip { line: usize, reason: String },

    #[error("Failed to bind DNS listener on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Forwarding failed: {0}")]
    Forward(String),

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("{path} was modified externally, leaving it untouched")]
    LockConflict { path: String },

    #[error("Invalid DNS message: {0}")]
    InvalidMessage(String),

    #[error("Namespace already registered: {0}")]
    NamespaceExists(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
