//! Error types for the shared ir2vec types.

use thiserror::Error;

/// Errors raised while loading settings or decoding program documents.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Program document could not be decoded
    #[error("Invalid program document: {0}")]
    Program(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
