//! Error types for the IR2Vec / MIR2Vec tools.

use std::path::PathBuf;

use ir2vec_embedder::{ConfigurationError, EmbedError};
use ir2vec_types::{Flavor, TypesError};
use ir2vec_vocab::VocabularyLoadError;
use thiserror::Error;

/// Errors raised by the tool layer.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Program file cannot be opened
    #[error("Invalid file path: {}", .0.display())]
    InvalidFilePath(PathBuf),

    /// Unsupported embedding mode string
    #[error("{0}")]
    InvalidMode(String),

    /// Vocabulary path was empty
    #[error("Error - Empty Vocab Path not allowed")]
    EmptyVocabPath,

    /// Vocabulary could not be initialized
    #[error("Failed to initialize {tool} vocabulary: {source}")]
    VocabularyInit {
        tool: &'static str,
        #[source]
        source: EmbedError,
    },

    /// Program document could not be decoded
    #[error("Failed to parse program file: {0}")]
    Parse(#[from] TypesError),

    /// Program flavor does not match the tool
    #[error("Expected a {expected} program, found {found}")]
    WrongFlavor { expected: Flavor, found: Flavor },

    /// Function missing or without a body
    #[error("Function not found or is a declaration: {0}")]
    FunctionNotFound(String),

    /// Embedding failed
    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Triplet generation failed
    #[error("Triplet error: {0}")]
    Triplets(#[from] ConfigurationError),

    /// Vocabulary load for entity layout failed
    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyLoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ToolError::EmptyVocabPath.to_string(),
            "Error - Empty Vocab Path not allowed"
        );
        assert_eq!(
            ToolError::FunctionNotFound("main".to_string()).to_string(),
            "Function not found or is a declaration: main"
        );
        assert!(ToolError::InvalidFilePath(PathBuf::from("/x.json"))
            .to_string()
            .starts_with("Invalid file path"));
    }
}
