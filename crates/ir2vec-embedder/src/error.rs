//! Embedding error types.

use ir2vec_types::{EmbeddingMode, Flavor, Granularity, Symbol, SymbolClass};
use ir2vec_vocab::{UnknownSymbolError, VocabularyLoadError};
use thiserror::Error;

/// Invalid configuration or request, detected before any traversal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// No vocabulary source was given
    #[error("Vocabulary source is empty")]
    EmptyVocabularySource,

    /// Expected dimension of zero
    #[error("Expected dimension must be greater than zero")]
    InvalidDimension,

    /// Default vector with no values
    #[error("Default vector is empty")]
    EmptyDefaultVector,

    /// Default vector does not match the expected or loaded dimension
    #[error("Default vector dimension mismatch: expected {expected}, got {actual}")]
    DefaultVectorDimension { expected: usize, actual: usize },

    /// Loaded vocabulary does not have the expected dimension
    #[error("Vocabulary dimension mismatch: expected {expected}, got {actual}")]
    VocabularyDimension { expected: usize, actual: usize },

    /// Mode not available for the flavor
    #[error("Mode '{mode}' is not supported for {flavor}")]
    UnsupportedMode { flavor: Flavor, mode: EmbeddingMode },

    /// Program flavor differs from the engine flavor
    #[error("Program flavor {program} does not match engine flavor {engine}")]
    FlavorMismatch { engine: Flavor, program: Flavor },

    /// Requested granularity is coarser than the unit
    #[error("Cannot embed a {unit} unit at {requested} granularity")]
    Granularity {
        unit: Granularity,
        requested: Granularity,
    },

    /// Symbol absent from the vocabulary under the `fail-fast` policy
    #[error("Unknown symbol {0}")]
    UnknownSymbol(Symbol),
}

impl From<UnknownSymbolError> for ConfigurationError {
    fn from(err: UnknownSymbolError) -> Self {
        ConfigurationError::UnknownSymbol(err.0)
    }
}

/// The weight table does not cover every symbol class of the flavor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing weight for symbol class(es): {}", format_classes(.classes))]
pub struct MissingWeightError {
    pub classes: Vec<SymbolClass>,
}

fn format_classes(classes: &[SymbolClass]) -> String {
    classes
        .iter()
        .map(SymbolClass::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors returned by the embedding engine.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Vocabulary could not be loaded
    #[error("Vocabulary error: {0}")]
    VocabularyLoad(#[from] VocabularyLoadError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Weight table incomplete
    #[error("Weight error: {0}")]
    MissingWeight(#[from] MissingWeightError),

    /// Engine is in the terminal failed state
    #[error("Engine failed: {0}")]
    EngineFailed(String),

    /// Operation not allowed in the current state
    #[error("Invalid engine state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Concurrent task failed to complete
    #[error("Task error: {0}")]
    Join(String),
}

impl From<UnknownSymbolError> for EmbedError {
    fn from(err: UnknownSymbolError) -> Self {
        EmbedError::Configuration(err.into())
    }
}
