//! Vocabulary error types.

use std::path::PathBuf;

use ir2vec_types::Symbol;
use thiserror::Error;

/// Errors that abort vocabulary loading.
#[derive(Debug, Error)]
pub enum VocabularyLoadError {
    /// Vocabulary file does not exist
    #[error("Vocabulary file not found: {0}")]
    NotFound(PathBuf),

    /// IO error while reading the source
    #[error("IO error reading vocabulary: {0}")]
    Io(#[from] std::io::Error),

    /// Source is not valid JSON
    #[error("Malformed vocabulary: {0}")]
    Malformed(String),

    /// A section has the wrong shape
    #[error("Invalid vocabulary section '{section}': {reason}")]
    InvalidSection { section: String, reason: String },

    /// An entry has no values
    #[error("Empty vector for {0}")]
    EmptyVector(Symbol),

    /// Entries disagree on dimensionality
    #[error("Dimension mismatch for {symbol}: expected {expected}, got {actual}")]
    DimensionMismatch {
        symbol: Symbol,
        expected: usize,
        actual: usize,
    },

    /// Two raw keys normalize to the same symbol with different vectors
    #[error("Conflicting entries for {0} after key normalization")]
    ConflictingEntry(Symbol),

    /// No usable entries
    #[error("Vocabulary has no entries")]
    Empty,
}

/// A symbol absent from the vocabulary under the `fail-fast` policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown symbol {0}")]
pub struct UnknownSymbolError(pub Symbol);
