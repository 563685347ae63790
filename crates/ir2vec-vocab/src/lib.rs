//! # ir2vec-vocab
//!
//! Vocabulary store for IR2Vec / MIR2Vec.
//!
//! Features:
//! - JSON vocabulary loading with per-flavor sections and key normalization
//! - Dimension validation across all entries
//! - Unknown-symbol policy resolution
//! - Process-wide registry that loads each vocabulary file once
//! - Canonical entity layout for triplets and entity mappings
//!
//! ## Usage
//!
//! ```rust
//! use ir2vec_types::{Flavor, SymbolClass, SymbolRef};
//! use ir2vec_vocab::Vocabulary;
//!
//! let vocab = Vocabulary::from_json_str(r#"{"Opcodes": {"add": [1.0, 0.0]}}"#, Flavor::Ir).unwrap();
//! assert_eq!(vocab.dimension(), 2);
//! assert!(vocab.contains(SymbolRef::new(SymbolClass::Opcode, "Add")));
//! ```

pub mod entities;
pub mod error;
pub mod registry;
pub mod store;

pub use entities::EntityTable;
pub use error::{UnknownSymbolError, VocabularyLoadError};
pub use registry::VocabularyRegistry;
pub use store::{Vocabulary, VocabularySource};
