//! # ir2vec-embedder
//!
//! Embedding generation for IR2Vec / MIR2Vec.
//!
//! Features:
//! - Deterministic, lazy symbol traversal of functions, blocks and instructions
//! - `sum`, `average` and `weighted` aggregation
//! - Embedding engine with validated configuration and a terminal failure state
//! - Symbolic and flow-aware modes
//! - Triplet generation for vocabulary training
//! - Concurrent per-function generation on the tokio blocking pool
//!
//! ## Usage
//!
//! ```rust
//! use ir2vec_embedder::{EmbeddingConfig, EmbeddingEngine};
//! use ir2vec_types::{
//!     AggregationScheme, BasicBlock, Embedding, Function, Granularity, Instruction, Operand,
//!     ProgramUnit, Symbol,
//! };
//! use ir2vec_vocab::VocabularySource;
//!
//! let vocab = VocabularySource::Entries(vec![
//!     (Symbol::opcode("Ret"), Embedding::new(vec![1.0, 0.0])),
//!     (Symbol::operand("Variable"), Embedding::new(vec![0.0, 1.0])),
//! ]);
//! let engine = EmbeddingEngine::from_config(
//!     EmbeddingConfig::new(vocab).with_scheme(AggregationScheme::Sum),
//! )
//! .unwrap();
//!
//! let f = Function::new("f").with_block(
//!     BasicBlock::new("entry").with_instruction(Instruction::new("Ret").with_operand(Operand::kind("Variable"))),
//! );
//! let result = engine.generate(ProgramUnit::from_function(&f), Granularity::Function).unwrap();
//! assert_eq!(result.single().unwrap().values(), &[1.0, 1.0]);
//! ```

pub mod aggregator;
pub mod concurrent;
pub mod engine;
pub mod error;
pub mod result;
pub mod triplets;
pub mod walker;

pub use aggregator::{validate_weights, Aggregator};
pub use concurrent::generate_concurrently;
pub use engine::{EmbeddingConfig, EmbeddingEngine, EngineState};
pub use error::{ConfigurationError, EmbedError, MissingWeightError};
pub use result::{EmbeddingResult, UnitEmbedding};
pub use triplets::{
    module_triplets, triplets, Triplet, TripletResult, ARG_RELATION, NEXT_RELATION, TYPE_RELATION,
};
pub use walker::{
    instruction_symbols, instructions, preceding_instructions, walk, InstructionSymbols,
    Instructions, Slot, SymbolVisit, Walk,
};
