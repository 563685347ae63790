//! # ir2vec-types
//!
//! Shared domain types for IR2Vec / MIR2Vec embedding generation.
//!
//! This crate defines the data structures used throughout the workspace:
//! - Symbols: opcode, type, operand and register-class identifiers
//! - Flavors: IR and MIR symbol layouts and key normalization
//! - Program model: modules, functions, blocks, instructions, operands
//! - Embeddings: fixed-length `f64` vectors
//! - Options and settings: aggregation scheme, mode, unknown-symbol policy
//!
//! ## Usage
//!
//! ```rust
//! use ir2vec_types::{Flavor, Module};
//!
//! let module = Module::new("empty", Flavor::Ir);
//! assert!(module.functions.is_empty());
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod flavor;
pub mod options;
pub mod program;
pub mod symbol;

pub use config::{default_config_path, Settings, ENV_PREFIX};
pub use embedding::{Embedding, DEFAULT_TOLERANCE};
pub use error::TypesError;
pub use flavor::{
    normalize_ir_opcode, normalize_ir_type, normalize_mir_opcode, Flavor, IR_OPCODES,
    IR_OPERAND_KINDS, IR_TYPES, MIR_COMMON_OPERANDS,
};
pub use options::{
    AggregationScheme, EmbeddingMode, UnknownSymbolPolicy, WeightTable, DEFAULT_ARG_WEIGHT,
    DEFAULT_OPCODE_WEIGHT, DEFAULT_TYPE_WEIGHT,
};
pub use program::{
    BasicBlock, Function, Granularity, Instruction, Module, Operand, ProgramUnit, UnitId,
};
pub use symbol::{Symbol, SymbolClass, SymbolRef};
