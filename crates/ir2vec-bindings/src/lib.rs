//! # ir2vec-bindings
//!
//! Tool surface for IR2Vec and MIR2Vec.
//!
//! Two namespaces, each with an explicit list of public items:
//! - [`ir2vec`]: `Ir2VecTool`, `init_embedding`, `entity_mappings`, `version`
//! - [`mir2vec`]: `Mir2VecTool`, `init_embedding`, `version`
//!
//! `version()` never fails: it reports the package version recorded at
//! build time, or `"Unknown"` when none was recorded.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ir2vec_bindings::ir2vec;
//!
//! let tool = ir2vec::init_embedding("module.json", "sym", "vocab.json")?;
//! for (demangled, (actual, embedding)) in tool.func_vector_map()? {
//!     println!("{demangled} ({actual}): {embedding}");
//! }
//! println!("ir2vec {}", ir2vec::version());
//! # Ok::<(), ir2vec_bindings::ToolError>(())
//! ```

pub mod error;
mod ir_tool;
mod mir_tool;
mod output;
mod version;

pub use error::ToolError;
pub use output::{EmbeddingList, FuncVecMap};
pub use version::{resolve_version, UNKNOWN_VERSION};

/// IR2Vec: embeddings of LLVM-style IR modules.
pub mod ir2vec {
    pub use crate::error::ToolError;
    pub use crate::ir_tool::{entity_mappings, init_embedding, Ir2VecTool};
    pub use crate::output::{EmbeddingList, FuncVecMap};
    pub use ir2vec_embedder::{Triplet, TripletResult};
    pub use ir2vec_types::{Embedding, Granularity};

    /// Package version, or `"Unknown"`.
    pub fn version() -> &'static str {
        crate::version::package_version()
    }
}

/// MIR2Vec: embeddings of machine IR modules.
pub mod mir2vec {
    pub use crate::error::ToolError;
    pub use crate::mir_tool::{init_embedding, Mir2VecTool};
    pub use crate::output::{EmbeddingList, FuncVecMap};
    pub use ir2vec_embedder::{Triplet, TripletResult};
    pub use ir2vec_types::{Embedding, Granularity};

    /// Package version, or `"Unknown"`.
    pub fn version() -> &'static str {
        crate::version::package_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_present() {
        assert!(!ir2vec::version().is_empty());
        assert_eq!(ir2vec::version(), mir2vec::version());
        assert_ne!(ir2vec::version(), UNKNOWN_VERSION);
    }
}
