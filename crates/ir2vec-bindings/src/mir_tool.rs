//! MIR2Vec tool.
//!
//! MIR vocabularies are target specific, so the vocabulary is supplied per
//! call. Loaded vocabularies are cached by the process-wide registry.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ir2vec_embedder::{module_triplets, EmbeddingConfig, EmbeddingEngine, TripletResult};
use ir2vec_types::{EmbeddingMode, Flavor, Granularity, Module};
use ir2vec_vocab::{EntityTable, VocabularyRegistry, VocabularySource};

use crate::error::ToolError;
use crate::output::{self, EmbeddingList, FuncVecMap};

/// Embedding tool bound to one MIR module.
#[derive(Debug)]
pub struct Mir2VecTool {
    path: PathBuf,
    module: Module,
    template: EmbeddingConfig,
}

impl Mir2VecTool {
    /// Open `path`. Only the `sym` mode is supported.
    pub fn new(path: impl AsRef<Path>, mode: &str) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if std::fs::File::open(path).is_err() {
            return Err(ToolError::InvalidFilePath(path.to_path_buf()));
        }
        if mode != "sym" {
            return Err(ToolError::InvalidMode(
                "Invalid mode. Only 'sym' mode supported.".to_string(),
            ));
        }
        let template = EmbeddingConfig::new(VocabularySource::path(""))
            .with_flavor(Flavor::Mir)
            .with_mode(EmbeddingMode::Symbolic);
        Self::with_config(path, template)
    }

    /// Open `path` with engine settings. The vocabulary of `template` is
    /// replaced on every call and its flavor is forced to MIR.
    pub fn with_config(path: impl AsRef<Path>, template: EmbeddingConfig) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let module = output::read_module(path, Flavor::Mir)?;
        info!(path = ?path, functions = module.functions.len(), "MIR2Vec tool opened");
        Ok(Self {
            path: path.to_path_buf(),
            module,
            template: template.with_flavor(Flavor::Mir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Engine for the target described by `vocab_path`.
    pub fn engine(&self, vocab_path: &str) -> Result<EmbeddingEngine, ToolError> {
        if vocab_path.is_empty() {
            return Err(ToolError::EmptyVocabPath);
        }
        let mut config = self.template.clone();
        config.vocabulary = VocabularySource::path(vocab_path);
        debug!(vocab = vocab_path, "Initializing MIR2Vec engine");
        EmbeddingEngine::from_config(config).map_err(|source| ToolError::VocabularyInit {
            tool: "MIR2Vec",
            source,
        })
    }

    fn entity_table(&self, vocab_path: &str) -> Result<EntityTable, ToolError> {
        if vocab_path.is_empty() {
            return Err(ToolError::EmptyVocabPath);
        }
        let vocab = VocabularyRegistry::global().get_or_load(Path::new(vocab_path), Flavor::Mir)?;
        Ok(EntityTable::from_vocabulary(&vocab))
    }

    /// MIR entity names for the target of `vocab_path`.
    pub fn entity_mappings(&self, vocab_path: &str) -> Result<Vec<String>, ToolError> {
        Ok(self.entity_table(vocab_path)?.names())
    }

    /// Triplets of the whole module.
    pub fn triplets(&self, vocab_path: &str) -> Result<TripletResult, ToolError> {
        let table = self.entity_table(vocab_path)?;
        Ok(module_triplets(&self.module, &table)?)
    }

    /// Function embeddings keyed by demangled name.
    pub fn func_vector_map(&self, vocab_path: &str) -> Result<FuncVecMap, ToolError> {
        let engine = self.engine(vocab_path)?;
        Ok(output::func_vector_map(&engine, &self.module)?)
    }

    /// Machine basic block embeddings of one function.
    pub fn mbb_embeddings(&self, function: &str, vocab_path: &str) -> Result<EmbeddingList, ToolError> {
        self.function_list(function, vocab_path, Granularity::Block)
    }

    /// Machine instruction embeddings of one function.
    pub fn minst_embeddings(&self, function: &str, vocab_path: &str) -> Result<EmbeddingList, ToolError> {
        self.function_list(function, vocab_path, Granularity::Instruction)
    }

    fn function_list(
        &self,
        function: &str,
        vocab_path: &str,
        granularity: Granularity,
    ) -> Result<EmbeddingList, ToolError> {
        let engine = self.engine(vocab_path)?;
        let index = output::defined_function(&self.module, function)?;
        Ok(output::labeled(&engine, &self.module, granularity, Some(index))?)
    }

    /// Text listing at `level`, for one function or all of them.
    pub fn render_embeddings(
        &self,
        vocab_path: &str,
        level: Granularity,
        function: Option<&str>,
    ) -> Result<String, ToolError> {
        let engine = self.engine(vocab_path)?;
        let index = function
            .map(|name| {
                self.module
                    .function_index(name)
                    .ok_or_else(|| ToolError::FunctionNotFound(name.to_string()))
            })
            .transpose()?;
        Ok(output::render(&engine, &self.module, level, index)?)
    }
}

/// Open a MIR program.
pub fn init_embedding(filename: impl AsRef<Path>, mode: &str) -> Result<Mir2VecTool, ToolError> {
    Mir2VecTool::new(filename, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &str = r#"{
        "Opcodes": {"ADD32rr": [1.0, 0.0], "RET64": [0.0, 1.0]},
        "CommonOperands": {"Immediate": [0.5, 0.5]},
        "PhysicalRegisters": {"GR32": [1.0, 1.0]},
        "VirtualRegisters": {"GR32": [2.0, 0.0]}
    }"#;

    const PROGRAM: &str = r#"{
        "name": "m",
        "flavor": "mir",
        "functions": [
            {
                "name": "main",
                "blocks": [
                    {"name": "bb.0", "instructions": [
                        {"opcode": "ADD32rr", "operands": [
                            {"class": "virtual_register", "kind": "GR32"},
                            {"class": "physical_register", "kind": "GR32"},
                            {"class": "operand", "kind": "Immediate"}
                        ]},
                        {"opcode": "RET64"}
                    ]}
                ]
            },
            {"name": "ext", "declaration": true}
        ]
    }"#;

    fn setup() -> (tempfile::TempDir, PathBuf, String) {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("m.json");
        std::fs::write(&program, PROGRAM).unwrap();
        let vocab = dir.path().join("vocab.json");
        std::fs::write(&vocab, VOCAB).unwrap();
        (dir, program, vocab.to_string_lossy().into_owned())
    }

    #[test]
    fn test_only_sym_mode() {
        let (_dir, program, _) = setup();
        let err = Mir2VecTool::new(&program, "fa").unwrap_err();
        assert_eq!(err.to_string(), "Invalid mode. Only 'sym' mode supported.");
        assert!(Mir2VecTool::new(&program, "sym").is_ok());
    }

    #[test]
    fn test_rejects_ir_program() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("ir.json");
        std::fs::write(&program, r#"{"flavor": "ir", "functions": []}"#).unwrap();
        assert!(matches!(
            Mir2VecTool::new(&program, "sym"),
            Err(ToolError::WrongFlavor { .. })
        ));
    }

    #[test]
    fn test_entity_mappings_and_triplets() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym").unwrap();

        let names = tool.entity_mappings(&vocab).unwrap();
        assert_eq!(&names[..2], &["ADD".to_string(), "RET".to_string()]);

        let result = tool.triplets(&vocab).unwrap();
        // ADD: Arg0, Arg1, Arg2; RET: Next
        assert_eq!(result.len(), 4);
        assert_eq!(result.max_relation, 4);

        assert!(matches!(tool.triplets(""), Err(ToolError::EmptyVocabPath)));
    }

    #[test]
    fn test_embeddings() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym").unwrap();

        let map = tool.func_vector_map(&vocab).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["main"].0, "main");

        let insts = tool.minst_embeddings("main", &vocab).unwrap();
        assert_eq!(insts.len(), 2);
        // weighted: ADD + 0.2 * (virt + phys + imm)
        let expected = [1.0 + 0.2 * 3.5, 0.2 * 1.5];
        for (got, want) in insts[0].1.values().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }

        let blocks = tool.mbb_embeddings("main", &vocab).unwrap();
        assert_eq!(blocks[0].0, "bb.0");

        let err = tool.mbb_embeddings("ext", &vocab).unwrap_err();
        assert_eq!(err.to_string(), "Function not found or is a declaration: ext");
        let err = tool.minst_embeddings("missing", &vocab).unwrap_err();
        assert!(matches!(err, ToolError::FunctionNotFound(_)));
    }

    #[test]
    fn test_render() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym").unwrap();
        let text = tool
            .render_embeddings(&vocab, Granularity::Instruction, None)
            .unwrap();
        assert!(text.starts_with("Function: main\n"));
        assert!(text.contains("Function ext is a declaration, skipping."));
    }
}
