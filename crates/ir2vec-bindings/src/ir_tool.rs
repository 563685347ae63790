//! IR2Vec tool: embeddings, triplets and entity mappings of one IR module.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use ir2vec_embedder::{module_triplets, triplets, EmbeddingConfig, EmbeddingEngine, TripletResult};
use ir2vec_types::{EmbeddingMode, Flavor, Granularity, Module};
use ir2vec_vocab::{EntityTable, VocabularySource};

use crate::error::ToolError;
use crate::output::{self, EmbeddingList, FuncVecMap};

/// Embedding tool bound to one IR module and one vocabulary.
#[derive(Debug)]
pub struct Ir2VecTool {
    path: PathBuf,
    module: Module,
    engine: Arc<EmbeddingEngine>,
}

/// Parse a mode string (`sym` or `fa`).
fn parse_mode(mode: &str) -> Result<EmbeddingMode, ToolError> {
    match mode {
        "sym" => Ok(EmbeddingMode::Symbolic),
        "fa" => Ok(EmbeddingMode::FlowAware),
        _ => Err(ToolError::InvalidMode(
            "Invalid mode. Use 'sym' or 'fa'".to_string(),
        )),
    }
}

impl Ir2VecTool {
    /// Open `path` and initialize the vocabulary at `vocab_override`.
    ///
    /// Checks, in order: the file can be opened, the mode is `sym` or `fa`,
    /// the program decodes, the vocabulary path is not empty, and the
    /// vocabulary initializes.
    pub fn new(
        path: impl AsRef<Path>,
        mode: &str,
        vocab_override: &str,
    ) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if std::fs::File::open(path).is_err() {
            return Err(ToolError::InvalidFilePath(path.to_path_buf()));
        }
        let mode = parse_mode(mode)?;
        let module = output::read_module(path, Flavor::Ir)?;
        if vocab_override.is_empty() {
            return Err(ToolError::EmptyVocabPath);
        }
        let config = EmbeddingConfig::new(VocabularySource::path(vocab_override)).with_mode(mode);
        Self::build(path, module, config)
    }

    /// Open `path` with a full engine configuration.
    ///
    /// The flavor of `config` is forced to IR.
    pub fn with_config(path: impl AsRef<Path>, config: EmbeddingConfig) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let module = output::read_module(path, Flavor::Ir)?;
        if config.vocabulary.is_empty() {
            return Err(ToolError::EmptyVocabPath);
        }
        Self::build(path, module, config.with_flavor(Flavor::Ir))
    }

    fn build(path: &Path, module: Module, config: EmbeddingConfig) -> Result<Self, ToolError> {
        let engine = EmbeddingEngine::from_config(config).map_err(|source| ToolError::VocabularyInit {
            tool: "IR2Vec",
            source,
        })?;
        info!(
            path = ?path,
            functions = module.functions.len(),
            dim = engine.dimension().unwrap_or_default(),
            "IR2Vec tool initialized"
        );
        Ok(Self {
            path: path.to_path_buf(),
            module,
            engine: Arc::new(engine),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Shared handle to the engine, for concurrent generation.
    pub fn engine(&self) -> &Arc<EmbeddingEngine> {
        &self.engine
    }

    /// Function embeddings of every defined function, keyed by demangled
    /// name, with the actual symbol name alongside.
    pub fn func_vector_map(&self) -> Result<FuncVecMap, ToolError> {
        Ok(output::func_vector_map(&self.engine, &self.module)?)
    }

    /// Block embeddings of every defined function.
    pub fn bb_embeddings(&self) -> Result<EmbeddingList, ToolError> {
        Ok(output::labeled(&self.engine, &self.module, Granularity::Block, None)?)
    }

    /// Instruction embeddings of every defined function.
    pub fn inst_embeddings(&self) -> Result<EmbeddingList, ToolError> {
        Ok(output::labeled(&self.engine, &self.module, Granularity::Instruction, None)?)
    }

    /// Block embeddings of one function.
    pub fn function_bb_embeddings(&self, function: &str) -> Result<EmbeddingList, ToolError> {
        let index = output::defined_function(&self.module, function)?;
        Ok(output::labeled(&self.engine, &self.module, Granularity::Block, Some(index))?)
    }

    /// Instruction embeddings of one function.
    pub fn function_inst_embeddings(&self, function: &str) -> Result<EmbeddingList, ToolError> {
        let index = output::defined_function(&self.module, function)?;
        Ok(output::labeled(
            &self.engine,
            &self.module,
            Granularity::Instruction,
            Some(index),
        )?)
    }

    /// Triplets of the whole module.
    pub fn triplets(&self) -> Result<TripletResult, ToolError> {
        Ok(module_triplets(&self.module, &EntityTable::ir())?)
    }

    /// Triplets of one function.
    pub fn function_triplets(&self, function: &str) -> Result<TripletResult, ToolError> {
        let index = output::defined_function(&self.module, function)?;
        Ok(triplets(&self.module.functions[index], &EntityTable::ir())?)
    }

    /// Text listing at `level`, for one function or all of them.
    pub fn render_embeddings(
        &self,
        level: Granularity,
        function: Option<&str>,
    ) -> Result<String, ToolError> {
        let index = function
            .map(|name| {
                self.module
                    .function_index(name)
                    .ok_or_else(|| ToolError::FunctionNotFound(name.to_string()))
            })
            .transpose()?;
        Ok(output::render(&self.engine, &self.module, level, index)?)
    }
}

/// Open an IR program and initialize its vocabulary.
pub fn init_embedding(
    filename: impl AsRef<Path>,
    mode: &str,
    vocab_override: &str,
) -> Result<Ir2VecTool, ToolError> {
    Ir2VecTool::new(filename, mode, vocab_override)
}

/// IR entity names; the index of a name is its entity id.
pub fn entity_mappings() -> Vec<String> {
    EntityTable::ir().names()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VOCAB: &str = r#"{
        "Opcodes": {"Add": [1.0, 0.0], "Ret": [0.0, 1.0]},
        "Types": {"IntegerTy": [0.5, 0.5], "VoidTy": [0.0, 0.0]},
        "Arguments": {"Variable": [1.0, 1.0], "Constant": [0.0, 2.0]}
    }"#;

    const PROGRAM: &str = r#"{
        "name": "m",
        "flavor": "ir",
        "functions": [
            {
                "name": "_Z3addii",
                "demangled_name": "add(int, int)",
                "blocks": [
                    {"name": "entry", "instructions": [
                        {"opcode": "add", "ty": "i32", "result": "%3",
                         "operands": [{"kind": "Variable"}, {"kind": "Constant"}]},
                        {"opcode": "ret", "ty": "void", "operands": [{"kind": "Variable", "value": "%3"}]}
                    ]}
                ]
            },
            {"name": "printf", "declaration": true}
        ]
    }"#;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn setup() -> (tempfile::TempDir, PathBuf, String) {
        let dir = tempfile::tempdir().unwrap();
        let program = write(&dir, "m.json", PROGRAM);
        let vocab = write(&dir, "vocab.json", VOCAB);
        (dir, program, vocab.to_string_lossy().into_owned())
    }

    #[test]
    fn test_invalid_inputs() {
        let (_dir, program, vocab) = setup();

        let err = Ir2VecTool::new("/no/such/file.json", "sym", &vocab).unwrap_err();
        assert!(matches!(err, ToolError::InvalidFilePath(_)));

        let err = Ir2VecTool::new(&program, "dyn", &vocab).unwrap_err();
        assert_eq!(err.to_string(), "Invalid mode. Use 'sym' or 'fa'");

        let err = Ir2VecTool::new(&program, "sym", "").unwrap_err();
        assert!(matches!(err, ToolError::EmptyVocabPath));

        let err = Ir2VecTool::new(&program, "sym", "/no/such/vocab.json").unwrap_err();
        assert!(matches!(err, ToolError::VocabularyInit { tool: "IR2Vec", .. }));
    }

    #[test]
    fn test_func_vector_map() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym", &vocab).unwrap();
        let map = tool.func_vector_map().unwrap();

        assert_eq!(map.len(), 1);
        let (actual, embedding) = &map["add(int, int)"];
        assert_eq!(actual, "_Z3addii");
        assert_eq!(embedding.dimension(), 2);
    }

    #[test]
    fn test_lists() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "fa", &vocab).unwrap();

        let blocks = tool.bb_embeddings().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].0, "entry");

        let insts = tool.inst_embeddings().unwrap();
        assert_eq!(insts.len(), 2);
        assert_eq!(insts[1].0, "Ret VoidTy %3");

        assert_eq!(tool.function_inst_embeddings("_Z3addii").unwrap().len(), 2);
        assert!(matches!(
            tool.function_bb_embeddings("printf"),
            Err(ToolError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_triplets() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym", &vocab).unwrap();
        let result = tool.triplets().unwrap();
        // add: Type, Arg0, Arg1; ret: Next, Type, Arg0
        assert_eq!(result.len(), 6);
        assert_eq!(result.max_relation, 3);
    }

    #[test]
    fn test_render() {
        let (_dir, program, vocab) = setup();
        let tool = init_embedding(&program, "sym", &vocab).unwrap();
        let text = tool.render_embeddings(Granularity::Function, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Function: _Z3addii");
        assert!(lines[1].starts_with('['));
        assert_eq!(lines[2], "Function printf is a declaration, skipping.");

        let text = tool
            .render_embeddings(Granularity::Block, Some("add(int, int)"))
            .unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("entry ["));
    }

    #[test]
    fn test_entity_mappings() {
        let names = entity_mappings();
        assert_eq!(names[0], "Ret");
        assert!(names.contains(&"IntegerTy".to_string()));
        assert_eq!(names.last().map(String::as_str), Some("Variable"));
    }
}
