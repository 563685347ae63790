//! Binding-surface tests for the `ir2vec` and `mir2vec` namespaces.

use pretty_assertions::assert_eq;

use e2e_tests::{assert_close, Fixture};
use ir2vec_bindings::{ir2vec, mir2vec, resolve_version, ToolError, UNKNOWN_VERSION};
use ir2vec_embedder::{ARG_RELATION, NEXT_RELATION};
use ir2vec_types::Granularity;

#[test]
fn test_version_never_empty() {
    assert!(!ir2vec::version().is_empty());
    assert!(!mir2vec::version().is_empty());
    assert_eq!(resolve_version(None), UNKNOWN_VERSION);
    assert_eq!(resolve_version(Some("")), "Unknown");
}

#[test]
fn test_ir_init_errors() {
    let fixture = Fixture::new();
    let vocab = fixture.ir_vocab_str();

    let err = ir2vec::init_embedding(fixture.path("missing.ll.json"), "sym", &vocab).unwrap_err();
    assert!(matches!(err, ToolError::InvalidFilePath(_)));

    let err = ir2vec::init_embedding(&fixture.ir_program, "symbolic", &vocab).unwrap_err();
    assert_eq!(err.to_string(), "Invalid mode. Use 'sym' or 'fa'");

    let err = ir2vec::init_embedding(&fixture.ir_program, "fa", "").unwrap_err();
    assert_eq!(err.to_string(), "Error - Empty Vocab Path not allowed");

    let bad_vocab = fixture.write("bad.json", r#"{"Opcodes": {"Add": [1.0], "Ret": [1.0, 2.0]}}"#);
    let err = ir2vec::init_embedding(&fixture.ir_program, "sym", &bad_vocab.to_string_lossy())
        .unwrap_err();
    assert!(matches!(err, ToolError::VocabularyInit { tool: "IR2Vec", .. }));
}

#[test]
fn test_ir_render_listing() {
    let fixture = Fixture::new();
    let tool = ir2vec::init_embedding(&fixture.ir_program, "sym", &fixture.ir_vocab_str()).unwrap();

    let text = tool.render_embeddings(Granularity::Block, None).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Function: _Z3addii");
    assert!(lines[1].starts_with("entry ["));
    assert!(lines[2].starts_with("exit ["));
    assert_eq!(lines[3], "Function: main");
    assert_eq!(lines[5], "Function printf is a declaration, skipping.");
    assert_eq!(lines.len(), 6);
}

#[test]
fn test_ir_unknown_function() {
    let fixture = Fixture::new();
    let tool = ir2vec::init_embedding(&fixture.ir_program, "sym", &fixture.ir_vocab_str()).unwrap();

    let err = tool.function_bb_embeddings("printf").unwrap_err();
    assert_eq!(err.to_string(), "Function not found or is a declaration: printf");
    assert!(tool
        .render_embeddings(Granularity::Function, Some("nope"))
        .is_err());
}

#[test]
fn test_ir_triplets() {
    let fixture = Fixture::new();
    let tool = ir2vec::init_embedding(&fixture.ir_program, "sym", &fixture.ir_vocab_str()).unwrap();

    let result = tool.triplets().unwrap();
    // add: 3, mul: 4, br: 2, ret: 2, main ret: 2
    assert_eq!(result.len(), 13);
    assert_eq!(result.max_relation, ARG_RELATION + 1);

    let one = tool.function_triplets("main").unwrap();
    assert_eq!(one.len(), 2);
    assert!(one.triplets.iter().all(|t| t.relation != NEXT_RELATION));

    let names = ir2vec::entity_mappings();
    let add = names.iter().position(|n| n == "Add").unwrap();
    let first = &result.triplets[0];
    assert_eq!(first.head, add);
    assert_eq!(names[first.tail], "IntegerTy");
}

#[test]
fn test_mir_tool() {
    let fixture = Fixture::new();
    let vocab = fixture.mir_vocab_str();

    let err = mir2vec::init_embedding(&fixture.mir_program, "fa").unwrap_err();
    assert_eq!(err.to_string(), "Invalid mode. Only 'sym' mode supported.");

    let tool = mir2vec::init_embedding(&fixture.mir_program, "sym").unwrap();
    assert!(matches!(tool.triplets(""), Err(ToolError::EmptyVocabPath)));

    let names = tool.entity_mappings(&vocab).unwrap();
    assert_eq!(&names[..3], &["ADD", "MOV", "RET"]);

    let triplets = tool.triplets(&vocab).unwrap();
    assert_eq!(triplets.len(), 6);
    assert_eq!(triplets.max_relation, ARG_RELATION + 1);

    let map = tool.func_vector_map(&vocab).unwrap();
    assert_eq!(map.keys().map(String::as_str).collect::<Vec<_>>(), vec!["add"]);

    let insts = tool.minst_embeddings("add", &vocab).unwrap();
    assert_eq!(insts.len(), 3);
    // MOV + 0.2 * (virt GR32 + Immediate)
    assert_close(insts[0].1.values(), &[0.5, 1.1]);
    // RET alone
    assert_close(insts[2].1.values(), &[1.0, 1.0]);

    let blocks = tool.mbb_embeddings("add", &vocab).unwrap();
    let labels: Vec<&str> = blocks.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, vec!["bb.0", "bb.1"]);

    let err = tool.mbb_embeddings("abort", &vocab).unwrap_err();
    assert!(matches!(err, ToolError::FunctionNotFound(_)));
}

#[test]
fn test_mir_vocab_init_error() {
    let fixture = Fixture::new();
    let tool = mir2vec::init_embedding(&fixture.mir_program, "sym").unwrap();
    let err = tool
        .func_vector_map(&fixture.path("none.json").to_string_lossy())
        .unwrap_err();
    assert!(matches!(err, ToolError::VocabularyInit { tool: "MIR2Vec", .. }));
}
