//! Cross-crate properties of vocabularies, walks and unknown-symbol
//! handling, exercised through files.

use pretty_assertions::assert_eq;

use e2e_tests::{assert_close, Fixture};
use ir2vec_embedder::{
    walk, ConfigurationError, EmbedError, EmbeddingConfig, EmbeddingEngine, EngineState,
};
use ir2vec_types::{
    AggregationScheme, Flavor, Granularity, Module, Symbol, UnitId, UnknownSymbolPolicy,
};
use ir2vec_vocab::{Vocabulary, VocabularyLoadError, VocabularyRegistry, VocabularySource};

const UNKNOWN_OPCODE_PROGRAM: &str = r#"{
    "flavor": "ir",
    "functions": [
        {"name": "known", "blocks": [{"name": "entry", "instructions": [{"opcode": "ret"}]}]},
        {"name": "odd", "blocks": [{"name": "entry", "instructions": [
            {"opcode": "freeze", "ty": "i32"},
            {"opcode": "ret"}
        ]}]}
    ]
}"#;

fn engine_with(fixture: &Fixture, policy: UnknownSymbolPolicy) -> EmbeddingEngine {
    let config = EmbeddingConfig::new(VocabularySource::path(&fixture.ir_vocab))
        .with_scheme(AggregationScheme::Sum)
        .with_unknown_symbol(policy)
        .with_default_vector(vec![10.0, 20.0, 30.0]);
    EmbeddingEngine::from_config_with(config, &VocabularyRegistry::new()).unwrap()
}

#[test]
fn test_mixed_dimension_file_rejected() {
    let fixture = Fixture::new();
    let path = fixture.write(
        "mixed.json",
        r#"{"Opcodes": {"Add": [1.0, 0.0]}, "Types": {"IntegerTy": [1.0, 0.0, 0.0]}}"#,
    );
    let err = Vocabulary::from_path(&path, Flavor::Ir).unwrap_err();
    assert!(matches!(
        err,
        VocabularyLoadError::DimensionMismatch {
            expected: 2,
            actual: 3,
            ..
        }
    ));

    let vocab = Vocabulary::from_path(&fixture.ir_vocab, Flavor::Ir).unwrap();
    for class in Flavor::Ir.classes() {
        for key in vocab.keys(*class) {
            let symbol = Symbol::new(*class, key);
            assert_eq!(vocab.lookup(symbol.borrowed()).unwrap().dimension(), 3);
        }
    }
}

#[test]
fn test_walk_is_restartable() {
    let fixture = Fixture::new();
    let module = Module::from_path(&fixture.ir_program).unwrap();
    let unit = module.unit(UnitId::function(0)).unwrap();

    for granularity in [Granularity::Function, Granularity::Block, Granularity::Instruction] {
        let first: Vec<_> = walk(unit, granularity).collect();
        let second: Vec<_> = walk(unit, granularity).collect();
        assert_eq!(first, second);
        // add: 4, mul: 4, br: 2, ret: 2
        assert_eq!(first.len(), 12);
    }

    let mut walker = walk(unit, Granularity::Block);
    walker.next();
    let resumed = walker.clone();
    assert_eq!(walker.collect::<Vec<_>>(), resumed.collect::<Vec<_>>());
}

#[test]
fn test_substitute_default_uses_configured_vector() {
    let fixture = Fixture::new();
    let program = fixture.write("odd.json", UNKNOWN_OPCODE_PROGRAM);
    let module = Module::from_path(&program).unwrap();
    let engine = engine_with(&fixture, UnknownSymbolPolicy::SubstituteDefault);

    let result = engine.generate_module(&module, Granularity::Instruction).unwrap();
    assert_eq!(result.len(), 3);
    // freeze -> default vector, i32 -> IntegerTy
    let freeze = result.get(UnitId::instruction(1, 0, 0)).unwrap();
    assert_close(freeze.values(), &[10.5, 20.0, 30.0]);
}

#[test]
fn test_fail_fast_returns_no_partial_result() {
    let fixture = Fixture::new();
    let program = fixture.write("odd.json", UNKNOWN_OPCODE_PROGRAM);
    let module = Module::from_path(&program).unwrap();
    let engine = engine_with(&fixture, UnknownSymbolPolicy::FailFast);

    let err = engine
        .generate_module(&module, Granularity::Function)
        .unwrap_err();
    match err {
        EmbedError::Configuration(ConfigurationError::UnknownSymbol(symbol)) => {
            assert_eq!(symbol.key, "Freeze");
        }
        other => panic!("Expected UnknownSymbol, got {other:?}"),
    }

    // A failed request leaves the engine usable
    assert_eq!(engine.state(), EngineState::Ready);
    let known = module.unit(UnitId::function(0)).unwrap();
    assert!(engine.generate(known, Granularity::Function).is_ok());
}

#[test]
fn test_expected_dimension_mismatch_fails_engine() {
    let fixture = Fixture::new();
    let config = EmbeddingConfig::new(VocabularySource::path(&fixture.ir_vocab))
        .with_expected_dimension(300);
    let err = EmbeddingEngine::from_config_with(config, &VocabularyRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        EmbedError::Configuration(ConfigurationError::VocabularyDimension {
            expected: 300,
            actual: 3
        })
    ));
}

#[test]
fn test_engine_rejects_other_flavor() {
    let fixture = Fixture::new();
    let engine = engine_with(&fixture, UnknownSymbolPolicy::SubstituteDefault);
    let module = Module::from_path(&fixture.mir_program).unwrap();
    let err = engine
        .generate_module(&module, Granularity::Function)
        .unwrap_err();
    assert!(matches!(
        err,
        EmbedError::Configuration(ConfigurationError::FlavorMismatch { .. })
    ));
}
