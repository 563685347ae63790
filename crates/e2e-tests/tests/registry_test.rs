//! Vocabulary registry tests: one load per path, shared across engines
//! and threads.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{Fixture, IR_VOCAB};
use ir2vec_embedder::{EmbeddingConfig, EmbeddingEngine};
use ir2vec_types::Flavor;
use ir2vec_vocab::{VocabularyLoadError, VocabularyRegistry, VocabularySource};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loads_share_one_vocabulary() {
    let fixture = Fixture::new();
    let registry = Arc::new(VocabularyRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let path = fixture.ir_vocab.clone();
            tokio::task::spawn_blocking(move || registry.get_or_load(&path, Flavor::Ir))
        })
        .collect();

    let mut loaded = Vec::new();
    for handle in handles {
        loaded.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(registry.load_count(), 1);
    assert_eq!(registry.len(), 1);
    for vocab in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], vocab));
    }
}

#[test]
fn test_engines_share_vocabulary() {
    let fixture = Fixture::new();
    let registry = VocabularyRegistry::new();
    let config = EmbeddingConfig::new(VocabularySource::path(&fixture.ir_vocab));

    let first = EmbeddingEngine::from_config_with(config.clone(), &registry).unwrap();
    let second = EmbeddingEngine::from_config_with(config, &registry).unwrap();

    assert!(Arc::ptr_eq(
        first.vocabulary().unwrap(),
        second.vocabulary().unwrap()
    ));
    assert_eq!(registry.load_count(), 1);
    assert_eq!(first.dimension(), Some(3));
}

#[test]
fn test_flavors_cached_separately() {
    let fixture = Fixture::new();
    let registry = VocabularyRegistry::new();

    registry.get_or_load(&fixture.mir_vocab, Flavor::Mir).unwrap();
    registry.get_or_load(&fixture.mir_vocab, Flavor::Mir).unwrap();
    assert_eq!(registry.load_count(), 1);

    // Same file read as IR keeps only the opcode section
    let as_ir = registry.get_or_load(&fixture.mir_vocab, Flavor::Ir).unwrap();
    assert_eq!(registry.load_count(), 2);
    assert_eq!(as_ir.flavor(), Flavor::Ir);
}

#[test]
fn test_failed_load_is_not_cached() {
    let fixture = Fixture::new();
    let registry = VocabularyRegistry::new();
    let path = fixture.path("late.json");

    let err = registry.get_or_load(&path, Flavor::Ir).unwrap_err();
    assert!(matches!(err, VocabularyLoadError::NotFound(_)));
    assert!(registry.is_empty());

    std::fs::write(&path, IR_VOCAB).unwrap();
    let vocab = registry.get_or_load(&path, Flavor::Ir).unwrap();
    assert_eq!(vocab.dimension(), 3);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_clear_keeps_engine_vocabulary() {
    let fixture = Fixture::new();
    let registry = VocabularyRegistry::new();
    let engine = EmbeddingEngine::from_config_with(
        EmbeddingConfig::new(VocabularySource::path(&fixture.ir_vocab)),
        &registry,
    )
    .unwrap();

    registry.clear();
    assert!(registry.is_empty());
    assert_eq!(engine.vocabulary().unwrap().len(), 9);

    registry.get_or_load(&fixture.ir_vocab, Flavor::Ir).unwrap();
    assert_eq!(registry.load_count(), 2);
}
