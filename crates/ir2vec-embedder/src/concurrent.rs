//! Concurrent embedding generation.
//!
//! Embedding is CPU-bound, so each function runs on the tokio blocking
//! pool. The engine is shared read-only; results are returned in input
//! order.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use ir2vec_types::{Function, Granularity, ProgramUnit, UnitId};

use crate::engine::EmbeddingEngine;
use crate::error::EmbedError;
use crate::result::EmbeddingResult;

/// Embed `functions` concurrently, one blocking task per function.
///
/// Function `i` of the input is identified as function `i` in its result.
/// Declarations produce empty results. The first error is returned once
/// every task has finished.
pub async fn generate_concurrently(
    engine: Arc<EmbeddingEngine>,
    functions: Vec<Function>,
    granularity: Granularity,
) -> Result<Vec<EmbeddingResult>, EmbedError> {
    debug!(functions = functions.len(), %granularity, "Spawning embedding tasks");

    let handles = functions.into_iter().enumerate().map(|(index, function)| {
        let engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            let unit = ProgramUnit::Function {
                id: UnitId::function(index),
                function: &function,
            };
            engine.generate(unit, granularity)
        })
    });

    let results = try_join_all(handles)
        .await
        .map_err(|e| EmbedError::Join(e.to_string()))?;
    results.into_iter().collect()
}
