//! Embedding results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ir2vec_types::{Embedding, Granularity, UnitId};

/// Embedding of one program unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEmbedding {
    pub id: UnitId,
    /// Function name, block name or instruction text
    pub label: String,
    pub embedding: Embedding,
}

/// Embeddings produced by one `generate` call, in program order.
///
/// Results are created fresh per call and share nothing with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub granularity: Granularity,
    pub entries: Vec<UnitEmbedding>,
}

impl EmbeddingResult {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, id: UnitId, label: impl Into<String>, embedding: Embedding) {
        self.entries.push(UnitEmbedding {
            id,
            label: label.into(),
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding of unit `id`.
    pub fn get(&self, id: UnitId) -> Option<&Embedding> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.embedding)
    }

    /// The embedding when the result holds exactly one unit.
    pub fn single(&self) -> Option<&Embedding> {
        match self.entries.as_slice() {
            [only] => Some(&only.embedding),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitEmbedding> {
        self.entries.iter()
    }

    /// Mapping from unit identity to embedding.
    pub fn to_map(&self) -> BTreeMap<UnitId, Embedding> {
        self.entries
            .iter()
            .map(|e| (e.id, e.embedding.clone()))
            .collect()
    }

    /// `(label, embedding)` pairs in program order.
    pub fn into_labeled(self) -> Vec<(String, Embedding)> {
        self.entries
            .into_iter()
            .map(|e| (e.label, e.embedding))
            .collect()
    }

    /// Append the entries of `other`.
    pub fn extend(&mut self, other: EmbeddingResult) {
        self.entries.extend(other.entries);
    }
}

impl IntoIterator for EmbeddingResult {
    type Item = UnitEmbedding;
    type IntoIter = std::vec::IntoIter<UnitEmbedding>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
