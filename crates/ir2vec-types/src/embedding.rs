//! Embedding vectors.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Tolerance used by [`Embedding::approx_eq`] when none is given.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// A fixed-length vector of `f64` values.
///
/// Unlike sentence embeddings, program embeddings are not normalized: the
/// magnitude of a block or function vector carries the size of the unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Embedding {
    values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            values: vec![0.0; dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// `self += other`.
    ///
    /// # Panics
    /// Panics if the dimensions differ.
    pub fn accumulate(&mut self, other: &Embedding) {
        self.scaled_add(other, 1.0);
    }

    /// `self += factor * other`.
    ///
    /// # Panics
    /// Panics if the dimensions differ.
    pub fn scaled_add(&mut self, other: &Embedding, factor: f64) {
        assert_eq!(
            self.values.len(),
            other.values.len(),
            "Embeddings must have same dimension"
        );
        for (dst, src) in self.values.iter_mut().zip(other.values.iter()) {
            *dst += factor * src;
        }
    }

    /// `self *= factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }

    /// Element-wise comparison within `tolerance` (absolute).
    pub fn approx_eq(&self, other: &Embedding, tolerance: f64) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Cosine similarity, 0.0 when either vector is zero or dimensions differ.
    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        let dot: f64 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();
        let norm_a = self.values.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b = other.values.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl Index<usize> for Embedding {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

/// Formats as `[ 1.00  0.50 ]`, two decimals per element.
impl fmt::Display for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for v in &self.values {
            write!(f, " {:.2} ", v)?;
        }
        f.write_str("]")
    }
}
