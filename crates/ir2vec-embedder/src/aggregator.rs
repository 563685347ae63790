//! Embedding aggregation.
//!
//! Two reductions are used when building embeddings:
//! - [`Aggregator::reduce`] turns the symbol vectors of one instruction into
//!   the instruction embedding.
//! - [`Aggregator::combine`] turns lower-level embeddings (instructions of a
//!   block, blocks of a function) into the higher-level one.
//!
//! `sum` and `weighted` combine by addition, so a function embedding equals
//! the sum of all of its instruction embeddings. `average` combines by mean,
//! which makes a mean of block means differ from the mean over all
//! instructions whenever blocks have unequal sizes.

use ir2vec_types::{AggregationScheme, Embedding, Flavor, SymbolClass, WeightTable};

use crate::error::MissingWeightError;

/// Check that `weights` covers every symbol class of `flavor`.
pub fn validate_weights(weights: &WeightTable, flavor: Flavor) -> Result<(), MissingWeightError> {
    let classes = weights.missing_classes(flavor);
    if classes.is_empty() {
        Ok(())
    } else {
        Err(MissingWeightError { classes })
    }
}

/// Reduction with a fixed scheme, weight table and dimension.
#[derive(Debug, Clone)]
pub struct Aggregator {
    scheme: AggregationScheme,
    weights: WeightTable,
    dimension: usize,
}

impl Aggregator {
    /// Build an aggregator. The `weighted` scheme requires a weight for every
    /// symbol class of `flavor`.
    pub fn new(
        scheme: AggregationScheme,
        weights: WeightTable,
        flavor: Flavor,
        dimension: usize,
    ) -> Result<Self, MissingWeightError> {
        if scheme == AggregationScheme::Weighted {
            validate_weights(&weights, flavor)?;
        }
        Ok(Self {
            scheme,
            weights,
            dimension,
        })
    }

    pub fn scheme(&self) -> AggregationScheme {
        self.scheme
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reduce the symbol vectors of one instruction.
    ///
    /// An empty sequence reduces to the zero vector.
    pub fn reduce<'a, I>(&self, items: I) -> Embedding
    where
        I: IntoIterator<Item = (SymbolClass, &'a Embedding)>,
    {
        let mut acc = Embedding::zeros(self.dimension);
        let mut count = 0usize;
        for (class, vector) in items {
            let factor = match self.scheme {
                AggregationScheme::Sum | AggregationScheme::Average => 1.0,
                // Validated in `new`
                AggregationScheme::Weighted => self.weights.get(class).unwrap_or(0.0),
            };
            acc.scaled_add(vector, factor);
            count += 1;
        }
        if self.scheme == AggregationScheme::Average && count > 0 {
            acc.scale(1.0 / count as f64);
        }
        acc
    }

    /// Combine lower-level embeddings: addition for `sum` and `weighted`,
    /// element-wise mean for `average`.
    ///
    /// An empty sequence combines to the zero vector.
    pub fn combine<'a, I>(&self, embeddings: I) -> Embedding
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut acc = Embedding::zeros(self.dimension);
        let mut count = 0usize;
        for embedding in embeddings {
            acc.accumulate(embedding);
            count += 1;
        }
        if self.scheme == AggregationScheme::Average && count > 0 {
            acc.scale(1.0 / count as f64);
        }
        acc
    }
}
