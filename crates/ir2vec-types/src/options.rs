//! Embedding options shared by the engine, the tools and the CLI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::flavor::Flavor;
use crate::symbol::SymbolClass;

/// Default weight of opcode symbols.
pub const DEFAULT_OPCODE_WEIGHT: f64 = 1.0;
/// Default weight of type symbols.
pub const DEFAULT_TYPE_WEIGHT: f64 = 0.5;
/// Default weight of operand and register symbols.
pub const DEFAULT_ARG_WEIGHT: f64 = 0.2;

/// How operand vectors are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingMode {
    /// Operands contribute the vector of their operand kind
    #[default]
    #[serde(alias = "sym")]
    Symbolic,
    /// Operands defined by earlier instructions contribute that
    /// instruction's embedding
    #[serde(alias = "fa")]
    FlowAware,
}

impl EmbeddingMode {
    /// Short name used by the tools: `sym` or `fa`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Symbolic => "sym",
            EmbeddingMode::FlowAware => "fa",
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sym" | "symbolic" => Ok(EmbeddingMode::Symbolic),
            "fa" | "flow-aware" => Ok(EmbeddingMode::FlowAware),
            _ => Err("Invalid mode. Use 'sym' or 'fa'".to_string()),
        }
    }
}

/// Reduction applied to symbol vectors and to lower-level embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationScheme {
    /// Element-wise addition
    Sum,
    /// Element-wise mean
    Average,
    /// Per-class scalar weight, then addition
    #[default]
    Weighted,
}

impl AggregationScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationScheme::Sum => "sum",
            AggregationScheme::Average => "average",
            AggregationScheme::Weighted => "weighted",
        }
    }
}

impl fmt::Display for AggregationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationScheme::Sum),
            "average" | "avg" | "mean" => Ok(AggregationScheme::Average),
            "weighted" => Ok(AggregationScheme::Weighted),
            other => Err(format!(
                "unknown scheme '{}', expected sum, average or weighted",
                other
            )),
        }
    }
}

/// What to do when a symbol is not in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownSymbolPolicy {
    /// Use the configured default vector (zero vector unless configured)
    #[default]
    SubstituteDefault,
    /// Reject the whole request before any embedding is produced
    FailFast,
}

impl FromStr for UnknownSymbolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "substitute-default" => Ok(UnknownSymbolPolicy::SubstituteDefault),
            "fail-fast" => Ok(UnknownSymbolPolicy::FailFast),
            other => Err(format!(
                "unknown policy '{}', expected substitute-default or fail-fast",
                other
            )),
        }
    }
}

/// Per-class weights for the `weighted` scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: BTreeMap<SymbolClass, f64>,
}

impl Default for WeightTable {
    /// Opcode 1.0, type 0.5, operands and registers 0.2.
    fn default() -> Self {
        Self::new()
            .with(SymbolClass::Opcode, DEFAULT_OPCODE_WEIGHT)
            .with(SymbolClass::Type, DEFAULT_TYPE_WEIGHT)
            .with(SymbolClass::Operand, DEFAULT_ARG_WEIGHT)
            .with(SymbolClass::PhysicalRegister, DEFAULT_ARG_WEIGHT)
            .with(SymbolClass::VirtualRegister, DEFAULT_ARG_WEIGHT)
    }
}

impl WeightTable {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn with(mut self, class: SymbolClass, weight: f64) -> Self {
        self.weights.insert(class, weight);
        self
    }

    pub fn set(&mut self, class: SymbolClass, weight: f64) {
        self.weights.insert(class, weight);
    }

    pub fn get(&self, class: SymbolClass) -> Option<f64> {
        self.weights.get(&class).copied()
    }

    /// Classes of `flavor` that have no weight.
    pub fn missing_classes(&self, flavor: Flavor) -> Vec<SymbolClass> {
        flavor
            .classes()
            .iter()
            .copied()
            .filter(|class| !self.weights.contains_key(class))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolClass, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w))
    }
}
