//! Embedding engine.
//!
//! The engine validates its configuration, owns the vocabulary and turns
//! program units into embeddings:
//!
//! ```text
//! instruction = reduce(opcode, type, operands)
//! block       = combine(instructions)
//! function    = combine(blocks)
//! ```
//!
//! Lifecycle: `Unconfigured -> Configured -> Ready`. Any failure moves the
//! engine to `Failed`, which is terminal; build a new engine to retry.

use std::collections::{HashMap, HashSet};
use std::iter::Take;
use std::mem;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ir2vec_types::{
    AggregationScheme, Embedding, EmbeddingMode, Flavor, Function, Granularity, Instruction,
    Module, ProgramUnit, Settings, SymbolClass, SymbolRef, UnitId, UnknownSymbolPolicy,
    WeightTable,
};
use ir2vec_vocab::{Vocabulary, VocabularyRegistry, VocabularySource};

use crate::aggregator::{validate_weights, Aggregator};
use crate::error::{ConfigurationError, EmbedError};
use crate::result::EmbeddingResult;
use crate::walker::{instruction_symbols, instructions, preceding_instructions, Instructions, Slot};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub vocabulary: VocabularySource,
    pub flavor: Flavor,
    pub mode: EmbeddingMode,
    pub scheme: AggregationScheme,
    pub weights: WeightTable,
    pub unknown_symbol: UnknownSymbolPolicy,
    /// Vector substituted for unknown symbols; zero vector when unset
    pub default_vector: Option<Vec<f64>>,
    /// Reject vocabularies of any other dimension
    pub expected_dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Defaults: IR, symbolic, weighted, substitute-default.
    pub fn new(vocabulary: VocabularySource) -> Self {
        Self {
            vocabulary,
            flavor: Flavor::default(),
            mode: EmbeddingMode::default(),
            scheme: AggregationScheme::default(),
            weights: WeightTable::default(),
            unknown_symbol: UnknownSymbolPolicy::default(),
            default_vector: None,
            expected_dimension: None,
        }
    }

    /// Build from loaded settings. A missing vocabulary path is reported
    /// when the config is validated.
    pub fn from_settings(settings: &Settings) -> Self {
        let vocabulary = VocabularySource::Path(settings.expanded_vocab_path().unwrap_or_default());
        Self {
            vocabulary,
            flavor: settings.flavor,
            mode: settings.mode,
            scheme: settings.scheme,
            weights: settings.weights.clone(),
            unknown_symbol: settings.unknown_symbol,
            default_vector: settings.default_vector.clone(),
            expected_dimension: settings.expected_dimension,
        }
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_mode(mut self, mode: EmbeddingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scheme(mut self, scheme: AggregationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_unknown_symbol(mut self, policy: UnknownSymbolPolicy) -> Self {
        self.unknown_symbol = policy;
        self
    }

    pub fn with_default_vector(mut self, vector: Vec<f64>) -> Self {
        self.default_vector = Some(vector);
        self
    }

    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    /// Checks that need no vocabulary.
    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.vocabulary.is_empty() {
            return Err(ConfigurationError::EmptyVocabularySource.into());
        }
        if self.expected_dimension == Some(0) {
            return Err(ConfigurationError::InvalidDimension.into());
        }
        if let Some(vector) = &self.default_vector {
            if vector.is_empty() {
                return Err(ConfigurationError::EmptyDefaultVector.into());
            }
            if let Some(expected) = self.expected_dimension {
                if vector.len() != expected {
                    return Err(ConfigurationError::DefaultVectorDimension {
                        expected,
                        actual: vector.len(),
                    }
                    .into());
                }
            }
        }
        if self.flavor == Flavor::Mir && self.mode != EmbeddingMode::Symbolic {
            return Err(ConfigurationError::UnsupportedMode {
                flavor: self.flavor,
                mode: self.mode,
            }
            .into());
        }
        if self.scheme == AggregationScheme::Weighted {
            validate_weights(&self.weights, self.flavor)?;
        }
        Ok(())
    }
}

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unconfigured,
    Configured,
    Ready,
    /// Terminal
    Failed,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Unconfigured => "unconfigured",
            EngineState::Configured => "configured",
            EngineState::Ready => "ready",
            EngineState::Failed => "failed",
        }
    }
}

#[derive(Debug)]
enum Inner {
    Unconfigured,
    Configured(EmbeddingConfig),
    Ready(Box<ReadyEngine>),
    Failed(String),
}

impl Inner {
    fn state(&self) -> EngineState {
        match self {
            Inner::Unconfigured => EngineState::Unconfigured,
            Inner::Configured(_) => EngineState::Configured,
            Inner::Ready(_) => EngineState::Ready,
            Inner::Failed(_) => EngineState::Failed,
        }
    }

    fn state_error(&self, expected: EngineState) -> EmbedError {
        match self {
            Inner::Failed(reason) => EmbedError::EngineFailed(reason.clone()),
            other => EmbedError::InvalidState {
                expected: expected.as_str(),
                actual: other.state().as_str(),
            },
        }
    }
}

#[derive(Debug)]
struct ReadyEngine {
    config: EmbeddingConfig,
    vocabulary: Arc<Vocabulary>,
    aggregator: Aggregator,
    default_vector: Embedding,
}

/// Embedding engine facade.
///
/// `generate` takes `&self`; a ready engine can be shared across threads
/// behind an `Arc`.
#[derive(Debug)]
pub struct EmbeddingEngine {
    inner: Inner,
}

impl Default for EmbeddingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingEngine {
    /// Unconfigured engine.
    pub fn new() -> Self {
        Self {
            inner: Inner::Unconfigured,
        }
    }

    /// Configure and initialize through the process-wide registry.
    pub fn from_config(config: EmbeddingConfig) -> Result<Self, EmbedError> {
        Self::from_config_with(config, VocabularyRegistry::global())
    }

    /// Configure and initialize through `registry`.
    pub fn from_config_with(
        config: EmbeddingConfig,
        registry: &VocabularyRegistry,
    ) -> Result<Self, EmbedError> {
        let mut engine = Self::new();
        engine.configure(config)?;
        engine.initialize_with(registry)?;
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.inner.state()
    }

    /// Reason of the failure, in the `Failed` state.
    pub fn failure(&self) -> Option<&str> {
        match &self.inner {
            Inner::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn config(&self) -> Option<&EmbeddingConfig> {
        match &self.inner {
            Inner::Configured(config) => Some(config),
            Inner::Ready(ready) => Some(&ready.config),
            _ => None,
        }
    }

    /// The loaded vocabulary, once ready.
    pub fn vocabulary(&self) -> Option<&Arc<Vocabulary>> {
        match &self.inner {
            Inner::Ready(ready) => Some(&ready.vocabulary),
            _ => None,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.vocabulary().map(|v| v.dimension())
    }

    /// Validate `config` and move to `Configured`.
    pub fn configure(&mut self, config: EmbeddingConfig) -> Result<(), EmbedError> {
        match &self.inner {
            Inner::Unconfigured => {}
            other => return Err(other.state_error(EngineState::Unconfigured)),
        }
        if let Err(err) = config.validate() {
            return Err(self.fail(err));
        }
        debug!(flavor = %config.flavor, mode = %config.mode, scheme = %config.scheme, "Engine configured");
        self.inner = Inner::Configured(config);
        Ok(())
    }

    /// Load the vocabulary through the process-wide registry.
    pub fn initialize(&mut self) -> Result<(), EmbedError> {
        self.initialize_with(VocabularyRegistry::global())
    }

    /// Load the vocabulary through `registry` and move to `Ready`.
    pub fn initialize_with(&mut self, registry: &VocabularyRegistry) -> Result<(), EmbedError> {
        let config = self.take_configured()?;
        match registry.load_source(&config.vocabulary, config.flavor) {
            Ok(vocabulary) => self.finish(config, vocabulary),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Use an already loaded vocabulary and move to `Ready`.
    pub fn initialize_with_vocabulary(
        &mut self,
        vocabulary: Arc<Vocabulary>,
    ) -> Result<(), EmbedError> {
        let config = self.take_configured()?;
        self.finish(config, vocabulary)
    }

    fn take_configured(&mut self) -> Result<EmbeddingConfig, EmbedError> {
        match mem::replace(&mut self.inner, Inner::Unconfigured) {
            Inner::Configured(config) => Ok(config),
            other => {
                let err = other.state_error(EngineState::Configured);
                self.inner = other;
                Err(err)
            }
        }
    }

    fn finish(
        &mut self,
        config: EmbeddingConfig,
        vocabulary: Arc<Vocabulary>,
    ) -> Result<(), EmbedError> {
        match ReadyEngine::new(config, vocabulary) {
            Ok(ready) => {
                info!(
                    flavor = %ready.config.flavor,
                    dim = ready.vocabulary.dimension(),
                    entries = ready.vocabulary.len(),
                    mode = %ready.config.mode,
                    scheme = %ready.config.scheme,
                    "Embedding engine ready"
                );
                self.inner = Inner::Ready(Box::new(ready));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: EmbedError) -> EmbedError {
        warn!(error = %err, "Embedding engine failed");
        self.inner = Inner::Failed(err.to_string());
        err
    }

    fn ready(&self) -> Result<&ReadyEngine, EmbedError> {
        match &self.inner {
            Inner::Ready(ready) => Ok(ready),
            other => Err(other.state_error(EngineState::Ready)),
        }
    }

    /// Embed `unit` at `granularity`.
    ///
    /// The granularity may be the unit's own level or any finer one: a
    /// function can be embedded as one vector, per block or per
    /// instruction. Declarations produce an empty result.
    ///
    /// Under the `fail-fast` policy the whole unit is checked for unknown
    /// symbols before anything is computed.
    pub fn generate(
        &self,
        unit: ProgramUnit<'_>,
        granularity: Granularity,
    ) -> Result<EmbeddingResult, EmbedError> {
        let ready = self.ready()?;
        if granularity > unit.granularity() {
            return Err(ConfigurationError::Granularity {
                unit: unit.granularity(),
                requested: granularity,
            }
            .into());
        }
        ready.prescan(unit)?;
        debug!(unit = %unit.id(), %granularity, "Generating embeddings");
        ready.generate(unit, granularity)
    }

    /// Embed every defined function of `module`.
    ///
    /// The whole module is checked for unknown symbols first under the
    /// `fail-fast` policy.
    pub fn generate_module(
        &self,
        module: &Module,
        granularity: Granularity,
    ) -> Result<EmbeddingResult, EmbedError> {
        let ready = self.ready()?;
        if module.flavor != ready.config.flavor {
            return Err(ConfigurationError::FlavorMismatch {
                engine: ready.config.flavor,
                program: module.flavor,
            }
            .into());
        }
        let units: Vec<ProgramUnit<'_>> = module
            .defined_functions()
            .map(|(i, function)| ProgramUnit::Function {
                id: UnitId::function(i),
                function,
            })
            .collect();
        for unit in &units {
            ready.prescan(*unit)?;
        }

        let mut result = EmbeddingResult::new(granularity);
        for unit in units {
            result.extend(ready.generate(unit, granularity)?);
        }
        Ok(result)
    }

    /// Function embedding combined directly from all instruction
    /// embeddings, skipping the block level.
    ///
    /// For `sum` and `weighted` this equals the function entry of
    /// [`generate`](Self::generate). For `average` it is the mean over all
    /// instructions, which differs from the mean of block means whenever
    /// blocks have unequal instruction counts and coincides when they are
    /// equal.
    pub fn flat_function_embedding(&self, function: &Function) -> Result<Embedding, EmbedError> {
        let ready = self.ready()?;
        let unit = ProgramUnit::from_function(function);
        ready.prescan(unit)?;
        let embedded = ready.embed_instructions(unit)?;
        Ok(ready.aggregator.combine(embedded.iter().map(|(_, _, e)| e)))
    }
}

type EmbeddedInstruction<'a> = (UnitId, &'a Instruction, Embedding);

impl ReadyEngine {
    fn new(config: EmbeddingConfig, vocabulary: Arc<Vocabulary>) -> Result<Self, EmbedError> {
        let dimension = vocabulary.dimension();
        if let Some(expected) = config.expected_dimension {
            if expected != dimension {
                return Err(ConfigurationError::VocabularyDimension {
                    expected,
                    actual: dimension,
                }
                .into());
            }
        }
        let default_vector = match &config.default_vector {
            Some(values) if values.len() != dimension => {
                return Err(ConfigurationError::DefaultVectorDimension {
                    expected: dimension,
                    actual: values.len(),
                }
                .into());
            }
            Some(values) => Embedding::new(values.clone()),
            None => Embedding::zeros(dimension),
        };
        let aggregator = Aggregator::new(
            config.scheme,
            config.weights.clone(),
            config.flavor,
            dimension,
        )?;
        Ok(Self {
            config,
            vocabulary,
            aggregator,
            default_vector,
        })
    }

    /// Check every symbol that will be looked up for `unit`.
    ///
    /// In flow-aware mode this includes the instructions preceding the
    /// unit in its function, and skips operands that read an earlier
    /// result.
    fn prescan(&self, unit: ProgramUnit<'_>) -> Result<(), EmbedError> {
        if self.config.unknown_symbol != UnknownSymbolPolicy::FailFast {
            return Ok(());
        }
        let flow_aware = self.config.mode == EmbeddingMode::FlowAware;
        let mut defined: HashSet<&str> = HashSet::new();
        for (id, inst) in self.context(unit).chain(instructions(unit)) {
            for (slot, symbol) in instruction_symbols(inst) {
                if let Slot::Operand(i) = slot {
                    let reads_result = inst.operands[i]
                        .value
                        .as_deref()
                        .is_some_and(|value| defined.contains(value));
                    if reads_result {
                        continue;
                    }
                }
                if !self.vocabulary.contains(symbol) {
                    debug!(%symbol, at = %id, "Unknown symbol");
                    return Err(ConfigurationError::UnknownSymbol(symbol.to_symbol()).into());
                }
            }
            if flow_aware {
                if let Some(result) = inst.result.as_deref() {
                    defined.insert(result);
                }
            }
        }
        Ok(())
    }

    /// Instructions whose results can flow into `unit`: those before it in
    /// its function in flow-aware mode, none in symbolic mode.
    fn context<'a>(&self, unit: ProgramUnit<'a>) -> Take<Take<Instructions<'a>>> {
        let limit = match self.config.mode {
            EmbeddingMode::FlowAware => usize::MAX,
            EmbeddingMode::Symbolic => 0,
        };
        preceding_instructions(unit).take(limit)
    }

    fn lookup(&self, symbol: SymbolRef<'_>) -> Result<&Embedding, EmbedError> {
        Ok(self
            .vocabulary
            .resolve(symbol, self.config.unknown_symbol, &self.default_vector)?)
    }

    /// Instruction embeddings of `unit` in program order.
    ///
    /// In flow-aware mode an operand naming a value defined by an earlier
    /// instruction of the enclosing function contributes that instruction's
    /// embedding, so a block or instruction embeds the same whether it is
    /// requested alone or as part of its function. Values not yet defined
    /// (back edges) use the operand's own vector.
    fn embed_instructions<'a>(
        &self,
        unit: ProgramUnit<'a>,
    ) -> Result<Vec<EmbeddedInstruction<'a>>, EmbedError> {
        let flow_aware = self.config.mode == EmbeddingMode::FlowAware;
        let context_len = self.context(unit).count();
        let mut out: Vec<EmbeddedInstruction<'a>> = Vec::new();
        let mut defs: HashMap<&'a str, usize> = HashMap::new();

        for (id, inst) in self.context(unit).chain(instructions(unit)) {
            let mut items: Vec<(SymbolClass, &Embedding)> = Vec::new();
            for (slot, symbol) in instruction_symbols(inst) {
                let definition = match slot {
                    Slot::Operand(i) if flow_aware => inst.operands[i]
                        .value
                        .as_deref()
                        .and_then(|value| defs.get(value)),
                    _ => None,
                };
                let vector = match definition {
                    Some(&index) => &out[index].2,
                    None => self.lookup(symbol)?,
                };
                items.push((symbol.class, vector));
            }
            let embedding = self.aggregator.reduce(items);

            out.push((id, inst, embedding));
            if let Some(result) = inst.result.as_deref() {
                defs.insert(result, out.len() - 1);
            }
        }
        Ok(out.split_off(context_len))
    }

    fn generate(
        &self,
        unit: ProgramUnit<'_>,
        granularity: Granularity,
    ) -> Result<EmbeddingResult, EmbedError> {
        let mut result = EmbeddingResult::new(granularity);
        let embedded = self.embed_instructions(unit)?;

        if granularity == Granularity::Instruction {
            for (id, inst, embedding) in embedded {
                result.push(id, inst.label(), embedding);
            }
            return Ok(result);
        }

        let blocks: Vec<(UnitId, &str, usize)> = match unit {
            ProgramUnit::Function { id, function } => {
                if function.is_declaration() {
                    return Ok(result);
                }
                function
                    .blocks
                    .iter()
                    .enumerate()
                    .map(|(b, block)| (UnitId::block(id.function, b), block.name.as_str(), block.len()))
                    .collect()
            }
            ProgramUnit::Block { id, block, .. } => {
                vec![(id, block.name.as_str(), block.len())]
            }
            // Rejected by the granularity check
            ProgramUnit::Instruction { .. } => return Ok(result),
        };

        let mut block_embeddings = Vec::with_capacity(blocks.len());
        let mut cursor = 0;
        for (id, name, len) in blocks {
            let members = &embedded[cursor..cursor + len];
            cursor += len;
            let embedding = self.aggregator.combine(members.iter().map(|(_, _, e)| e));
            block_embeddings.push((id, name, embedding));
        }

        match (granularity, unit) {
            (Granularity::Function, ProgramUnit::Function { id, function }) => {
                let embedding = self
                    .aggregator
                    .combine(block_embeddings.iter().map(|(_, _, e)| e));
                result.push(id, function.name.as_str(), embedding);
            }
            _ => {
                for (id, name, embedding) in block_embeddings {
                    result.push(id, name, embedding);
                }
            }
        }
        Ok(result)
    }
}
