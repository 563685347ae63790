//! Command implementations for `ir2vec`.
//!
//! Handles:
//! - embeddings: function, block or instruction embeddings as text or JSON
//! - triplets: training triplets of a program
//! - entities: the entity mapping of a flavor
//! - config: the effective settings

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use ir2vec_bindings::ir2vec::Ir2VecTool;
use ir2vec_bindings::mir2vec::Mir2VecTool;
use ir2vec_embedder::{generate_concurrently, module_triplets, EmbeddingConfig, EmbeddingResult};
use ir2vec_types::{
    AggregationScheme, Embedding, EmbeddingMode, Flavor, Granularity, Module, ProgramUnit,
    Settings, UnitId,
};
use ir2vec_vocab::{EntityTable, VocabularyRegistry};

use crate::cli::{Cli, Commands, OutputFormat};

/// Flags that override loaded settings.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub vocab: Option<String>,
    pub flavor: Option<Flavor>,
    pub level: Option<Granularity>,
    pub mode: Option<EmbeddingMode>,
    pub scheme: Option<AggregationScheme>,
    pub log_level: Option<String>,
}

impl Overrides {
    /// Apply every flag that was given, then re-validate.
    pub fn apply(self, settings: &mut Settings) -> Result<()> {
        if let Some(vocab) = self.vocab {
            settings.vocab_path = Some(vocab);
        }
        if let Some(flavor) = self.flavor {
            settings.flavor = flavor;
        }
        if let Some(level) = self.level {
            settings.level = level;
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(scheme) = self.scheme {
            settings.scheme = scheme;
        }
        if let Some(log_level) = self.log_level {
            settings.log_level = log_level;
        }
        settings.validate().context("Invalid settings")?;
        Ok(())
    }
}

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Parse-to-exit entry point used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let (overrides, output) = match &cli.command {
        Commands::Embeddings {
            vocab,
            level,
            mode,
            flavor,
            scheme,
            output,
            ..
        } => (
            Overrides {
                vocab: vocab.clone(),
                flavor: *flavor,
                level: *level,
                mode: *mode,
                scheme: *scheme,
                ..Default::default()
            },
            output.clone(),
        ),
        Commands::Triplets {
            vocab,
            flavor,
            output,
            ..
        }
        | Commands::Entities {
            vocab,
            flavor,
            output,
        } => (
            Overrides {
                vocab: vocab.clone(),
                flavor: *flavor,
                ..Default::default()
            },
            output.clone(),
        ),
        Commands::Config => (Overrides::default(), None),
    };
    Overrides {
        log_level: cli.log_level.clone(),
        ..overrides
    }
    .apply(&mut settings)?;

    init_logging(&settings.log_level)?;
    debug!(flavor = %settings.flavor, level = %settings.level, "Settings loaded");

    let text = match cli.command {
        Commands::Embeddings {
            input,
            function,
            format,
            ..
        } => embeddings(&settings, &input, function.as_deref(), format).await?,
        Commands::Triplets { input, .. } => triplets(&settings, &input)?,
        Commands::Entities { .. } => entities(&settings)?,
        Commands::Config => show_config(&settings)?,
    };

    write_output(output.as_deref(), &text)
}

/// Write `text` to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = ?path, bytes = text.len(), "Output written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Vocabulary path of `settings` as a string; empty when unset.
fn vocab_path(settings: &Settings) -> String {
    settings
        .expanded_vocab_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One JSON record of the `embeddings` command.
#[derive(Debug, Serialize)]
struct EmbeddingRecord<'a> {
    function: &'a str,
    label: String,
    embedding: Embedding,
}

/// Embeddings of `input` at the configured level.
pub async fn embeddings(
    settings: &Settings,
    input: &Path,
    function: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let config = EmbeddingConfig::from_settings(settings);
    let level = settings.level;

    let (engine, module) = match settings.flavor {
        Flavor::Ir => {
            let tool = Ir2VecTool::with_config(input, config)?;
            if format == OutputFormat::Text {
                return Ok(tool.render_embeddings(level, function)?);
            }
            (Arc::clone(tool.engine()), tool.module().clone())
        }
        Flavor::Mir => {
            let tool = Mir2VecTool::with_config(input, config)?;
            let vocab = vocab_path(settings);
            if format == OutputFormat::Text {
                return Ok(tool.render_embeddings(&vocab, level, function)?);
            }
            (Arc::new(tool.engine(&vocab)?), tool.module().clone())
        }
    };

    let results = match function {
        Some(name) => {
            let index = module
                .function_index(name)
                .filter(|&i| !module.functions[i].is_declaration())
                .with_context(|| format!("Function not found or is a declaration: {name}"))?;
            let unit = ProgramUnit::Function {
                id: UnitId::function(index),
                function: &module.functions[index],
            };
            vec![engine.generate(unit, level)?]
        }
        None => generate_concurrently(engine, module.functions.clone(), level).await?,
    };

    render_json(&module, results)
}

fn render_json(module: &Module, results: Vec<EmbeddingResult>) -> Result<String> {
    let records: Vec<EmbeddingRecord<'_>> = results
        .into_iter()
        .flatten()
        .map(|entry| EmbeddingRecord {
            function: module.functions[entry.id.function].name.as_str(),
            label: entry.label,
            embedding: entry.embedding,
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&records).context("Failed to encode embeddings")?;
    json.push('\n');
    Ok(json)
}

/// Entity table for the configured flavor.
///
/// MIR tables come from the vocabulary, so a vocabulary path is required.
fn entity_table(settings: &Settings) -> Result<EntityTable> {
    match settings.flavor {
        Flavor::Ir => Ok(EntityTable::ir()),
        Flavor::Mir => {
            let Some(path) = settings.expanded_vocab_path().filter(|p| !p.as_os_str().is_empty())
            else {
                bail!("Error - Empty Vocab Path not allowed");
            };
            let vocab = VocabularyRegistry::global()
                .get_or_load(&path, Flavor::Mir)
                .with_context(|| format!("Failed to load MIR vocabulary {}", path.display()))?;
            Ok(EntityTable::from_vocabulary(&vocab))
        }
    }
}

/// Triplets of `input`, as `MAX_RELATION=<n>` followed by one line each.
pub fn triplets(settings: &Settings, input: &Path) -> Result<String> {
    let module = read_program(input, settings.flavor)?;
    let table = entity_table(settings)?;
    let result = module_triplets(&module, &table)
        .with_context(|| format!("Failed to generate triplets for {}", input.display()))?;
    info!(triplets = result.len(), max_relation = result.max_relation, "Triplets generated");
    Ok(result.render())
}

/// Entity mapping: the entity count, then `name\tid` lines.
pub fn entities(settings: &Settings) -> Result<String> {
    Ok(entity_table(settings)?.render())
}

/// Effective settings as TOML.
pub fn show_config(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to render settings")
}

fn read_program(input: &Path, flavor: Flavor) -> Result<Module> {
    let module = Module::from_path(input)
        .with_context(|| format!("Failed to read program {}", input.display()))?;
    if module.flavor != flavor {
        bail!(
            "Program {} is {}, expected {}",
            input.display(),
            module.flavor,
            flavor
        );
    }
    Ok(module)
}
