//! CLI argument parsing for `ir2vec`.
//!
//! CLI flags override every other settings source.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ir2vec_types::{AggregationScheme, EmbeddingMode, Flavor, Granularity};

/// IR2Vec / MIR2Vec embeddings
///
/// Generates program embeddings, training triplets and entity mappings
/// from JSON program documents.
#[derive(Parser, Debug)]
#[command(name = "ir2vec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/ir2vec/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output encoding
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text listing
    #[default]
    Text,
    /// JSON document
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate embeddings for a program
    Embeddings {
        /// Program document (JSON)
        input: PathBuf,

        /// Vocabulary file
        #[arg(short, long)]
        vocab: Option<String>,

        /// Level: func, bb or inst
        #[arg(long)]
        level: Option<Granularity>,

        /// Mode: sym or fa
        #[arg(short, long)]
        mode: Option<EmbeddingMode>,

        /// Program flavor: ir or mir
        #[arg(long)]
        flavor: Option<Flavor>,

        /// Only embed this function (actual or demangled name)
        #[arg(long)]
        function: Option<String>,

        /// Aggregation scheme: sum, average or weighted
        #[arg(long)]
        scheme: Option<AggregationScheme>,

        /// Output encoding
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate training triplets for a program
    Triplets {
        /// Program document (JSON)
        input: PathBuf,

        /// Program flavor: ir or mir
        #[arg(long)]
        flavor: Option<Flavor>,

        /// Vocabulary file (required for MIR)
        #[arg(short, long)]
        vocab: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the entity mapping
    Entities {
        /// Program flavor: ir or mir
        #[arg(long)]
        flavor: Option<Flavor>,

        /// Vocabulary file (required for MIR)
        #[arg(short, long)]
        vocab: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective settings as TOML
    Config,
}
