//! `ir2vec` command-line library.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (embeddings, triplets, entities, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, OutputFormat};
pub use commands::{
    embeddings, entities, init_logging, run, show_config, triplets, write_output, Overrides,
};
