//! IR2Vec / MIR2Vec command-line tool
//!
//! # Usage
//!
//! ```bash
//! ir2vec embeddings prog.json --vocab seedEmbedding.json [--level func|bb|inst] [--mode sym|fa]
//! ir2vec triplets prog.json [--flavor ir|mir] [--vocab PATH]
//! ir2vec entities [--flavor ir|mir] [--vocab PATH]
//! ir2vec config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/ir2vec/config.toml)
//! 3. `--config` file
//! 4. Environment variables (IR2VEC_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use ir2vec_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
