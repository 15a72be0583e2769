//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Quick Start:
  $ coverage-desk init
  $ coverage-desk ingest policy.docx terms.txt
  $ coverage-desk ask \"46M, knee surgery, Pune, 3-month policy\"";

/// Insurance coverage questions answered from policy documents
#[derive(Parser)]
#[command(name = "coverage-desk", version, styles = clap_cargo_style(), after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "CD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up the .coverage-desk directory with default configuration
    Init {
        /// Overwrite existing configuration and discard the saved index
        #[arg(short, long)]
        force: bool,
    },

    /// Extract, chunk and index policy documents (.txt, .md, .pdf, .docx)
    Ingest {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a coverage question against the indexed policies
    Ask {
        query: String,

        /// Chunks to retrieve (overrides retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the fields extracted from a question
    Parse {
        query: String,
    },

    /// Show the policy chunks most similar to a question
    Search {
        query: String,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Display active settings
    Config,
}
