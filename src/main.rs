use std::path::Path;

use anyhow::anyhow;
use clap::Parser;

use coverage_desk::cli::commands;
use coverage_desk::cli::{Cli, Commands};
use coverage_desk::{PipelineError, Settings, logging};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        if let Some(hint) = e
            .downcast_ref::<PipelineError>()
            .and_then(PipelineError::recovery_suggestion)
        {
            eprintln!("Suggestion: {hint}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    let debug = cli.debug;

    match cli.command {
        // Init must work before any settings file exists
        Commands::Init { force } => {
            logging::init();
            commands::init::run_init(force)
        }
        Commands::Ingest { files } => commands::ingest::run(&files, &load_settings(config, debug)?),
        Commands::Ask { query, top_k, json } => {
            commands::ask::run(&query, top_k, json, &load_settings(config, debug)?)
        }
        Commands::Parse { query } => {
            load_settings(config, debug)?;
            commands::parse::run(&query)
        }
        Commands::Search { query, top_k, json } => {
            commands::search::run(&query, top_k, json, &load_settings(config, debug)?)
        }
        Commands::Config => commands::init::run_config(&load_settings(config, debug)?),
    }
}

/// Load settings, start logging and anchor the index path at the workspace
/// root.
fn load_settings(config: Option<&Path>, debug: bool) -> anyhow::Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    if debug {
        settings.debug = true;
    }
    if settings.debug {
        settings.logging.default = "debug".to_string();
    }
    logging::init_with_config(&settings.logging);

    if settings.index_path.is_relative() {
        if let Some(root) = Settings::workspace_root() {
            settings.index_path = root.join(&settings.index_path);
        }
    }

    Ok(settings)
}
