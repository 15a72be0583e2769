//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod ask;
pub mod ingest;
pub mod init;
pub mod parse;
pub mod search;

use anyhow::Context;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::vector::{EmbeddingIndex, RestoreOutcome, generator_from_settings};

/// Build the index for `settings` and load any saved snapshot into it.
///
/// A snapshot that fails validation is reported and skipped; the command
/// continues with an empty index rather than serving mismatched data.
pub fn open_index(settings: &Settings) -> anyhow::Result<EmbeddingIndex> {
    let semantic = &settings.semantic_search;
    let generator =
        generator_from_settings(&semantic.model, semantic.dimension, semantic.show_progress)
            .with_context(|| format!("Failed to load embedding model '{}'", semantic.model))?;

    // Surfaced as a PipelineError so main prints the recovery hint
    let index = EmbeddingIndex::with_dimension(generator, semantic.dimension)
        .map_err(PipelineError::from)?;

    match index.restore(&settings.index_path) {
        Ok(RestoreOutcome::Restored { entries }) => {
            tracing::debug!(target: "cli", "restored {entries} entries");
        }
        Ok(RestoreOutcome::NoSnapshot) => {}
        Err(e) => {
            tracing::warn!(
                target: "cli",
                "ignoring saved index at {}: {e}",
                settings.index_path.display()
            );
            eprintln!(
                "Warning: saved index at {} could not be loaded ({e}); starting empty",
                settings.index_path.display()
            );
            index.clear();
        }
    }

    Ok(index)
}

/// Effective `top_k`: the CLI flag, else the configured default.
pub fn top_k(settings: &Settings, flag: Option<usize>) -> usize {
    flag.unwrap_or(settings.retrieval.top_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_settings(temp_dir: &TempDir) -> Settings {
        let mut settings = Settings {
            index_path: temp_dir.path().join("index"),
            ..Settings::default()
        };
        settings.semantic_search.model = "hashing".to_string();
        settings
    }

    #[test]
    fn test_open_index_uses_configured_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = offline_settings(&temp_dir);
        settings.semantic_search.dimension = 128;

        let index = open_index(&settings).unwrap();
        assert_eq!(index.dimension(), 128);
        assert!(index.is_empty());
    }

    #[test]
    fn test_top_k_flag_overrides_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = offline_settings(&temp_dir);

        assert_eq!(top_k(&settings, Some(2)), 2);
        assert_eq!(top_k(&settings, None), settings.retrieval.top_k);
    }
}
