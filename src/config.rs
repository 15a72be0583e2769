//! Layered configuration for coverage-desk.
//!
//! Sources, later ones winning:
//! - Default values
//! - `.coverage-desk/settings.toml` (found by walking up from the cwd)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CD_` and use double
//! underscores to separate nested levels:
//! - `CD_CHUNKING__CHUNK_SIZE=800` sets `chunking.chunk_size`
//! - `CD_RETRIEVAL__TOP_K=3` sets `retrieval.top_k`
//! - `CD_GENERATION__API_KEY=...` sets `generation.api_key`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::decision::{GenerationConfig, PolicyConfig};
use crate::documents::ChunkingConfig;
use crate::vector::DEFAULT_DIMENSION;

/// Name of the per-workspace configuration directory.
pub const CONFIG_DIR: &str = ".coverage-desk";

/// Name of the settings file inside [`CONFIG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "CD_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the index snapshot
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Fallback policy terms
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Log levels: a default plus per-target overrides.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target levels, e.g. `decision = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SemanticSearchConfig {
    /// Embedding model: a fastembed model name, or `hashing` for the offline
    /// feature-hashing embedder
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension (must match the model)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Show model download progress
    #[serde(default)]
    pub show_progress: bool,
}

fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index")
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_top_k() -> usize {
    5
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            debug: false,
            logging: LoggingConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            policy: PolicyConfig::default(),
            semantic_search: SemanticSearchConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_dimension(),
            show_progress: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores
            // stay inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.coverage-desk/settings.toml` from the cwd upwards
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Workspace root (the directory containing `.coverage-desk`)
    pub fn workspace_root() -> Option<PathBuf> {
        Self::find_workspace_config()
            .and_then(|path| path.parent()?.parent().map(Path::to_path_buf))
    }

    /// Check every section for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        self.chunking
            .validate()
            .map_err(|e| format!("[chunking] {e}"))?;
        self.policy.validate().map_err(|e| format!("[policy] {e}"))?;

        if self.retrieval.top_k == 0 {
            return Err("[retrieval] top_k must be greater than zero".to_string());
        }
        if self.semantic_search.dimension == 0 {
            return Err("[semantic_search] dimension must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file under `root`.
    pub fn init_config_file(
        root: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.as_ref().join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from(".coverage-desk/index"));
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.semantic_search.dimension, 384);
        assert!(!settings.generation.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[chunking]
chunk_size = 800
overlap_sentences = 1

[policy]
waiting_period_months = 24

[semantic_search]
model = "hashing"
dimension = 256

[logging.modules]
decision = "debug"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.overlap_sentences, 1);
        // Unspecified fields keep their defaults
        assert_eq!(settings.chunking.min_section_length, 20);
        assert_eq!(settings.policy.waiting_period_months, 24);
        assert_eq!(settings.policy.min_age, 18);
        assert_eq!(settings.semantic_search.model, "hashing");
        assert_eq!(settings.logging.modules["decision"], "debug");
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.retrieval.top_k = 3;
        settings.policy.max_age = 70;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 3);
        assert_eq!(loaded.policy.max_age, 70);
    }

    #[test]
    fn test_init_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".coverage-desk/settings.toml"));
        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(settings.validate().unwrap_err().contains("top_k"));

        let mut settings = Settings::default();
        settings.chunking.min_section_length = 1000;
        assert!(settings.validate().unwrap_err().starts_with("[chunking]"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.chunking, ChunkingConfig::default());
    }
}
