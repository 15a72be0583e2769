//! Configuration types for policy document chunking.

use serde::{Deserialize, Serialize};

/// Configuration for splitting policy text into retrievable chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Character budget for a packed chunk. A single sentence longer than the
    /// budget still becomes one chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Sections shorter than this (in characters) are dropped as noise, and
    /// trailing fragments shorter than this are merged into the previous chunk.
    #[serde(default = "default_min_section_length")]
    pub min_section_length: usize,

    /// Number of trailing sentences repeated at the start of the next chunk.
    #[serde(default)]
    pub overlap_sentences: usize,

    /// Upper bound on chunks emitted per document. Earliest chunks are kept.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Custom section header pattern (regex, matched per line).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_pattern: Option<String>,
}

fn default_chunk_size() -> usize {
    500
}

fn default_min_section_length() -> usize {
    20
}

fn default_max_chunks() -> usize {
    500
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            min_section_length: default_min_section_length(),
            overlap_sentences: 0,
            max_chunks: default_max_chunks(),
            section_pattern: None,
        }
    }
}

impl ChunkingConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }

        if self.min_section_length >= self.chunk_size {
            return Err(format!(
                "min_section_length ({}) must be less than chunk_size ({})",
                self.min_section_length, self.chunk_size
            ));
        }

        if self.max_chunks == 0 {
            return Err("max_chunks must be greater than zero".to_string());
        }

        if let Some(pattern) = &self.section_pattern {
            regex::Regex::new(pattern)
                .map_err(|e| format!("section_pattern is not a valid regex: {e}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_config_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.min_section_length, 20);
        assert_eq!(config.overlap_sentences, 0);
        assert_eq!(config.max_chunks, 500);
        assert!(config.section_pattern.is_none());
    }

    #[test]
    fn test_chunking_config_validation() {
        let mut config = ChunkingConfig::default();
        assert!(config.validate().is_ok());

        config.min_section_length = 600;
        assert!(config.validate().is_err());

        config.min_section_length = 20;
        config.section_pattern = Some("SECTION (".to_string());
        assert!(config.validate().is_err());

        config.section_pattern = None;
        config.max_chunks = 0;
        assert!(config.validate().is_err());
    }
}
