//! Errors surfaced by the ingest/answer pipeline.

use thiserror::Error;

use crate::decision::GenerationError;
use crate::documents::ExtractError;
use crate::vector::{EmbeddingError, IndexError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Hint for the user on how to recover, if there is one.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Extract(ExtractError::UnsupportedFormat { .. }) => {
                Some("Convert the document to .txt, .md, .pdf or .docx and ingest it again")
            }
            Self::Index(IndexError::Corrupted { .. }) => {
                Some("Run 'coverage-desk init --force' to reset the index, then re-ingest")
            }
            Self::Index(IndexError::DimensionMismatch { .. }) => Some(
                "Set semantic_search.dimension to the embedding model's output size; \
                 if the saved index was built with another model, re-ingest the documents",
            ),
            Self::Embedding(EmbeddingError::ModelInit(_)) => {
                Some("Check network access for the model download, or set semantic_search.model = \"hashing\"")
            }
            Self::Generation(_) => Some("Check generation.endpoint or disable generation"),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extract_error_message_passes_through() {
        let error: PipelineError = ExtractError::UnsupportedFormat {
            path: PathBuf::from("claims.xlsx"),
            extension: "xlsx".to_string(),
        }
        .into();

        assert!(error.to_string().contains("claims.xlsx"));
        assert!(error.recovery_suggestion().is_some());
    }

    #[test]
    fn test_dimension_mismatch_points_at_setting() {
        let error: PipelineError = IndexError::DimensionMismatch {
            expected: 768,
            actual: 384,
        }
        .into();

        let hint = error.recovery_suggestion().unwrap();
        assert!(hint.contains("semantic_search.dimension"));
    }
}
