//! Embedding generators.
//!
//! The index treats the embedding model as a collaborator behind the
//! `EmbeddingGenerator` trait. `FastEmbedGenerator` runs a local ONNX model;
//! `HashingEmbedder` is a deterministic offline fallback.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use thiserror::Error;

/// Dimension of the default AllMiniLML6V2 model.
pub const DEFAULT_DIMENSION: usize = 384;

/// Errors from embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Failed to generate embedding: {0}")]
    Generation(String),

    #[error("Unknown embedding model '{0}'")]
    UnknownModel(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding count mismatch: requested {expected}, received {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding contains non-finite values")]
    NonFinite,
}

/// Trait for turning text into fixed-dimension vectors.
pub trait EmbeddingGenerator: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimension of every vector this generator produces.
    fn dimension(&self) -> usize;

    /// Name recorded alongside persisted vectors.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.generate_embeddings(&[text])?;
        if embeddings.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: embeddings.len(),
            });
        }
        Ok(embeddings.remove(0))
    }
}

/// Directory where downloaded ONNX models are cached.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coverage-desk")
        .join("models")
}

/// Parse a model name from settings into a fastembed model.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.as_str() {
        "allminilml6v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "allminilml12v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bgesmallenv15" => Ok(EmbeddingModel::BGESmallENV15),
        "bgebaseenv15" => Ok(EmbeddingModel::BGEBaseENV15),
        "paraphrasemlminilml12v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        _ => Err(EmbeddingError::UnknownModel(name.to_string())),
    }
}

/// Local embedding generator backed by fastembed.
pub struct FastEmbedGenerator {
    /// The embedding model (behind a mutex: fastembed needs exclusive access)
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Create a generator using AllMiniLML6V2 (384 dimensions).
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, "AllMiniLML6V2", false)
    }

    /// Create a generator from the model name in settings.
    pub fn from_settings(model_name: &str, show_progress: bool) -> Result<Self, EmbeddingError> {
        let model = parse_embedding_model(model_name)?;
        Self::with_model(model, model_name, show_progress)
    }

    fn with_model(
        model: EmbeddingModel,
        model_name: &str,
        show_progress: bool,
    ) -> Result<Self, EmbeddingError> {
        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(models_dir())
                .with_show_download_progress(show_progress),
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Probe the model once to learn its output dimension
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;
        let dimension = probe
            .first()
            .map(Vec::len)
            .ok_or_else(|| EmbeddingError::ModelInit("model returned no embedding".to_string()))?;

        tracing::info!(target: "embedding", "loaded {model_name} ({dimension} dimensions)");

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Deterministic feature-hashing embedder.
///
/// Each lowercase token (light plural stemming) and each adjacent token pair
/// is hashed into one of `dimension` buckets with a hash-derived sign. Texts
/// sharing vocabulary land close together, which is enough for small policy
/// corpora and for tests that must not download a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashingEmbedder {
    pub const MODEL_NAME: &'static str = "hashing";

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbeddingGenerator for HashingEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| stem(&token.to_lowercase()))
        .collect()
}

fn stem(token: &str) -> String {
    if let Some(base) = token.strip_suffix("ies") {
        if base.len() >= 2 {
            return format!("{base}y");
        }
    }
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::math::cosine_similarity;

    #[test]
    fn test_parse_embedding_model() {
        assert!(matches!(
            parse_embedding_model("AllMiniLML6V2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_embedding_model("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_embedding_model("word2vec"),
            Err(EmbeddingError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("knee surgery coverage").unwrap();
        let b = embedder.embed_one("knee surgery coverage").unwrap();

        assert_eq!(a.len(), DEFAULT_DIMENSION);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashing_embedder_prefers_shared_vocabulary() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_one("knee surgery").unwrap();
        let related = embedder
            .embed_one("Knee surgeries are covered up to Rs. 1,00,000")
            .unwrap();
        let unrelated = embedder
            .embed_one("Dental treatment is excluded from the policy")
            .unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_stem_plurals() {
        assert_eq!(stem("surgeries"), "surgery");
        assert_eq!(stem("hospitals"), "hospital");
        assert_eq!(stem("class"), "class");
        assert_eq!(stem("eyes"), "eye");
    }

    #[test]
    fn test_batch_preserves_order() {
        let embedder = HashingEmbedder::new(16);
        let batch = embedder.generate_embeddings(&["alpha", "beta"]).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_one("alpha").unwrap());
        assert_eq!(batch[1], embedder.embed_one("beta").unwrap());
    }
}
