//! Embedding generation and the similarity index over policy chunks.

pub mod embedding;
pub mod index;
pub mod math;

pub use embedding::{
    DEFAULT_DIMENSION, EmbeddingError, EmbeddingGenerator, FastEmbedGenerator, HashingEmbedder,
    models_dir, parse_embedding_model,
};
pub use index::{
    EmbeddingIndex, EntryMetadata, IndexEntry, IndexError, IndexResult, RestoreOutcome, SearchHit,
};
pub use math::{cosine_similarity, dot_product, l2_normalize};

/// Similarity score guidance for retrieved chunks.
pub mod thresholds {
    /// Chunks scoring above this are very likely about the queried topic.
    pub const VERY_SIMILAR: f32 = 0.85;

    /// Chunks scoring above this are related to the query.
    pub const SIMILAR: f32 = 0.70;

    /// Loosely related chunks.
    pub const RELATED: f32 = 0.50;
}

/// Build the embedding generator named in settings.
///
/// `"hashing"` selects the offline [`HashingEmbedder`]; anything else is
/// treated as a fastembed model name.
pub fn generator_from_settings(
    model: &str,
    dimension: usize,
    show_progress: bool,
) -> Result<Box<dyn EmbeddingGenerator>, EmbeddingError> {
    if model.eq_ignore_ascii_case(HashingEmbedder::MODEL_NAME) {
        return Ok(Box::new(HashingEmbedder::new(dimension)));
    }
    Ok(Box::new(FastEmbedGenerator::from_settings(
        model,
        show_progress,
    )?))
}
