//! Flat inner-product index over chunk embeddings.
//!
//! Exact nearest-neighbour search over L2-normalised vectors. Entries are
//! append-only; an entry's position is its identifier. Chunk, vector and
//! metadata collections grow in lockstep, one batch at a time.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::embedding::{EmbeddingError, EmbeddingGenerator};
use super::math::{dot_product, l2_normalize};
use crate::documents::Chunk;
use crate::storage::{IndexPersistence, Snapshot, StorageError};

/// Errors from index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Embedding failure: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Index corrupted: {chunks} chunks, {vectors} vectors, {metadata} metadata records. \
         Clear the index before further use"
    )]
    Corrupted {
        chunks: usize,
        vectors: usize,
        metadata: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Persistence error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Per-entry bookkeeping stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Source document the chunk came from.
    pub filename: String,
    /// Position of the chunk within its ingest batch.
    pub chunk_id: usize,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
    pub metadata: EntryMetadata,
}

/// A full index entry, as returned by [`EmbeddingIndex::entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// Outcome of [`EmbeddingIndex::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A complete snapshot was loaded with this many entries.
    Restored { entries: usize },
    /// No complete snapshot exists; the index was left as it was.
    NoSnapshot,
}

#[derive(Debug, Default)]
struct IndexState {
    chunks: Vec<Chunk>,
    metadata: Vec<EntryMetadata>,
    /// Row-major matrix, `dimension` floats per entry.
    vectors: Vec<f32>,
}

/// Shared similarity index.
///
/// Searches share a read lock; `add`, `restore` and `clear` take the write
/// lock, so a search never observes a half-appended batch.
pub struct EmbeddingIndex {
    state: RwLock<IndexState>,
    generator: Box<dyn EmbeddingGenerator>,
    dimension: usize,
    corrupted: AtomicBool,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("model", &self.generator.model_name())
            .field("dimension", &self.dimension)
            .field("entries", &self.state.read().chunks.len())
            .field("corrupted", &self.corrupted.load(Ordering::Acquire))
            .finish()
    }
}

impl EmbeddingIndex {
    /// Create an empty index whose dimension is the generator's.
    ///
    /// A generator reporting dimension zero is rejected.
    pub fn new(generator: Box<dyn EmbeddingGenerator>) -> IndexResult<Self> {
        let dimension = generator.dimension();
        if dimension == 0 {
            return Err(IndexError::InvalidArgument(format!(
                "embedding model '{}' reports dimension 0",
                generator.model_name()
            )));
        }
        Ok(Self {
            state: RwLock::new(IndexState::default()),
            generator,
            dimension,
            corrupted: AtomicBool::new(false),
        })
    }

    /// Create an empty index, checking the generator against a configured dimension.
    pub fn with_dimension(
        generator: Box<dyn EmbeddingGenerator>,
        dimension: usize,
    ) -> IndexResult<Self> {
        if generator.dimension() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: generator.dimension(),
            });
        }
        Self::new(generator)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.state.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the index has detected a count mismatch and refuses work.
    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::Acquire)
    }

    /// Embed and append a batch of chunks.
    ///
    /// The batch is committed as a whole or not at all: any embedding failure
    /// returns an error before the index is touched.
    pub fn add(&self, chunks: &[Chunk], source_id: &str) -> IndexResult<usize> {
        self.verify(&self.state.read())?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.generator.generate_embeddings(&texts)?;

        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            }
            .into());
        }

        let mut batch_vectors = Vec::with_capacity(chunks.len() * self.dimension);
        for mut embedding in embeddings {
            self.check_vector(&embedding)?;
            l2_normalize(&mut embedding);
            batch_vectors.extend_from_slice(&embedding);
        }

        let batch_metadata = (0..chunks.len()).map(|chunk_id| EntryMetadata {
            filename: source_id.to_string(),
            chunk_id,
        });

        let mut state = self.state.write();
        self.verify(&state)?;
        state.chunks.extend_from_slice(chunks);
        state.metadata.extend(batch_metadata);
        state.vectors.extend_from_slice(&batch_vectors);

        tracing::info!(
            target: "index",
            "added {} chunks from {source_id} ({} total)",
            chunks.len(),
            state.chunks.len()
        );

        Ok(chunks.len())
    }

    /// Return the `top_k` entries most similar to `query`.
    ///
    /// Scores are cosine similarities, sorted descending; ties keep insertion
    /// order. An empty index yields an empty result without embedding the query.
    pub fn search(&self, query: &str, top_k: usize) -> IndexResult<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }

        {
            let state = self.state.read();
            self.verify(&state)?;
            if state.chunks.is_empty() {
                return Ok(Vec::new());
            }
        }

        let mut query_vector = self.generator.embed_one(query)?;
        self.check_vector(&query_vector)?;
        l2_normalize(&mut query_vector);

        let state = self.state.read();
        self.verify(&state)?;

        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| dot_product(&query_vector, row))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);

        let hits = scored
            .into_iter()
            .map(|(position, score)| SearchHit {
                chunk: state.chunks[position].clone(),
                score,
                metadata: state.metadata[position].clone(),
            })
            .collect();

        Ok(hits)
    }

    /// Copy out every entry in insertion order.
    pub fn entries(&self) -> IndexResult<Vec<IndexEntry>> {
        let state = self.state.read();
        self.verify(&state)?;

        Ok(state
            .chunks
            .iter()
            .zip(state.metadata.iter())
            .zip(state.vectors.chunks_exact(self.dimension))
            .map(|((chunk, metadata), vector)| IndexEntry {
                chunk: chunk.clone(),
                vector: vector.to_vec(),
                metadata: metadata.clone(),
            })
            .collect())
    }

    /// Write a snapshot of the full index to `dir`.
    pub fn persist(&self, dir: impl AsRef<Path>) -> IndexResult<()> {
        let state = self.state.read();
        self.verify(&state)?;

        let snapshot = Snapshot {
            dimension: self.dimension,
            model: self.generator.model_name().to_string(),
            chunks: state.chunks.clone(),
            metadata: state.metadata.clone(),
            vectors: state.vectors.clone(),
        };
        IndexPersistence::new(dir.as_ref()).save(&snapshot)?;

        tracing::info!(
            target: "index",
            "persisted {} entries to {}",
            state.chunks.len(),
            dir.as_ref().display()
        );
        Ok(())
    }

    /// Replace the index contents with the snapshot in `dir`.
    ///
    /// A missing artifact means there is nothing to restore. A snapshot that
    /// fails validation is reported and the live index is left untouched.
    pub fn restore(&self, dir: impl AsRef<Path>) -> IndexResult<RestoreOutcome> {
        let Some(snapshot) = IndexPersistence::new(dir.as_ref()).load()? else {
            tracing::debug!(target: "index", "no snapshot at {}", dir.as_ref().display());
            return Ok(RestoreOutcome::NoSnapshot);
        };

        if snapshot.dimension != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: snapshot.dimension,
            });
        }

        if snapshot.model != self.generator.model_name() {
            tracing::warn!(
                target: "index",
                "snapshot was built with '{}', current model is '{}'",
                snapshot.model,
                self.generator.model_name()
            );
        }

        let entries = snapshot.chunks.len();
        let mut state = self.state.write();
        *state = IndexState {
            chunks: snapshot.chunks,
            metadata: snapshot.metadata,
            vectors: snapshot.vectors,
        };
        self.corrupted.store(false, Ordering::Release);
        self.verify(&state)?;

        tracing::info!(
            target: "index",
            "restored {entries} entries from {}",
            dir.as_ref().display()
        );
        Ok(RestoreOutcome::Restored { entries })
    }

    /// Drop every entry and reinitialise a corrupted index.
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = IndexState::default();
        self.corrupted.store(false, Ordering::Release);
    }

    fn check_vector(&self, vector: &[f32]) -> IndexResult<()> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::NonFinite.into());
        }
        Ok(())
    }

    /// Refuse to operate once chunk, vector and metadata counts disagree.
    fn verify(&self, state: &IndexState) -> IndexResult<()> {
        let chunks = state.chunks.len();
        let metadata = state.metadata.len();
        let consistent = state.vectors.len() == chunks * self.dimension && metadata == chunks;

        if !consistent {
            self.corrupted.store(true, Ordering::Release);
        }

        if self.corrupted.load(Ordering::Acquire) {
            let vectors = state.vectors.len() / self.dimension.max(1);
            tracing::error!(
                target: "index",
                "index corrupted: {chunks} chunks, {vectors} vectors, {metadata} metadata"
            );
            return Err(IndexError::Corrupted {
                chunks,
                vectors,
                metadata,
            });
        }

        Ok(())
    }
}
