//! Policy document chunking for retrieval.
//!
//! This module provides:
//! - Text extraction from uploaded policy files
//! - Section-aware sentence chunking with configurable budgets
//! - The `Chunk` type stored by the embedding index

pub mod chunker;
pub mod config;
pub mod extract;
pub mod types;

pub use chunker::{Chunker, SectionChunker, split_sentences};
pub use config::ChunkingConfig;
pub use extract::{ExtractError, FileExtractor, TextExtractor};
pub use types::Chunk;
