//! Core types for policy chunks.

use serde::{Deserialize, Serialize};

/// A bounded span of policy text: the atomic retrievable unit.
///
/// Chunks are immutable once created. The index stores its own copy, since the
/// source document is discarded after ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Whitespace-normalised text of this chunk.
    pub text: String,

    /// Header of the enclosing section, if the document had one.
    pub section_header: Option<String>,

    /// Identifier of the source document (usually the file name).
    pub source_id: String,

    /// Position of this chunk within its source document.
    pub sequence_index: usize,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        text: impl Into<String>,
        section_header: Option<String>,
        source_id: impl Into<String>,
        sequence_index: usize,
    ) -> Self {
        Self {
            text: text.into(),
            section_header,
            source_id: source_id.into(),
            sequence_index,
        }
    }

    /// Get the length of the text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Get a preview of the text (first N characters).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}
