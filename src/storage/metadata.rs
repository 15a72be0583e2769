//! Metadata header describing an index snapshot

use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Metadata about a persisted index snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Version of the snapshot format
    pub version: u32,

    /// Vector dimension
    pub dimension: usize,

    /// Number of entries (chunks, metadata records and vectors alike)
    pub entry_count: usize,

    /// Embedding model that produced the vectors
    pub model: String,

    /// UTC timestamp (seconds) when the snapshot was written
    pub created_at: i64,

    /// SHA-256 of the vector blob, hex encoded
    pub vectors_sha256: String,
}

impl SnapshotMetadata {
    /// Create metadata for a snapshot written now
    pub fn new(dimension: usize, entry_count: usize, model: &str, vectors_sha256: String) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dimension,
            entry_count,
            model: model.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            vectors_sha256,
        }
    }

    /// Human-readable age of the snapshot, e.g. for `config` output
    pub fn created_at_display(&self) -> String {
        chrono::DateTime::from_timestamp(self.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metadata() {
        let metadata = SnapshotMetadata::new(384, 12, "AllMiniLML6V2", "abc".to_string());
        assert_eq!(metadata.version, SNAPSHOT_VERSION);
        assert_eq!(metadata.entry_count, 12);
        assert!(metadata.created_at > 0);
        assert!(metadata.created_at_display().ends_with("UTC"));
    }
}
