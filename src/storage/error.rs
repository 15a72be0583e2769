use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid snapshot file {}: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Snapshot checksum mismatch: records expect {expected}, vector blob has {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Snapshot count mismatch: {chunks} chunks, {metadata} metadata records, {vectors} vectors")]
    CountMismatch {
        chunks: usize,
        metadata: usize,
        vectors: usize,
    },

    #[error("Snapshot dimension mismatch: records say {records}, vector blob says {vectors}")]
    DimensionMismatch { records: usize, vectors: usize },
}

pub type StorageResult<T> = Result<T, StorageError>;
