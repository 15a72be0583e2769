//! On-disk snapshot of the embedding index.
//!
//! A snapshot is two artifacts in one directory:
//!
//! - `records.json`: snapshot metadata, the chunks and their entry metadata
//! - `vectors.bin`: a small header followed by row-major little-endian `f32`s
//!
//! The records file carries the SHA-256 of the vector blob, so a blob from a
//! different save is detected on load. Each artifact is written to a
//! temporary file in the target directory and renamed into place.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::error::{StorageError, StorageResult};
use super::metadata::{SNAPSHOT_VERSION, SnapshotMetadata};
use crate::documents::Chunk;
use crate::vector::EntryMetadata;

pub const RECORDS_FILE: &str = "records.json";
pub const VECTORS_FILE: &str = "vectors.bin";

const VECTOR_MAGIC: &[u8; 8] = b"CDVEC\0\0\0";
/// magic (8) + version (4) + dimension (4) + count (8)
const HEADER_LEN: usize = 24;

/// Everything needed to rebuild an index.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub dimension: usize,
    pub model: String,
    pub chunks: Vec<Chunk>,
    pub metadata: Vec<EntryMetadata>,
    /// Flat row-major matrix, `chunks.len() * dimension` values
    pub vectors: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Records {
    metadata: SnapshotMetadata,
    chunks: Vec<Chunk>,
    entries: Vec<EntryMetadata>,
}

/// Manages the snapshot artifacts in a directory
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn records_path(&self) -> PathBuf {
        self.base_path.join(RECORDS_FILE)
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.base_path.join(VECTORS_FILE)
    }

    /// Check if both artifacts are present
    pub fn exists(&self) -> bool {
        self.records_path().exists() && self.vectors_path().exists()
    }

    /// Write `snapshot`, replacing any previous one.
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let count = snapshot.chunks.len();
        if snapshot.metadata.len() != count
            || snapshot.vectors.len() != count * snapshot.dimension
        {
            return Err(StorageError::CountMismatch {
                chunks: count,
                metadata: snapshot.metadata.len(),
                vectors: snapshot
                    .vectors
                    .len()
                    .checked_div(snapshot.dimension)
                    .unwrap_or(0),
            });
        }

        fs::create_dir_all(&self.base_path)?;

        let blob = encode_vectors(snapshot.dimension, count, &snapshot.vectors);
        let checksum = sha256_hex(&blob);

        let records = Records {
            metadata: SnapshotMetadata::new(snapshot.dimension, count, &snapshot.model, checksum),
            chunks: snapshot.chunks.clone(),
            entries: snapshot.metadata.clone(),
        };
        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        // Vectors first: a crash between the two renames leaves a checksum
        // mismatch, which load reports instead of serving stale rows.
        self.write_atomic(&self.vectors_path(), &blob)?;
        self.write_atomic(&self.records_path(), &json)?;

        tracing::debug!(
            target: "storage",
            "wrote snapshot: {count} entries, {} bytes of vectors",
            blob.len()
        );
        Ok(())
    }

    /// Read the snapshot, or `None` if either artifact is missing.
    #[must_use = "Load errors should be handled appropriately"]
    pub fn load(&self) -> StorageResult<Option<Snapshot>> {
        let records_path = self.records_path();
        let vectors_path = self.vectors_path();
        if !records_path.exists() || !vectors_path.exists() {
            return Ok(None);
        }

        let json = fs::read(&records_path)?;
        let records: Records = serde_json::from_slice(&json).map_err(|e| {
            StorageError::InvalidFormat {
                path: records_path.clone(),
                reason: e.to_string(),
            }
        })?;

        if records.metadata.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: records.metadata.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let file = File::open(&vectors_path)?;
        // SAFETY: the file is opened read-only and only read for the lifetime
        // of the map; snapshots are replaced by rename, never written in place.
        let mmap = unsafe { Mmap::map(&file)? };

        let actual = sha256_hex(&mmap);
        if actual != records.metadata.vectors_sha256 {
            return Err(StorageError::ChecksumMismatch {
                expected: records.metadata.vectors_sha256,
                actual,
            });
        }

        let (dimension, count, vectors) = decode_vectors(&vectors_path, &mmap)?;

        if dimension != records.metadata.dimension {
            return Err(StorageError::DimensionMismatch {
                records: records.metadata.dimension,
                vectors: dimension,
            });
        }

        if records.chunks.len() != count
            || records.entries.len() != count
            || records.metadata.entry_count != count
        {
            return Err(StorageError::CountMismatch {
                chunks: records.chunks.len(),
                metadata: records.entries.len(),
                vectors: count,
            });
        }

        Ok(Some(Snapshot {
            dimension,
            model: records.metadata.model,
            chunks: records.chunks,
            metadata: records.entries,
            vectors,
        }))
    }

    /// Read only the snapshot metadata, if a snapshot exists.
    pub fn metadata(&self) -> StorageResult<Option<SnapshotMetadata>> {
        let records_path = self.records_path();
        if !records_path.exists() {
            return Ok(None);
        }
        let json = fs::read(&records_path)?;
        let records: Records =
            serde_json::from_slice(&json).map_err(|e| StorageError::InvalidFormat {
                path: records_path,
                reason: e.to_string(),
            })?;
        Ok(Some(records.metadata))
    }

    /// Remove both artifacts
    pub fn clear(&self) -> StorageResult<()> {
        for path in [self.records_path(), self.vectors_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.base_path)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

fn encode_vectors(dimension: usize, count: usize, vectors: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    blob.extend_from_slice(VECTOR_MAGIC);
    blob.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    blob.extend_from_slice(&(dimension as u32).to_le_bytes());
    blob.extend_from_slice(&(count as u64).to_le_bytes());
    for value in vectors {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn decode_vectors(path: &Path, bytes: &[u8]) -> StorageResult<(usize, usize, Vec<f32>)> {
    let invalid = |reason: &str| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.len() < HEADER_LEN {
        return Err(invalid("file shorter than header"));
    }
    if &bytes[..8] != VECTOR_MAGIC {
        return Err(invalid("bad magic"));
    }

    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != SNAPSHOT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let dimension = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[16..24]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| invalid("header overflows"))?;
    if body.len() != expected_len {
        return Err(invalid(&format!(
            "expected {expected_len} bytes of vectors, found {}",
            body.len()
        )));
    }

    let vectors = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((dimension, count, vectors))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
