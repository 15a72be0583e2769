pub mod error;
pub mod metadata;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use metadata::{SNAPSHOT_VERSION, SnapshotMetadata};
pub use persistence::{IndexPersistence, RECORDS_FILE, Snapshot, VECTORS_FILE};
