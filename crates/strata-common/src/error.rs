//! Error types for StrataDB.

use crate::block::RecordHandle;
use thiserror::Error;

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors that can occur in StrataDB operations.
#[derive(Debug, Error)]
pub enum StrataError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Arena errors
    #[error("Storage exhausted: no free block for a {requested} byte record")]
    StorageExhausted { requested: usize },

    #[error("Record too large: {size} bytes (block capacity {max})")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Record access out of bounds: {handle}, {len} bytes")]
    RecordOutOfBounds { handle: RecordHandle, len: usize },

    // Index errors
    #[error("B+ tree is empty")]
    EmptyTree,

    #[error("Key not found: {0}")]
    KeyNotFound(i64),

    #[error("B+ tree corrupted: {0}")]
    Corrupted(String),

    // Ingestion errors
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Configuration errors
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}
