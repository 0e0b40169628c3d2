//! Block and record identifiers for the simulated storage arena.

use serde::{Deserialize, Serialize};

/// Identifier of a fixed-capacity block within the storage arena.
///
/// Blocks are numbered in allocation order, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Creates a new BlockId.
    pub fn new(num: u32) -> Self {
        Self(num)
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque locator for a record stored in the arena.
///
/// Combines the identity of the block holding the record with the record's
/// byte offset inside that block. The block identity is assigned when the
/// record is allocated; consumers never derive it from raw addresses.
/// Ownership of the referenced bytes stays with the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle {
    /// Block containing this record.
    pub block: BlockId,
    /// Byte offset within the block.
    pub offset: u32,
}

impl RecordHandle {
    /// Creates a new record handle.
    pub fn new(block: BlockId, offset: u32) -> Self {
        Self { block, offset }
    }

    /// Returns the handle as a single u64 for compact storage.
    pub fn as_u64(&self) -> u64 {
        ((self.block.0 as u64) << 32) | (self.offset as u64)
    }

    /// Creates a handle from a u64 representation.
    pub fn from_u64(value: u64) -> Self {
        Self {
            block: BlockId((value >> 32) as u32),
            offset: value as u32,
        }
    }
}

impl std::fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}
