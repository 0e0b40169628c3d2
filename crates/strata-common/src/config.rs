//! Configuration structures for StrataDB.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Default simulated storage size in bytes (100 MB).
pub const DEFAULT_STORAGE_CAPACITY: usize = 100_000_000;

/// Default simulated block size in bytes.
pub const DEFAULT_BLOCK_CAPACITY: usize = 500;

/// Storage configuration for the simulated block device.
///
/// `block_capacity` is the single knob the whole system is sized from: the
/// arena carves its region into blocks of this size, and the index derives
/// its node fanout from it so that a node fits in one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Total capacity of the simulated storage region in bytes.
    pub storage_capacity: usize,
    /// Capacity of a single block in bytes.
    pub block_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_capacity: DEFAULT_STORAGE_CAPACITY,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
        }
    }
}

impl StorageConfig {
    /// Creates a config with the given capacities.
    pub fn new(storage_capacity: usize, block_capacity: usize) -> Self {
        Self {
            storage_capacity,
            block_capacity,
        }
    }

    /// Checks that the capacities describe a usable storage region.
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(StrataError::InvalidParameter {
                name: "block_capacity".to_string(),
                value: self.block_capacity.to_string(),
            });
        }
        if self.storage_capacity < self.block_capacity {
            return Err(StrataError::InvalidParameter {
                name: "storage_capacity".to_string(),
                value: self.storage_capacity.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the number of whole blocks the storage region can hold.
    pub fn max_blocks(&self) -> usize {
        self.storage_capacity / self.block_capacity
    }
}
