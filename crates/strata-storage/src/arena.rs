//! Simulated block-structured storage arena.
//!
//! The arena owns one contiguous memory region carved into fixed-capacity
//! blocks. Records are placed sequentially within the current block and spill
//! into a freshly allocated block when the remainder cannot hold them. Records
//! are never moved or freed individually; the arena is a monotonic append-only
//! backing store for the index built on top of it.

use strata_common::{BlockId, RecordHandle, Result, StorageConfig, StrataError};
use tracing::debug;

/// Bump allocator over a flat memory region divided into blocks.
///
/// Each successful [`BlockArena::add_record`] returns a stable
/// [`RecordHandle`] naming the block and intra-block offset of the reserved
/// bytes. The handle stays valid for the lifetime of the arena.
pub struct BlockArena {
    /// Contiguous memory region backing all blocks.
    data: Box<[u8]>,
    /// Capacity of a single block in bytes.
    block_capacity: usize,
    /// Number of blocks the region can hold.
    blocks_total: usize,
    /// Number of blocks handed out so far.
    blocks_used: usize,
    /// Bytes used in the current block.
    block_used: usize,
    /// Bytes used by records across all blocks.
    used_bytes: usize,
    /// Number of records stored.
    record_count: usize,
}

impl BlockArena {
    /// Creates an arena sized by the given configuration.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let blocks_total = config.max_blocks();
        let data = vec![0u8; blocks_total * config.block_capacity].into_boxed_slice();
        Ok(Self {
            data,
            block_capacity: config.block_capacity,
            blocks_total,
            blocks_used: 0,
            block_used: 0,
            used_bytes: 0,
            record_count: 0,
        })
    }

    /// Advances to a fresh block. Returns false once every block has been
    /// handed out.
    fn create_block(&mut self) -> bool {
        if self.blocks_used == self.blocks_total {
            return false;
        }
        self.blocks_used += 1;
        self.block_used = 0;
        debug!(block = self.blocks_used - 1, "allocated block");
        true
    }

    /// Reserves `size` bytes for a record and returns its handle.
    ///
    /// Spills to a new block when the current one has fewer than `size` free
    /// bytes (or no block is active yet). Fails with
    /// [`StrataError::RecordTooLarge`] when the record cannot fit in any
    /// block, and with [`StrataError::StorageExhausted`] once the arena has
    /// no blocks left.
    pub fn add_record(&mut self, size: usize) -> Result<RecordHandle> {
        if size > self.block_capacity {
            return Err(StrataError::RecordTooLarge {
                size,
                max: self.block_capacity,
            });
        }
        if self.blocks_used == 0 || self.block_capacity - self.block_used < size {
            if !self.create_block() {
                return Err(StrataError::StorageExhausted { requested: size });
            }
        }
        let handle = RecordHandle::new(
            BlockId((self.blocks_used - 1) as u32),
            self.block_used as u32,
        );
        self.block_used += size;
        self.used_bytes += size;
        self.record_count += 1;
        Ok(handle)
    }

    /// Copies record bytes into the region reserved by [`Self::add_record`].
    pub fn write(&mut self, handle: RecordHandle, bytes: &[u8]) -> Result<()> {
        let start = self.checked_range(handle, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Returns the `len` record bytes at `handle`.
    pub fn read(&self, handle: RecordHandle, len: usize) -> Result<&[u8]> {
        let start = self.checked_range(handle, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Resolves a handle to a region byte offset, rejecting accesses outside
    /// an allocated block or crossing a block boundary.
    fn checked_range(&self, handle: RecordHandle, len: usize) -> Result<usize> {
        let block = handle.block.0 as usize;
        let offset = handle.offset as usize;
        if block >= self.blocks_used || offset + len > self.block_capacity {
            return Err(StrataError::RecordOutOfBounds { handle, len });
        }
        Ok(block * self.block_capacity + offset)
    }

    /// Total capacity of the storage region in bytes.
    pub fn storage_capacity(&self) -> usize {
        self.blocks_total * self.block_capacity
    }

    /// Bytes allocated to blocks so far (full blocks, used or not).
    pub fn allocated_bytes(&self) -> usize {
        self.blocks_used * self.block_capacity
    }

    /// Bytes occupied by records.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Number of records stored.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Capacity of a single block in bytes.
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// Number of blocks handed out so far.
    pub fn blocks_used(&self) -> usize {
        self.blocks_used
    }

    /// Number of blocks the region can hold.
    pub fn blocks_total(&self) -> usize {
        self.blocks_total
    }

    /// Bytes occupied in the current block.
    pub fn current_block_used(&self) -> usize {
        self.block_used
    }
}
