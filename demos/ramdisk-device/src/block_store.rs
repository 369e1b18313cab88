//! A deliberately simple block-capacity accountant. Files store their bytes
//! directly (see `RamdiskApp`'s `FileEntry`); this just tracks how many
//! fixed-size blocks are "allocated" against a fixed total, so the demo
//! behaves like a capacity-limited block device rather than an unbounded
//! `Vec`.

use crate::error::DemoError;

pub const BLOCK_SIZE: usize = 256;
pub const TOTAL_BLOCKS: usize = 512;

pub struct BlockStore {
    free_blocks: usize,
}

impl BlockStore {
    pub fn new() -> Self {
        Self {
            free_blocks: TOTAL_BLOCKS,
        }
    }

    pub fn blocks_for_len(len: usize) -> usize {
        (len + BLOCK_SIZE - 1) / BLOCK_SIZE
    }

    /// Adjust the allocation to `new_blocks`, failing if growth exceeds
    /// capacity. `old_blocks` is returned to the free pool first so shrinking
    /// a file never spuriously reports `DiskFull`.
    pub fn resize(&mut self, old_blocks: usize, new_blocks: usize) -> Result<(), DemoError> {
        self.free_blocks += old_blocks;
        if new_blocks > self.free_blocks {
            self.free_blocks -= old_blocks;
            return Err(DemoError::DiskFull);
        }
        self.free_blocks -= new_blocks;
        Ok(())
    }

    pub fn free(&mut self, blocks: usize) {
        self.free_blocks += blocks;
    }

    pub fn free_blocks(&self) -> usize {
        self.free_blocks
    }
}
