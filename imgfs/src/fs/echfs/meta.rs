// SPDX-License-Identifier: MIT

use crate::core::{capacity::Capacity, errors::*};
use crate::fs::echfs::constant::*;

/// Volume layout: reserved blocks, allocation table, main directory, data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchMeta {
    pub blocks: u64,
    pub max_entries: u64,
}

impl EchMeta {
    /// Partition geometry; the main directory takes 5% of the blocks.
    pub fn new(capacity: &Capacity) -> FsFormatterResult<Self> {
        let blocks = capacity.bytes() / ECH_BLOCK_SIZE;
        let dir_bytes = blocks * ECH_DIR_PERCENT / 100 * ECH_BLOCK_SIZE;
        let meta = Self {
            blocks,
            max_entries: dir_bytes / ECH_ENTRY_SIZE,
        };
        if meta.max_entries == 0 || meta.data_start() >= blocks {
            return Err(FsFormatterError::BelowMinimum);
        }
        Ok(meta)
    }

    /// Initrd geometry sized to exactly hold `entries` and `data_bytes`.
    pub fn fitted(entries: u64, data_bytes: u64) -> Self {
        let content = (entries * ECH_ENTRY_SIZE + data_bytes).div_ceil(ECH_BLOCK_SIZE);
        let mut meta = Self {
            blocks: ECH_ALLOC_TABLE_BLOCK + content,
            max_entries: entries,
        };
        // The table also has to cover its own blocks
        while meta.blocks < ECH_ALLOC_TABLE_BLOCK + content + meta.alloc_blocks() {
            meta.blocks += 1;
        }
        meta
    }

    #[inline]
    pub fn alloc_blocks(&self) -> u64 {
        (self.blocks * ECH_ALLOC_ENTRY).div_ceil(ECH_BLOCK_SIZE)
    }

    #[inline]
    pub fn dir_blocks(&self) -> u64 {
        (self.max_entries * ECH_ENTRY_SIZE).div_ceil(ECH_BLOCK_SIZE)
    }

    #[inline]
    pub fn dir_start(&self) -> u64 {
        ECH_ALLOC_TABLE_BLOCK + self.alloc_blocks()
    }

    /// First block of the data region.
    #[inline]
    pub fn data_start(&self) -> u64 {
        self.dir_start() + self.dir_blocks()
    }

    #[inline]
    pub fn offset(&self, block: u64) -> u64 {
        block * ECH_BLOCK_SIZE
    }
}
