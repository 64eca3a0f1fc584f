// SPDX-License-Identifier: MIT

use crate::core::{capacity::Capacity, errors::*};
use crate::fs::ext2::constant::*;

/// Block group geometry. Every group has the same layout:
/// superblock (copy), descriptor block (copy), block bitmap, inode bitmap,
/// inode table, then data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ext2Meta {
    pub blocks: u32,
    pub groups: u32,
    pub inodes_per_group: u32,
    pub inode_table_blocks: u32,
    pub uuid: [u8; 16],
}

impl Ext2Meta {
    pub fn new(capacity: &Capacity) -> FsFormatterResult<Self> {
        let total = capacity.bytes() / EXT2_BLOCK_SIZE;
        if total < EXT2_MIN_BLOCKS {
            return Err(FsFormatterError::BelowMinimum);
        }
        let max_blocks = EXT2_MAX_GROUPS as u64 * EXT2_BLOCKS_PER_GROUP as u64;
        if total > max_blocks {
            tracing::warn!(
                blocks = total,
                used = max_blocks,
                "ext2 descriptor block is full, partition tail left unused"
            );
        }
        let mut blocks = total.min(max_blocks) as u32;
        let mut groups = blocks.div_ceil(EXT2_BLOCKS_PER_GROUP);

        let inodes_per_group = Self::inodes_for(blocks, groups);
        let inode_table_blocks = Self::table_blocks(inodes_per_group);

        // A trailing group without room for a data block is dropped
        let tail = blocks - (groups - 1) * EXT2_BLOCKS_PER_GROUP;
        if groups > 1 && tail <= EXT2_INODE_TABLE + inode_table_blocks {
            groups -= 1;
            blocks = groups * EXT2_BLOCKS_PER_GROUP;
        }

        Ok(Self {
            blocks,
            groups,
            inodes_per_group,
            inode_table_blocks,
            uuid: capacity.guid,
        })
    }

    /// One inode per block, a multiple of 8 per group.
    fn inodes_for(blocks: u32, groups: u32) -> u32 {
        let per_group = (blocks / groups) & !7;
        per_group.clamp(EXT2_MIN_INODES_PER_GROUP, EXT2_MAX_INODES_PER_GROUP)
    }

    fn table_blocks(inodes_per_group: u32) -> u32 {
        (inodes_per_group as u64 * EXT2_INODE_SIZE).div_ceil(EXT2_BLOCK_SIZE) as u32
    }

    #[inline]
    pub fn inodes_count(&self) -> u32 {
        self.inodes_per_group * self.groups
    }

    #[inline]
    pub fn group_start(&self, group: u32) -> u32 {
        group * EXT2_BLOCKS_PER_GROUP
    }

    /// Blocks belonging to `group` (the last one may be short).
    #[inline]
    pub fn group_blocks(&self, group: u32) -> u32 {
        (self.blocks - self.group_start(group)).min(EXT2_BLOCKS_PER_GROUP)
    }

    /// Metadata blocks at the head of every group.
    #[inline]
    pub fn overhead(&self) -> u32 {
        EXT2_INODE_TABLE + self.inode_table_blocks
    }

    #[inline]
    pub fn block_bitmap(&self, group: u32) -> u32 {
        self.group_start(group) + EXT2_BLOCK_BITMAP
    }

    #[inline]
    pub fn inode_bitmap(&self, group: u32) -> u32 {
        self.group_start(group) + EXT2_INODE_BITMAP
    }

    #[inline]
    pub fn inode_table(&self, group: u32) -> u32 {
        self.group_start(group) + EXT2_INODE_TABLE
    }

    #[inline]
    pub fn block_offset(&self, block: u32) -> u64 {
        block as u64 * EXT2_BLOCK_SIZE
    }

    /// Byte offset of inode `ino` (1-based).
    #[inline]
    pub fn inode_offset(&self, ino: u32) -> u64 {
        let index = ino - 1;
        let group = index / self.inodes_per_group;
        self.block_offset(self.inode_table(group))
            + (index % self.inodes_per_group) as u64 * EXT2_INODE_SIZE
    }

    #[inline]
    pub fn desc_offset(&self, group: u32) -> u64 {
        self.block_offset(EXT2_GDT_BLOCK) + group as u64 * EXT2_DESC_SIZE
    }

    #[inline]
    pub fn reserved_blocks(&self) -> u32 {
        (self.blocks as u64 * EXT2_RESERVED_PERCENT as u64 / 100) as u32
    }
}
