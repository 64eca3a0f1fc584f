// SPDX-License-Identifier: MIT

use crate::core::{capacity::Capacity, errors::*};
use crate::fs::minix::constant::*;

/// Volume layout: boot block, superblock, inode bitmap, zone bitmap,
/// inode table, data zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinixMeta {
    pub blocks: u32,
    pub inodes: u32,
    pub imap_blocks: u32,
    pub zmap_blocks: u32,
}

impl MinixMeta {
    pub fn new(capacity: &Capacity) -> FsFormatterResult<Self> {
        let blocks = capacity.bytes() / MINIX_BLOCK_SIZE;
        if blocks < MINIX_MIN_BLOCKS {
            return Err(FsFormatterError::BelowMinimum);
        }
        let blocks = u32::try_from(blocks).map_err(|_| FsFormatterError::Invalid("Minix volume too large"))?;

        let inodes = Self::inodes_for(blocks as u64 * (MINIX_BLOCK_SIZE / 1024));
        let mut meta = Self {
            blocks,
            inodes,
            imap_blocks: (inodes + 1).div_ceil(MINIX_BITS_PER_BLOCK),
            zmap_blocks: (blocks + 1).div_ceil(MINIX_BITS_PER_BLOCK),
        };
        if meta.first_data_zone() > MINIX_MAX_FIRST_ZONE {
            // Shrink the inode table until the first data zone fits the
            // 16-bit superblock field. A smaller imap only moves it lower.
            let bitmaps_end = meta.inode_table();
            let table = MINIX_MAX_FIRST_ZONE
                .checked_sub(bitmaps_end)
                .filter(|&t| t > 0)
                .ok_or(FsFormatterError::Invalid("Minix volume too large"))?;
            meta.inodes = table * MINIX_INODES_PER_BLOCK;
            meta.imap_blocks = (meta.inodes + 1).div_ceil(MINIX_BITS_PER_BLOCK);
        }
        if meta.first_data_zone() >= blocks {
            return Err(FsFormatterError::BelowMinimum);
        }
        Ok(meta)
    }

    /// Inode count scaled down on larger volumes, rounded up to whole
    /// inode table blocks.
    fn inodes_for(kb: u64) -> u32 {
        let divisor = match kb {
            0..100_000 => 2,
            100_000..1_000_000 => 4,
            1_000_000..10_000_000 => 6,
            10_000_000..100_000_000 => 8,
            100_000_000..1_000_000_000 => 10,
            _ => 12,
        };
        let inodes = (kb / divisor).next_multiple_of(MINIX_INODES_PER_BLOCK as u64);
        inodes.min(u32::MAX as u64 & !(MINIX_INODES_PER_BLOCK as u64 - 1)) as u32
    }

    #[inline]
    pub fn zmap_block(&self) -> u32 {
        MINIX_IMAP_BLOCK + self.imap_blocks
    }

    #[inline]
    pub fn inode_table(&self) -> u32 {
        self.zmap_block() + self.zmap_blocks
    }

    #[inline]
    pub fn inode_table_blocks(&self) -> u32 {
        self.inodes.div_ceil(MINIX_INODES_PER_BLOCK)
    }

    #[inline]
    pub fn first_data_zone(&self) -> u32 {
        self.inode_table() + self.inode_table_blocks()
    }

    /// Zone bitmap bit 0 is reserved; data zone `z` maps to bit `z - zoff`.
    #[inline]
    pub fn zoff(&self) -> u32 {
        self.first_data_zone() - 1
    }

    #[inline]
    pub fn data_zones(&self) -> u32 {
        self.blocks - self.first_data_zone()
    }

    #[inline]
    pub fn block_offset(&self, block: u32) -> u64 {
        block as u64 * MINIX_BLOCK_SIZE
    }

    #[inline]
    pub fn inode_offset(&self, ino: u32) -> u64 {
        self.block_offset(self.inode_table()) + (ino - 1) as u64 * MINIX_INODE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(blocks: u64) -> FsFormatterResult<MinixMeta> {
        MinixMeta::new(&Capacity::from_bytes(blocks * MINIX_BLOCK_SIZE, [0; 16]))
    }

    #[test]
    fn test_minimum() {
        assert_eq!(meta(7), Err(FsFormatterError::BelowMinimum));
        let m = meta(8).unwrap();
        assert_eq!(m.inodes, 64);
        assert_eq!((m.imap_blocks, m.zmap_blocks), (1, 1));
        assert_eq!(m.inode_table(), 4);
        assert_eq!(m.first_data_zone(), 5);
        assert_eq!(m.zoff(), 4);
        assert_eq!(m.data_zones(), 3);
    }

    #[test]
    fn test_inode_scaling() {
        // 64 MiB: 65536 KiB / 2
        let m = meta(16_384).unwrap();
        assert_eq!(m.inodes, 32_768);
        assert_eq!(m.imap_blocks, 2);
        assert_eq!(m.inode_table_blocks(), 512);

        // 512 MiB crosses the 100000 KiB threshold
        let m = meta(131_072).unwrap();
        assert_eq!(m.inodes, 131_072);
        assert_eq!(m.zmap_blocks, 5);
    }

    #[test]
    fn test_first_zone_fits_superblock() {
        // ~38 GiB would want 5 000 000 inodes and a 78 125 block table
        let m = meta(10_000_000).unwrap();
        assert_eq!(m.inodes, 4_164_736);
        assert_eq!((m.imap_blocks, m.zmap_blocks), (128, 306));
        assert_eq!(m.first_data_zone(), 65_510);
        assert_eq!(m.inodes % MINIX_INODES_PER_BLOCK, 0);

        // the zone bitmap alone runs past 16 bits
        assert_eq!(
            meta(u32::MAX as u64),
            Err(FsFormatterError::Invalid("Minix volume too large"))
        );
    }
}
