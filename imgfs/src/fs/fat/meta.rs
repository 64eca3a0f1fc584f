// SPDX-License-Identifier: MIT

use crate::core::{capacity::Capacity, errors::*};
use crate::fs::fat::constant::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat16,
    Fat32,
}

/// Geometry of one FAT volume, derived from the partition size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatMeta {
    pub fat_type: FatType,
    /// Sectors covered by the BPB (may be less than the partition).
    pub total_sectors: u32,
    pub reserved_sectors: u16,
    pub sectors_per_fat: u32,
    pub root_dir_sectors: u32,
    /// Data clusters, numbered from 2.
    pub clusters: u32,
    pub hidden_sectors: u32,
    pub volume_id: u32,
}

impl FatMeta {
    pub fn new(capacity: &Capacity) -> FsFormatterResult<Self> {
        let sectors = capacity.sectors();
        if sectors < FAT_MIN_SECTORS {
            return Err(FsFormatterError::BelowMinimum);
        }
        let total = u32::try_from(sectors).unwrap_or(u32::MAX);

        let (fat_type, total, spf, clusters) = match Self::layout(FatType::Fat16, total) {
            (_, clusters) if clusters < FAT16_MIN_CLUSTERS => {
                return Err(FsFormatterError::BelowMinimum);
            }
            (spf, clusters) if clusters < FAT32_MIN_CLUSTERS => (FatType::Fat16, total, spf, clusters),
            _ => match Self::layout(FatType::Fat32, total) {
                (spf, clusters) if clusters >= FAT32_MIN_CLUSTERS => {
                    (FatType::Fat32, total, spf, clusters)
                }
                // Too big for FAT16, too small for FAT32: use the largest FAT16
                _ => {
                    let (spf, clusters) = Self::layout(FatType::Fat16, FAT16_MAX_SECTORS);
                    (FatType::Fat16, FAT16_MAX_SECTORS, spf, clusters)
                }
            },
        };

        if clusters > FAT32_MAX_CLUSTERS {
            return Err(FsFormatterError::Invalid(
                "Partition too large for FAT32 with one sector per cluster",
            ));
        }

        Ok(Self {
            fat_type,
            total_sectors: total,
            reserved_sectors: Self::reserved_for(fat_type),
            sectors_per_fat: spf,
            root_dir_sectors: Self::root_dir_sectors_for(fat_type),
            clusters,
            hidden_sectors: u32::try_from(capacity.first_lba).unwrap_or(u32::MAX),
            volume_id: capacity.serial(),
        })
    }

    fn reserved_for(fat_type: FatType) -> u16 {
        match fat_type {
            FatType::Fat16 => FAT16_RESERVED_SECTORS,
            FatType::Fat32 => FAT32_RESERVED_SECTORS,
        }
    }

    fn root_dir_sectors_for(fat_type: FatType) -> u32 {
        match fat_type {
            FatType::Fat16 => {
                (FAT16_ROOT_ENTRY_COUNT as u32 * FAT_DIR_ENTRY_SIZE as u32)
                    .div_ceil(FAT_SECTOR_SIZE as u32)
            }
            FatType::Fat32 => 0,
        }
    }

    /// FAT size and data cluster count, per the FAT sizing formula of the
    /// Microsoft FAT specification.
    fn layout(fat_type: FatType, total: u32) -> (u32, u32) {
        let reserved = Self::reserved_for(fat_type) as u32;
        let root = Self::root_dir_sectors_for(fat_type);
        let tmp1 = total.saturating_sub(reserved + root);
        let mut tmp2 = 256 * FAT_SECTORS_PER_CLUSTER as u32 + FAT_NUM_FATS as u32;
        if fat_type == FatType::Fat32 {
            tmp2 /= 2;
        }
        let spf = tmp1.div_ceil(tmp2);
        let data = total.saturating_sub(reserved + FAT_NUM_FATS as u32 * spf + root);
        (spf, data / FAT_SECTORS_PER_CLUSTER as u32)
    }

    #[inline]
    pub fn first_data_sector(&self) -> u64 {
        self.reserved_sectors as u64
            + FAT_NUM_FATS as u64 * self.sectors_per_fat as u64
            + self.root_dir_sectors as u64
    }

    /// Byte offset of FAT copy `copy` (0 or 1).
    #[inline]
    pub fn fat_offset(&self, copy: u8) -> u64 {
        (self.reserved_sectors as u64 + copy as u64 * self.sectors_per_fat as u64)
            * FAT_SECTOR_SIZE as u64
    }

    /// Byte offset of the fixed FAT16 root directory region.
    #[inline]
    pub fn root_dir_offset(&self) -> u64 {
        self.fat_offset(FAT_NUM_FATS)
    }

    #[inline]
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        (self.first_data_sector()
            + (cluster as u64 - FAT_FIRST_CLUSTER as u64) * FAT_SECTORS_PER_CLUSTER as u64)
            * FAT_SECTOR_SIZE as u64
    }

    /// Highest valid cluster number.
    #[inline]
    pub fn max_cluster(&self) -> u32 {
        self.clusters + 1
    }

    #[inline]
    pub fn eoc(&self) -> u32 {
        match self.fat_type {
            FatType::Fat16 => FAT16_EOC,
            FatType::Fat32 => FAT32_EOC,
        }
    }

    /// Bytes per FAT entry.
    #[inline]
    pub fn entry_size(&self) -> u64 {
        match self.fat_type {
            FatType::Fat16 => 2,
            FatType::Fat32 => 4,
        }
    }

    /// First cluster handed out to content (the FAT32 root owns cluster 2).
    #[inline]
    pub fn first_free_cluster(&self) -> u32 {
        match self.fat_type {
            FatType::Fat16 => FAT_FIRST_CLUSTER,
            FatType::Fat32 => FAT32_ROOT_CLUSTER + 1,
        }
    }

    #[inline]
    pub fn is_eoc(&self, value: u32) -> bool {
        match self.fat_type {
            FatType::Fat16 => value >= 0xFFF8,
            FatType::Fat32 => value & FAT32_ENTRY_MASK >= 0x0FFF_FFF8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(sectors: u64) -> FsFormatterResult<FatMeta> {
        FatMeta::new(&Capacity::from_sectors(sectors, [0; 16]))
    }

    #[test]
    fn test_minimum_boundary() {
        assert_eq!(meta(FAT_MIN_SECTORS - 1), Err(FsFormatterError::BelowMinimum));
        let m = meta(FAT_MIN_SECTORS).unwrap();
        assert_eq!(m.fat_type, FatType::Fat16);
        assert_eq!(m.clusters, FAT16_MIN_CLUSTERS);
        assert_eq!(m.sectors_per_fat, 16);
        assert_eq!(m.first_data_sector(), 4 + 32 + 32);
    }

    #[test]
    fn test_fat16_fat32_switch() {
        let m = meta(FAT16_MAX_SECTORS as u64).unwrap();
        assert_eq!((m.fat_type, m.clusters), (FatType::Fat16, 65524));

        // FAT32 would have too few clusters here
        let m = meta(FAT16_MAX_SECTORS as u64 + 1).unwrap();
        assert_eq!(m.fat_type, FatType::Fat16);
        assert_eq!(m.total_sectors, FAT16_MAX_SECTORS);

        let m = meta(70_000).unwrap();
        assert_eq!(m.fat_type, FatType::Fat32);
        assert_eq!(m.sectors_per_fat, 543);
        assert_eq!(m.clusters, 68_882);
        assert!(m.clusters >= FAT32_MIN_CLUSTERS);
    }

    #[test]
    fn test_offsets() {
        let m = meta(FAT_MIN_SECTORS).unwrap();
        assert_eq!(m.fat_offset(0), 4 * 512);
        assert_eq!(m.fat_offset(1), (4 + 16) * 512);
        assert_eq!(m.root_dir_offset(), (4 + 32) * 512);
        assert_eq!(m.cluster_offset(2), 68 * 512);
        assert_eq!(m.max_cluster(), 4086);
    }
}
