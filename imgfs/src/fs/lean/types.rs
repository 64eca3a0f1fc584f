// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::lean::constant::*;

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct LeanSuperBlock {
    pub checksum: u32,
    pub magic: u32,
    pub fs_version: u16,
    pub pre_alloc_count: u8,
    pub log_sectors_per_band: u8,
    pub state: u32,
    pub uuid: [u8; 16],
    pub volume_label: [u8; 64],
    pub sector_count: u64,
    pub free_sector_count: u64,
    pub primary_super: u64,
    pub backup_super: u64,
    pub bitmap_start: u64,
    pub root_inode: u64,
    pub bad_inode: u64,
    pub journal_inode: u64,
    pub log_block_size: u8,
    pub reserved: [u8; 351],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct LeanInode {
    pub checksum: u32,
    pub magic: u32,
    pub extent_count: u8,
    pub reserved: [u8; 3],
    pub indirect_count: u32,
    pub links_count: u32,
    pub uid: u32,
    pub gid: u32,
    pub attributes: u32,
    pub file_size: u64,
    pub sector_count: u64,
    pub atime: u64,
    pub ctime: u64,
    pub mtime: u64,
    pub btime: u64,
    pub first_indirect: u64,
    pub last_indirect: u64,
    pub fork: u64,
    pub extent_start: [u64; LEAN_INODE_EXTENT_CNT],
    pub extent_size: [u32; LEAN_INODE_EXTENT_CNT],
}

impl LeanInode {
    /// Fresh inode whose first extent is its own sector.
    pub fn new(sector: u64, mode: u32, file_type: u8, micros: u64) -> Self {
        let mut attributes = (mode & LEAN_ATTR_PERM_MASK)
            | ((file_type as u32) << LEAN_ATTR_IFTYPE_SHIFT)
            | LEAN_ATTR_INLINEXTATTR;
        if file_type == LEAN_FT_DIR {
            attributes |= LEAN_ATTR_PREALLOC;
        }
        let mut extent_start = [0u64; LEAN_INODE_EXTENT_CNT];
        let mut extent_size = [0u32; LEAN_INODE_EXTENT_CNT];
        extent_start[0] = sector;
        extent_size[0] = 1;
        Self {
            magic: LEAN_INODE_MAGIC,
            extent_count: 1,
            attributes,
            sector_count: 1,
            atime: micros,
            ctime: micros,
            mtime: micros,
            btime: micros,
            extent_start,
            extent_size,
            ..Default::default()
        }
    }

    /// Extents in use as `(start, length)` pairs.
    pub fn extents(&self) -> impl Iterator<Item = (u64, u32)> {
        let (starts, sizes) = (self.extent_start, self.extent_size);
        (0..self.extent_count as usize).map(move |i| (starts[i], sizes[i]))
    }

    /// Physical sector holding logical sector `index` (0 is the inode).
    pub fn sector_at(&self, index: u64) -> Option<u64> {
        let mut base = 0u64;
        for (start, len) in self.extents() {
            if index < base + len as u64 {
                return Some(start + (index - base));
            }
            base += len as u64;
        }
        None
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct LeanDirEntryHeader {
    pub inode: u64,
    pub file_type: u8,
    /// In 16-byte units.
    pub rec_len: u8,
    pub name_len: u16,
}

/// Record length in bytes for a name of `name_len` bytes.
#[inline]
pub fn record_len(name_len: usize) -> u64 {
    (LEAN_DIRENT_HEADER as u64 + name_len as u64).next_multiple_of(LEAN_DIRENT_UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(core::mem::size_of::<LeanSuperBlock>() as u64, LEAN_SECTOR_SIZE);
        assert_eq!(core::mem::size_of::<LeanInode>(), LEAN_INODE_SIZE);
        assert_eq!(core::mem::size_of::<LeanDirEntryHeader>(), LEAN_DIRENT_HEADER);
    }

    #[test]
    fn test_record_len() {
        assert_eq!(record_len(1), 16);
        assert_eq!(record_len(4), 16);
        assert_eq!(record_len(5), 32);
        assert_eq!(record_len(20), 32);
        assert_eq!(record_len(21), 48);
    }

    #[test]
    fn test_extent_lookup() {
        let mut inode = LeanInode::new(100, 0o644, LEAN_FT_REG, 0);
        inode.extent_start = [100, 200, 0, 0, 0, 0];
        inode.extent_size = [3, 2, 0, 0, 0, 0];
        inode.extent_count = 2;
        assert_eq!(inode.sector_at(0), Some(100));
        assert_eq!(inode.sector_at(2), Some(102));
        assert_eq!(inode.sector_at(3), Some(200));
        assert_eq!(inode.sector_at(5), None);
    }

    #[test]
    fn test_attributes() {
        let dir = LeanInode::new(34, 0o755, LEAN_FT_DIR, 0);
        let attr = dir.attributes;
        assert_eq!(attr & LEAN_ATTR_PERM_MASK, 0o755);
        assert_eq!(attr >> LEAN_ATTR_IFTYPE_SHIFT, LEAN_FT_DIR as u32);
        assert_ne!(attr & LEAN_ATTR_PREALLOC, 0);
    }
}
