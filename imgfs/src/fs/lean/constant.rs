// SPDX-License-Identifier: MIT

pub const LEAN_SECTOR_SIZE: u64 = 512;

// === Superblock ===

pub const LEAN_SUPER_MAGIC: u32 = 0x4E41_454C; // "LEAN"
pub const LEAN_SUPER_VERSION: u16 = 0x0007;
pub const LEAN_STATE_CLEAN: u32 = 1;
/// Sectors 0..32 are left to a boot loader.
pub const LEAN_PRIMARY_SUPER: u64 = 32;
pub const LEAN_BITMAP_START: u64 = LEAN_PRIMARY_SUPER + 1;
pub const LEAN_PREALLOC: u8 = 7;
pub const LEAN_LOG_BLOCK_SIZE: u8 = 9;
pub const LEAN_LABEL: &[u8] = b"NO NAME";

// === Bands ===

pub const LEAN_LOG_BANDSIZE: u8 = 12;
pub const LEAN_BAND_SECTORS: u64 = 1 << LEAN_LOG_BANDSIZE;
/// One bitmap sector covers one band.
pub const LEAN_BITMAP_SECTORS: u64 = LEAN_BAND_SECTORS / (LEAN_SECTOR_SIZE * 8);

/// Loader area, superblock, first bitmap, a root directory with its
/// pre-allocated sectors and the backup superblock.
pub const LEAN_MIN_SECTORS: u64 = LEAN_BITMAP_START + LEAN_BITMAP_SECTORS + 1 + LEAN_PREALLOC as u64 + 1;

// === Inodes ===

pub const LEAN_INODE_MAGIC: u32 = 0x4544_4F4E; // "NODE"
pub const LEAN_INODE_SIZE: usize = 176;
pub const LEAN_INODE_EXTENT_CNT: usize = 6;

pub const LEAN_ATTR_PREALLOC: u32 = 1 << 18;
pub const LEAN_ATTR_INLINEXTATTR: u32 = 1 << 19;
pub const LEAN_ATTR_IFTYPE_SHIFT: u32 = 29;
pub const LEAN_ATTR_PERM_MASK: u32 = 0xFFF;

pub const LEAN_FT_REG: u8 = 1;
pub const LEAN_FT_DIR: u8 = 2;
pub const LEAN_FT_LNK: u8 = 3;

// === Directory records ===

pub const LEAN_DIRENT_UNIT: u64 = 16;
pub const LEAN_DIRENT_HEADER: usize = 12;
pub const LEAN_MAX_RECORD_UNITS: u64 = u8::MAX as u64;
