// SPDX-License-Identifier: MIT

pub const MINIX_BLOCK_SIZE: u64 = 4096;
pub const MINIX_SUPERBLOCK_OFFSET: u64 = 1024;
pub const MINIX_SUPER_MAGIC_V3: u16 = 0x4D5A;
/// Smallest volume that still holds the metadata and a root directory zone.
pub const MINIX_MIN_BLOCKS: u64 = 8;

pub const MINIX_BITS_PER_BLOCK: u32 = (MINIX_BLOCK_SIZE * 8) as u32;
/// Inode bitmap starts right after the boot and super blocks.
pub const MINIX_IMAP_BLOCK: u32 = 2;
/// `s_firstdatazone` is a 16-bit superblock field.
pub const MINIX_MAX_FIRST_ZONE: u32 = u16::MAX as u32;

// === Inodes ===

pub const MINIX_INODE_SIZE: u64 = 64;
pub const MINIX_INODES_PER_BLOCK: u32 = (MINIX_BLOCK_SIZE / MINIX_INODE_SIZE) as u32;
pub const MINIX_ROOT_INO: u32 = 1;
pub const MINIX_NR_DZONES: u32 = 7;
pub const MINIX_IND_ZONE: usize = 7;
pub const MINIX_DIND_ZONE: usize = 8;
pub const MINIX_NR_TZONES: usize = 10;
pub const MINIX_INDIRECTS: u32 = (MINIX_BLOCK_SIZE / 4) as u32;
pub const MINIX_MAX_FILE_ZONES: u64 = MINIX_NR_DZONES as u64
    + MINIX_INDIRECTS as u64
    + MINIX_INDIRECTS as u64 * MINIX_INDIRECTS as u64;
pub const MINIX_MAX_SIZE: u64 = i32::MAX as u64;

// === Directory records ===

pub const MINIX_DIRSIZ: usize = 60;
pub const MINIX_DIRENT_SIZE: u64 = 64;
