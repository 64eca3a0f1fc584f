// SPDX-License-Identifier: MIT

// === Geometry ===

pub const EXT2_BLOCK_SIZE: u64 = 4096;
pub const EXT2_LOG_BLOCK_SIZE: u32 = 2; // 1024 << 2
pub const EXT2_BLOCKS_PER_GROUP: u32 = (EXT2_BLOCK_SIZE * 8) as u32;
pub const EXT2_MAX_INODES_PER_GROUP: u32 = (EXT2_BLOCK_SIZE * 8) as u32;
pub const EXT2_INODE_SIZE: u64 = 128;
/// One full inode table block; the kernel rejects fewer.
pub const EXT2_MIN_INODES_PER_GROUP: u32 = (EXT2_BLOCK_SIZE / EXT2_INODE_SIZE) as u32;
pub const EXT2_DESC_SIZE: u64 = 32;
/// Group descriptors must fit in the single descriptor block.
pub const EXT2_MAX_GROUPS: u32 = (EXT2_BLOCK_SIZE / EXT2_DESC_SIZE) as u32 - 1;
/// Superblock, descriptors, root and a 4-block lost+found need this much.
pub const EXT2_MIN_BLOCKS: u64 = 16;

// === Fixed block positions inside a group ===

pub const EXT2_GDT_BLOCK: u32 = 1;
pub const EXT2_BLOCK_BITMAP: u32 = 2;
pub const EXT2_INODE_BITMAP: u32 = 3;
pub const EXT2_INODE_TABLE: u32 = 4;

// === Superblock ===

pub const EXT2_SUPERBLOCK_OFFSET: u64 = 1024;
pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;
pub const EXT2_VALID_FS: u16 = 1;
pub const EXT2_ERRORS_CONTINUE: u16 = 1;
pub const EXT2_DYNAMIC_REV: u32 = 1;
pub const EXT2_OS_LINUX: u32 = 0;
pub const EXT2_MAX_MNT_COUNT: u16 = 65535;
pub const EXT2_FEATURE_INCOMPAT_FILETYPE: u32 = 0x0002;
pub const EXT2_RESERVED_PERCENT: u32 = 5;

// === Inodes ===

pub const EXT2_BAD_INO: u32 = 1;
pub const EXT2_ROOT_INO: u32 = 2;
pub const EXT2_FIRST_INO: u32 = 11;
/// Symlink targets shorter than `i_block` live inside it.
pub const EXT2_FAST_SYMLINK_MAX: usize = 60;
pub const EXT2_LOST_FOUND_INO: u32 = 11;
pub const EXT2_LOST_FOUND_BLOCKS: u32 = 4;
pub const EXT2_NDIR_BLOCKS: u32 = 12;
pub const EXT2_IND_BLOCK: usize = 12;
pub const EXT2_DIND_BLOCK: usize = 13;
pub const EXT2_PTRS_PER_BLOCK: u32 = (EXT2_BLOCK_SIZE / 4) as u32;
/// Direct + single + double indirect blocks.
pub const EXT2_MAX_FILE_BLOCKS: u64 = EXT2_NDIR_BLOCKS as u64
    + EXT2_PTRS_PER_BLOCK as u64
    + EXT2_PTRS_PER_BLOCK as u64 * EXT2_PTRS_PER_BLOCK as u64;
/// 512-byte units counted in `i_blocks` per filesystem block.
pub const EXT2_SECTORS_PER_BLOCK: u32 = (EXT2_BLOCK_SIZE / 512) as u32;

// === Directory entries ===

pub const EXT2_DIRENT_HEADER: u64 = 8;
pub const EXT2_NAME_LEN: usize = 255;

pub const EXT2_FT_UNKNOWN: u8 = 0;
pub const EXT2_FT_REG_FILE: u8 = 1;
pub const EXT2_FT_DIR: u8 = 2;
pub const EXT2_FT_CHRDEV: u8 = 3;
pub const EXT2_FT_BLKDEV: u8 = 4;
pub const EXT2_FT_SYMLINK: u8 = 7;
