// SPDX-License-Identifier: MIT

pub const FSZ_SECTOR_SIZE: u64 = 4096;
pub const FSZ_VERSION_MAJOR: u8 = 1;
pub const FSZ_VERSION_MINOR: u8 = 0;
/// 0 = 2048, 1 = 4096, 2 = 8192 bytes per logical sector.
pub const FSZ_LOGSEC: u8 = 1;
pub const FSZ_MAX_MOUNTS: u16 = 255;

pub const FSZ_MAGIC: &[u8; 4] = b"FS/Z";
pub const FSZ_IN_MAGIC: &[u8; 4] = b"FSIN";
pub const FSZ_DIR_MAGIC: &[u8; 4] = b"FSDR";

/// Superblock CRC covers bytes 512..1020 of sector 0.
pub const FSZ_SB_CRC_START: usize = 512;
pub const FSZ_SB_CRC_END: usize = 1020;
/// Inode CRC covers the 1016 bytes after the checksum field.
pub const FSZ_IN_CRC_START: usize = 8;
pub const FSZ_IN_CRC_LEN: usize = 1016;

pub const FSZ_ROOT_FID: u64 = 1;
/// Sector 0 holds the superblock, sector 1 the root directory.
pub const FSZ_MIN_SECTORS: u64 = 2;

// === Inodes ===

pub const FSZ_INODE_HEADER: u64 = 1024;
/// Bytes available for inline data after the inode header.
pub const FSZ_INLINE_SIZE: u64 = FSZ_SECTOR_SIZE - FSZ_INODE_HEADER;
pub const FSZ_MIME_LEN: usize = 36;

pub const FSZ_READ: u8 = 1 << 0;
pub const FSZ_WRITE: u8 = 1 << 1;
pub const FSZ_EXEC: u8 = 1 << 2;
pub const FSZ_DELETE: u8 = 1 << 4;

pub const FSZ_IN_FLAG_INLINE: u64 = 0xFF;
pub const FSZ_IN_FLAG_DIRECT: u64 = 0x00;
pub const FSZ_IN_FLAG_SD0: u64 = 0x7F;
pub const FSZ_IN_FLAG_SD1: u64 = 0x01;

/// Sector directory entry size (`u64 sec, u32 sec_hi, u32 chksum`).
pub const FSZ_SD_ENTRY: u64 = 16;
pub const FSZ_SD0_MAX: u64 = FSZ_INLINE_SIZE / FSZ_SD_ENTRY;
pub const FSZ_SD1_MAX: u64 = FSZ_SECTOR_SIZE / FSZ_SD_ENTRY;

// === File types ===

pub const FSZ_FILETYPE_DIR: &[u8; 4] = b"dir:";
pub const FSZ_FILETYPE_SYMLINK: &[u8; 4] = b"lnk:";
pub const FSZ_FILETYPE_TEXT: &[u8; 4] = b"text";
pub const FSZ_FILETYPE_IMAGE: &[u8; 4] = b"imag";
pub const FSZ_FILETYPE_FONT: &[u8; 4] = b"font";
pub const FSZ_FILETYPE_MODEL: &[u8; 4] = b"mode";
pub const FSZ_FILETYPE_APP: &[u8; 4] = b"appl";
pub const FSZ_FILETYPE_BOOT: &[u8; 4] = b"boot";
pub const FSZ_MIMETYPE_DIR_ROOT: &str = "fs-root";

// === Directories ===

pub const FSZ_DIRENT_SIZE: u64 = 128;
pub const FSZ_DIRENT_NAME: usize = 112;
/// Longest stored name; a directory's trailing `/` and the NUL follow it.
pub const FSZ_NAME_MAX: usize = 110;
/// Entries that fit inline next to the directory header.
pub const FSZ_DIR_INLINE_ENTRIES: u64 = (FSZ_INLINE_SIZE - FSZ_DIRENT_SIZE) / FSZ_DIRENT_SIZE;
/// Entries addressable through an inline sector directory.
pub const FSZ_DIR_MAX_ENTRIES: u64 = (FSZ_SD0_MAX * FSZ_SECTOR_SIZE - FSZ_DIRENT_SIZE) / FSZ_DIRENT_SIZE;
