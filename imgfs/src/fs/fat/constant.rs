// SPDX-License-Identifier: MIT

// === Disk Layout Parameters ===

pub const FAT_SECTOR_SIZE: u16 = 512; // BPB_BytsPerSec
pub const FAT_SECTORS_PER_CLUSTER: u8 = 1; // BPB_SecPerClus
pub const FAT_CLUSTER_SIZE: u64 = FAT_SECTOR_SIZE as u64 * FAT_SECTORS_PER_CLUSTER as u64;
pub const FAT_NUM_FATS: u8 = 2; // BPB_NumFATs
pub const FAT_HEADS: u16 = 64; // BPB_NumHeads (CHS hint)
pub const FAT_SECTORS_PER_TRACK: u16 = 32; // BPB_SecPerTrk (CHS hint)
pub const FAT_MEDIA_DESCRIPTOR: u8 = 0xF8; // BPB_Media

pub const FAT16_RESERVED_SECTORS: u16 = 4;
pub const FAT16_ROOT_ENTRY_COUNT: u16 = 512;
pub const FAT32_RESERVED_SECTORS: u16 = 32;

// === Cluster count thresholds ===

/// Below this many data clusters no FAT16 volume can be formatted.
pub const FAT16_MIN_CLUSTERS: u32 = 4085;
/// From this many data clusters on the volume must be FAT32.
pub const FAT32_MIN_CLUSTERS: u32 = 65525;
pub const FAT32_MAX_CLUSTERS: u32 = 0x0FFF_FFF4;
/// Smallest partition that still formats (4085 clusters of FAT16).
pub const FAT_MIN_SECTORS: u64 = 4153;
/// Largest FAT16 volume with one sector per cluster (65524 clusters).
pub const FAT16_MAX_SECTORS: u32 = 66072;

// === FAT Region Parameters ===

pub const FAT16_MEDIA_ENTRY: u32 = 0xFFF8;
pub const FAT16_EOC: u32 = 0xFFFF;
pub const FAT32_MEDIA_ENTRY: u32 = 0x0FFF_FFF8;
pub const FAT32_EOC: u32 = 0x0FFF_FFFF;
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FIRST_CLUSTER: u32 = 2;
pub const FAT32_ROOT_CLUSTER: u32 = 2; // BPB_RootClus

// === Special Sector Numbers ===

pub const FAT_FSINFO_SECTOR: u16 = 1;
pub const FAT_VBR_BACKUP_SECTOR: u16 = 6;
/// Boot sector, FSInfo and the spare third sector are mirrored.
pub const FAT_BOOT_REGION_SECTORS: usize = 3;

// === Boot sector fields ===

pub const FAT16_JUMP_BOOT: [u8; 3] = [0xEB, 0x3C, 0x90];
pub const FAT32_JUMP_BOOT: [u8; 3] = [0xEB, 0x58, 0x90];
pub const FAT_OEM_NAME: &[u8; 8] = b"MSWIN4.1";
pub const FAT_DRIVE_NUMBER: u8 = 0x80;
pub const FAT_BOOT_SIGNATURE: u8 = 0x29;
pub const FAT_VOLUME_LABEL: &[u8; 11] = b"NO NAME    ";
pub const FAT16_FS_TYPE: &[u8; 8] = b"FAT16   ";
pub const FAT32_FS_TYPE: &[u8; 8] = b"FAT32   ";
pub const FAT_SIGNATURE_OFFSET: u64 = 0x1FE;
pub const FAT_SIGNATURE: u16 = 0xAA55;
/// Offset of the FAT16/FAT32 specific part of the BPB.
pub const FAT_EXT_BPB_OFFSET: u64 = 0x24;

// === FSINFO Constants ===

pub const FAT_FSINFO_LEAD_SIGNATURE: &[u8; 4] = b"RRaA";
pub const FAT_FSINFO_STRUCT_SIGNATURE: &[u8; 4] = b"rrAa";
pub const FAT_FSINFO_TRAIL_SIGNATURE: [u8; 4] = [0x00, 0x00, 0x55, 0xAA];

// === Directory records ===

pub const FAT_DIR_ENTRY_SIZE: u64 = 32;
pub const FAT_ENTRY_END_OF_DIR: u8 = 0x00;
pub const FAT_ENTRY_DELETED: u8 = 0xE5;
pub const FAT_DOT_NAME: &[u8; 11] = b".          ";
pub const FAT_DOTDOT_NAME: &[u8; 11] = b"..         ";
pub const FAT_LFN_CHARS: usize = 13;
pub const FAT_LFN_LAST: u8 = 0x40;
pub const FAT_LFN_MAX_UNITS: usize = 255;
