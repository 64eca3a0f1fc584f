// SPDX-License-Identifier: MIT

pub const ECH_BLOCK_SIZE: u64 = 512;
pub const ECH_SIGNATURE: &[u8; 8] = b"_ECH_FS_";
/// Blocks 0..16 hold the superblock and the reserved area.
pub const ECH_ALLOC_TABLE_BLOCK: u64 = 16;
pub const ECH_INITRD_UUID: &[u8; 6] = b"INITRD";

/// Share of a partition given to the main directory, in percent.
pub const ECH_DIR_PERCENT: u64 = 5;

// === Allocation table ===

pub const ECH_ALLOC_ENTRY: u64 = 8;
pub const ECH_RESERVED_BLOCK: u64 = 0xFFFF_FFFF_FFFF_FFF0;
pub const ECH_END_OF_CHAIN: u64 = 0xFFFF_FFFF_FFFF_FFFF;

// === Directory entries ===

pub const ECH_ENTRY_SIZE: u64 = 256;
pub const ECH_NAME_LEN: usize = 201;
pub const ECH_ROOT_ID: u64 = 0xFFFF_FFFF_FFFF_FFFF;
pub const ECH_TYPE_FILE: u8 = 0;
pub const ECH_TYPE_DIR: u8 = 1;
