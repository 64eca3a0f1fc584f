// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::ext2::constant::*;

/// Revision 1 superblock (the first 1024 bytes of it are defined, the rest
/// is zero padding).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Ext2SuperBlock {
    pub s_inodes_count: u32,
    pub s_blocks_count: u32,
    pub s_r_blocks_count: u32,
    pub s_free_blocks_count: u32,
    pub s_free_inodes_count: u32,
    pub s_first_data_block: u32,
    pub s_log_block_size: u32,
    pub s_log_frag_size: u32,
    pub s_blocks_per_group: u32,
    pub s_frags_per_group: u32,
    pub s_inodes_per_group: u32,
    pub s_mtime: u32,
    pub s_wtime: u32,
    pub s_mnt_count: u16,
    pub s_max_mnt_count: u16,
    pub s_magic: u16,
    pub s_state: u16,
    pub s_errors: u16,
    pub s_minor_rev_level: u16,
    pub s_lastcheck: u32,
    pub s_checkinterval: u32,
    pub s_creator_os: u32,
    pub s_rev_level: u32,
    pub s_def_resuid: u16,
    pub s_def_resgid: u16,
    pub s_first_ino: u32,
    pub s_inode_size: u16,
    pub s_block_group_nr: u16,
    pub s_feature_compat: u32,
    pub s_feature_incompat: u32,
    pub s_feature_ro_compat: u32,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
    pub s_last_mounted: [u8; 64],
    pub s_algo_bitmap: u32,
    pub padding: [u8; 820],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct Ext2GroupDesc {
    pub bg_block_bitmap: u32,
    pub bg_inode_bitmap: u32,
    pub bg_inode_table: u32,
    pub bg_free_blocks_count: u16,
    pub bg_free_inodes_count: u16,
    pub bg_used_dirs_count: u16,
    pub bg_pad: u16,
    pub bg_reserved: [u8; 12],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct Ext2Inode {
    pub i_mode: u16,
    pub i_uid: u16,
    pub i_size: u32,
    pub i_atime: u32,
    pub i_ctime: u32,
    pub i_mtime: u32,
    pub i_dtime: u32,
    pub i_gid: u16,
    pub i_links_count: u16,
    pub i_blocks: u32,
    pub i_flags: u32,
    pub i_osd1: u32,
    pub i_block: [u32; 15],
    pub i_generation: u32,
    pub i_file_acl: u32,
    pub i_dir_acl: u32,
    pub i_faddr: u32,
    pub l_i_frag: u8,
    pub l_i_fsize: u8,
    pub i_pad1: u16,
    pub l_i_uid_high: u16,
    pub l_i_gid_high: u16,
    pub l_i_reserved2: u32,
}

impl Ext2Inode {
    pub fn new(mode: u32, uid: u32, gid: u32, time: u32) -> Self {
        Self {
            i_mode: mode as u16,
            i_uid: uid as u16,
            i_gid: gid as u16,
            l_i_uid_high: (uid >> 16) as u16,
            l_i_gid_high: (gid >> 16) as u16,
            i_atime: time,
            i_ctime: time,
            i_mtime: time,
            i_links_count: 1,
            ..Default::default()
        }
    }

    #[inline]
    pub fn block(&self, slot: usize) -> u32 {
        let blocks = self.i_block;
        blocks[slot]
    }

    #[inline]
    pub fn set_block(&mut self, slot: usize, value: u32) {
        let mut blocks = self.i_block;
        blocks[slot] = value;
        self.i_block = blocks;
    }

    /// Counts one more filesystem block in `i_blocks`.
    #[inline]
    pub fn charge_block(&mut self) {
        self.i_blocks += EXT2_SECTORS_PER_BLOCK;
    }

    /// Stores a fast symlink target in `i_block`. No block is charged.
    pub fn set_inline(&mut self, target: &[u8]) {
        let mut bytes = [0u8; EXT2_FAST_SYMLINK_MAX];
        bytes[..target.len()].copy_from_slice(target);
        let mut blocks = [0u32; 15];
        for (word, chunk) in blocks.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.i_block = blocks;
        self.i_size = target.len() as u32;
    }

    pub fn inline(&self) -> [u8; EXT2_FAST_SYMLINK_MAX] {
        let mut bytes = [0u8; EXT2_FAST_SYMLINK_MAX];
        let blocks = self.i_block;
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(blocks) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Ext2DirEntryHeader {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
}

/// On-disk length of a record holding `name_len` bytes of name.
#[inline]
pub fn dirent_size(name_len: usize) -> u64 {
    EXT2_DIRENT_HEADER + (name_len as u64).next_multiple_of(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(core::mem::size_of::<Ext2SuperBlock>(), 1024);
        assert_eq!(core::mem::size_of::<Ext2GroupDesc>() as u64, EXT2_DESC_SIZE);
        assert_eq!(core::mem::size_of::<Ext2Inode>() as u64, EXT2_INODE_SIZE);
        assert_eq!(core::mem::size_of::<Ext2DirEntryHeader>() as u64, EXT2_DIRENT_HEADER);
    }

    #[test]
    fn test_dirent_size() {
        assert_eq!(dirent_size(1), 12);
        assert_eq!(dirent_size(4), 12);
        assert_eq!(dirent_size(10), 20);
    }

    #[test]
    fn test_inode_owner_split() {
        let inode = Ext2Inode::new(0o100644, 0x0001_0002, 3, 7);
        let (lo, hi) = (inode.i_uid, inode.l_i_uid_high);
        assert_eq!((lo, hi), (2, 1));
        assert_eq!(inode.block(0), 0);
    }

    #[test]
    fn test_inline_target() {
        let mut inode = Ext2Inode::new(0o120777, 0, 0, 0);
        inode.set_inline(b"../lib/ld.so");
        let (size, blocks) = (inode.i_size, inode.i_blocks);
        assert_eq!((size, blocks), (12, 0));
        assert_eq!(inode.block(0), u32::from_le_bytes(*b"../l"));
        assert_eq!(&inode.inline()[..13], b"../lib/ld.so\0");
    }
}
