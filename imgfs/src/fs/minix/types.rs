// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::minix::constant::*;

/// V3 superblock; the on-disk block holds zeroes after these fields.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct MinixSuperBlock {
    pub s_ninodes: u32,
    pub s_nzones: u16,
    pub s_imap_blocks: u16,
    pub s_zmap_blocks: u16,
    pub s_firstdatazone_old: u16,
    pub s_log_zone_size: u16,
    pub s_flags: u16,
    pub s_max_size: u32,
    pub s_zones: u32,
    pub s_magic: u16,
    pub s_pad2: u16,
    pub s_block_size: u16,
    pub s_disk_version: u8,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct MinixInode {
    pub i_mode: u16,
    pub i_nlinks: u16,
    pub i_uid: u16,
    pub i_gid: u16,
    pub i_size: u32,
    pub i_atime: u32,
    pub i_mtime: u32,
    pub i_ctime: u32,
    pub i_zone: [u32; MINIX_NR_TZONES],
}

impl MinixInode {
    pub fn new(mode: u32, uid: u32, gid: u32, time: u32) -> Self {
        Self {
            i_mode: mode as u16,
            i_nlinks: 1,
            i_uid: uid as u16,
            i_gid: gid as u16,
            i_atime: time,
            i_mtime: time,
            i_ctime: time,
            ..Default::default()
        }
    }

    #[inline]
    pub fn zone(&self, slot: usize) -> u32 {
        let zones = self.i_zone;
        zones[slot]
    }

    #[inline]
    pub fn set_zone(&mut self, slot: usize, value: u32) {
        let mut zones = self.i_zone;
        zones[slot] = value;
        self.i_zone = zones;
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct MinixDirEntry {
    pub d_ino: u32,
    pub d_name: [u8; MINIX_DIRSIZ],
}

impl MinixDirEntry {
    /// `name` must already be checked against [`MINIX_DIRSIZ`].
    pub fn new(ino: u32, name: &[u8]) -> Self {
        let mut d_name = [0u8; MINIX_DIRSIZ];
        d_name[..name.len()].copy_from_slice(name);
        Self { d_ino: ino, d_name }
    }

    /// Name bytes up to the first NUL.
    pub fn name(&self) -> &[u8] {
        let len = self
            .d_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MINIX_DIRSIZ);
        &self.d_name[..len]
    }
}
