// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::fsz::constant::*;

/// Access control entry: a 15-byte owner id followed by access bits.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct FszAccess {
    pub id: [u8; 15],
    pub access: u8,
}

impl FszAccess {
    pub fn root(access: u8) -> Self {
        let mut id = [0u8; 15];
        id[..4].copy_from_slice(b"root");
        Self { id, access }
    }
}

/// First 1024 bytes of sector 0.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FszSuperBlock {
    pub loader: [u8; 512],
    pub magic: [u8; 4],
    pub version_major: u8,
    pub version_minor: u8,
    pub logsec: u8,
    pub enctype: u8,
    pub flags: u32,
    pub maxmounts: u16,
    pub currmounts: u16,
    pub numsec: u64,
    pub numsec_hi: u64,
    pub freesec: u64,
    pub freesec_hi: u64,
    pub rootdirfid: u64,
    pub rootdirfid_hi: u64,
    pub freesecfid: u64,
    pub freesecfid_hi: u64,
    pub badsecfid: u64,
    pub badsecfid_hi: u64,
    pub indexfid: u64,
    pub indexfid_hi: u64,
    pub metafid: u64,
    pub metafid_hi: u64,
    pub journalfid: u64,
    pub journalfid_hi: u64,
    pub journalhead: u64,
    pub journaltail: u64,
    pub journalmax: u64,
    pub encrypt: [u8; 28],
    pub enchash: u32,
    pub createdate: u64,
    pub lastmountdate: u64,
    pub lastumountdate: u64,
    pub lastcheckdate: u64,
    pub uuid: [u8; 16],
    pub reserved: [u8; 256],
    pub magic2: [u8; 4],
    pub checksum: u32,
}

/// Inode header; inline data follows at [`FSZ_INODE_HEADER`].
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FszInode {
    pub magic: [u8; 4],
    pub checksum: u32,
    pub filetype: [u8; 4],
    pub mimetype: [u8; 60],
    pub createdate: u64,
    pub changedate: u64,
    pub accessdate: u64,
    pub numblocks: u64,
    pub numlinks: u64,
    pub metasec: u64,
    pub metasec_hi: u64,
    pub versions: [u8; 320],
    pub sec: u64,
    pub sec_hi: u64,
    pub size: u64,
    pub size_hi: u64,
    pub modifydate: u64,
    pub flags: u64,
    pub owner: FszAccess,
    pub groups: [u8; 512],
}

impl FszInode {
    pub fn set_mimetype(&mut self, mime: &str) {
        let bytes = mime.as_bytes();
        let len = bytes.len().min(FSZ_MIME_LEN);
        let mut field = [0u8; 60];
        field[..len].copy_from_slice(&bytes[..len]);
        self.mimetype = field;
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FszDirEntHeader {
    pub magic: [u8; 4],
    /// CRC of the header from byte 16 plus all entries.
    pub checksum: u32,
    pub display_type: u8,
    pub sorting_order: u8,
    pub reserved0: [u8; 6],
    pub numentries: u64,
    pub numentries_hi: u64,
    pub fid: u64,
    pub fid_hi: u64,
    pub reserved: [u8; 79],
    pub flags: u8,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FszDirEnt {
    pub fid: u64,
    pub fid_hi: u64,
    pub name: [u8; FSZ_DIRENT_NAME],
}

impl FszDirEnt {
    pub fn new(fid: u64, name: &[u8]) -> Self {
        let mut raw = [0u8; FSZ_DIRENT_NAME];
        raw[..name.len()].copy_from_slice(name);
        Self {
            fid,
            fid_hi: 0,
            name: raw,
        }
    }

    /// Name up to the NUL terminator (directories keep their `/`).
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(FSZ_DIRENT_NAME);
        &self.name[..len]
    }
}

/// Sector directory slot; `sec == 0` marks a sparse all-zero sector.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, Default)]
#[repr(C, packed)]
pub struct FszSectorDir {
    pub sec: u64,
    pub sec_hi: u32,
    pub chksum: u32,
}
