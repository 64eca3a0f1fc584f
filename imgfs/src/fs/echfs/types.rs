// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::echfs::constant::*;

/// Identity table in block 0.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct EchSuperBlock {
    pub jump: [u8; 4],
    pub signature: [u8; 8],
    pub total_blocks: u64,
    pub main_dir_blocks: u64,
    pub block_size: u64,
    pub reserved: [u8; 4],
    pub uuid: [u8; 16],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct EchEntry {
    pub parent_id: u64,
    pub kind: u8,
    pub name: [u8; ECH_NAME_LEN],
    pub atime: u64,
    pub mtime: u64,
    pub perms: u16,
    pub owner: u16,
    pub group: u16,
    pub ctime: u64,
    /// First data block for files, directory id for directories.
    pub payload: u64,
    pub size: u64,
}

impl EchEntry {
    pub fn new(parent_id: u64, kind: u8, name: &[u8]) -> Self {
        let mut raw = [0u8; ECH_NAME_LEN];
        raw[..name.len()].copy_from_slice(name);
        Self {
            parent_id,
            kind,
            name: raw,
            atime: 0,
            mtime: 0,
            perms: 0,
            owner: 0,
            group: 0,
            ctime: 0,
            payload: 0,
            size: 0,
        }
    }

    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(ECH_NAME_LEN);
        &self.name[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(core::mem::size_of::<EchSuperBlock>(), 56);
        assert_eq!(core::mem::size_of::<EchEntry>() as u64, ECH_ENTRY_SIZE);
    }

    #[test]
    fn test_entry_name() {
        let ent = EchEntry::new(ECH_ROOT_ID, ECH_TYPE_DIR, b"boot");
        assert_eq!(ent.name(), b"boot");
        let parent = ent.parent_id;
        assert_eq!(parent, ECH_ROOT_ID);
    }
}
