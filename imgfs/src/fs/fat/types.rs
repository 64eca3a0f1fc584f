// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fs::fat::{
    attr::FatAttributes,
    constant::*,
    meta::{FatMeta, FatType},
};

/// Common BIOS parameter block (offsets 0x00..0x24).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct BiosParamBlock {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub fat_size_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
}

impl BiosParamBlock {
    pub fn from_meta(meta: &FatMeta) -> Self {
        let (jump_boot, root_entry_count, fat_size_16) = match meta.fat_type {
            FatType::Fat16 => (
                FAT16_JUMP_BOOT,
                FAT16_ROOT_ENTRY_COUNT,
                meta.sectors_per_fat as u16,
            ),
            FatType::Fat32 => (FAT32_JUMP_BOOT, 0, 0),
        };
        // Exactly one of the two total-sector fields is set
        let (total_sectors_16, total_sectors_32) = match u16::try_from(meta.total_sectors) {
            Ok(small) if meta.fat_type == FatType::Fat16 => (small, 0),
            _ => (0, meta.total_sectors),
        };
        Self {
            jump_boot,
            oem_name: *FAT_OEM_NAME,
            bytes_per_sector: FAT_SECTOR_SIZE,
            sectors_per_cluster: FAT_SECTORS_PER_CLUSTER,
            reserved_sectors: meta.reserved_sectors,
            num_fats: FAT_NUM_FATS,
            root_entry_count,
            total_sectors_16,
            media: FAT_MEDIA_DESCRIPTOR,
            fat_size_16,
            sectors_per_track: FAT_SECTORS_PER_TRACK,
            num_heads: FAT_HEADS,
            hidden_sectors: meta.hidden_sectors,
            total_sectors_32,
        }
    }
}

/// FAT12/16 extended boot record (offsets 0x24..0x3E).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat16Ebpb {
    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl Fat16Ebpb {
    pub fn from_meta(meta: &FatMeta) -> Self {
        Self {
            drive_number: FAT_DRIVE_NUMBER,
            reserved1: 0,
            boot_signature: FAT_BOOT_SIGNATURE,
            volume_id: meta.volume_id,
            volume_label: *FAT_VOLUME_LABEL,
            fs_type: *FAT16_FS_TYPE,
        }
    }
}

/// FAT32 extended boot record (offsets 0x24..0x5A).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32Ebpb {
    pub fat_size_32: u32,
    pub ext_flags: u16,
    pub fs_version: u16,
    pub root_cluster: u32,
    pub fsinfo_sector: u16,
    pub backup_boot_sector: u16,
    pub reserved: [u8; 12],
    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl Fat32Ebpb {
    pub fn from_meta(meta: &FatMeta) -> Self {
        Self {
            fat_size_32: meta.sectors_per_fat,
            ext_flags: 0,
            fs_version: 0,
            root_cluster: FAT32_ROOT_CLUSTER,
            fsinfo_sector: FAT_FSINFO_SECTOR,
            backup_boot_sector: FAT_VBR_BACKUP_SECTOR,
            reserved: [0u8; 12],
            drive_number: FAT_DRIVE_NUMBER,
            reserved1: 0,
            boot_signature: FAT_BOOT_SIGNATURE,
            volume_id: meta.volume_id,
            volume_label: *FAT_VOLUME_LABEL,
            fs_type: *FAT32_FS_TYPE,
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FatFsInfo {
    pub lead_signature: [u8; 4],
    pub reserved1: [u8; 480],
    pub struct_signature: [u8; 4],
    pub free_cluster_count: u32,
    pub next_free_cluster: u32,
    pub reserved2: [u8; 12],
    pub trail_signature: [u8; 4],
}

impl FatFsInfo {
    pub fn new(free_cluster_count: u32, next_free_cluster: u32) -> Self {
        Self {
            lead_signature: *FAT_FSINFO_LEAD_SIGNATURE,
            reserved1: [0u8; 480],
            struct_signature: *FAT_FSINFO_STRUCT_SIGNATURE,
            free_cluster_count,
            next_free_cluster,
            reserved2: [0u8; 12],
            trail_signature: FAT_FSINFO_TRAIL_SIGNATURE,
        }
    }
}

/// Short (8.3) directory record.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FatDirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub access_date: u16,
    pub first_cluster_high: u16,
    pub write_time: u16,
    pub write_date: u16,
    pub first_cluster_low: u16,
    pub file_size: u32,
}

impl FatDirEntry {
    pub fn new(
        name: [u8; 11],
        attr: FatAttributes,
        cluster: u32,
        size: u32,
        (time, date): (u16, u16),
    ) -> Self {
        Self {
            name,
            attr: attr.bits(),
            nt_reserved: 0,
            creation_time_tenth: 0,
            creation_time: time,
            creation_date: date,
            access_date: date,
            first_cluster_high: (cluster >> 16) as u16,
            write_time: time,
            write_date: date,
            first_cluster_low: (cluster & 0xFFFF) as u16,
            file_size: size,
        }
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.first_cluster_high as u32) << 16) | (self.first_cluster_low as u32)
    }

    pub fn is_dir(&self) -> bool {
        self.attr & FatAttributes::DIRECTORY.bits() != 0
    }

    #[inline(always)]
    pub fn to_raw_buffer(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

/// Long file name record, 13 UTF-16 units.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FatLfnEntry {
    pub order: u8,
    pub name1: [u16; 5],
    pub attr: u8,
    pub type_field: u8,
    pub checksum: u8,
    pub name2: [u16; 6],
    pub zero: u16,
    pub name3: [u16; 2],
}

impl FatLfnEntry {
    /// `chunk` holds at most 13 units; the rest is padded with one NUL and
    /// then `0xFFFF`.
    pub fn new(order: u8, is_last: bool, chunk: &[u16], checksum: u8) -> Self {
        let mut units = [0xFFFFu16; FAT_LFN_CHARS];
        for (i, slot) in units.iter_mut().enumerate() {
            match i.cmp(&chunk.len()) {
                core::cmp::Ordering::Less => *slot = chunk[i],
                core::cmp::Ordering::Equal => *slot = 0,
                core::cmp::Ordering::Greater => break,
            }
        }

        let mut name1 = [0u16; 5];
        let mut name2 = [0u16; 6];
        let mut name3 = [0u16; 2];
        name1.copy_from_slice(&units[0..5]);
        name2.copy_from_slice(&units[5..11]);
        name3.copy_from_slice(&units[11..13]);

        Self {
            order: if is_last { order | FAT_LFN_LAST } else { order },
            name1,
            attr: FatAttributes::LFN.bits(),
            type_field: 0,
            checksum,
            name2,
            zero: 0,
            name3,
        }
    }

    pub fn units(&self) -> [u16; FAT_LFN_CHARS] {
        let mut out = [0u16; FAT_LFN_CHARS];
        let (name1, name2, name3) = (self.name1, self.name2, self.name3);
        out[0..5].copy_from_slice(&name1);
        out[5..11].copy_from_slice(&name2);
        out[11..13].copy_from_slice(&name3);
        out
    }

    #[inline(always)]
    pub fn to_raw_buffer(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(core::mem::size_of::<BiosParamBlock>(), 0x24);
        assert_eq!(core::mem::size_of::<Fat16Ebpb>(), 0x3E - 0x24);
        assert_eq!(core::mem::size_of::<Fat32Ebpb>(), 0x5A - 0x24);
        assert_eq!(core::mem::size_of::<FatFsInfo>(), 512);
        assert_eq!(core::mem::size_of::<FatDirEntry>(), 32);
        assert_eq!(core::mem::size_of::<FatLfnEntry>(), 32);
    }

    #[test]
    fn test_lfn_padding() {
        let name: Vec<u16> = "hello".encode_utf16().collect();
        let lfn = FatLfnEntry::new(1, true, &name, 0xAB);
        let raw = lfn.as_bytes();
        assert_eq!(raw[0], 0x41);
        assert_eq!(raw[11], 0x0F);
        assert_eq!(raw[13], 0xAB);

        let units = lfn.units();
        assert_eq!(units[4], 'o' as u16);
        assert_eq!(units[5], 0);
        assert_eq!(units[6], 0xFFFF);
    }

    #[test]
    fn test_dir_entry_cluster_split() {
        let e = FatDirEntry::new(*FAT_DOT_NAME, FatAttributes::DIRECTORY, 0x0012_3456, 0, (0, 0));
        let (high, low) = (e.first_cluster_high, e.first_cluster_low);
        assert_eq!((high, low), (0x0012, 0x3456));
        assert_eq!(e.first_cluster(), 0x0012_3456);
        assert!(e.is_dir());
    }
}
