// SPDX-License-Identifier: MIT

//! Format drivers and the format-agnostic front door.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::{fmt, str::FromStr};

use imgio::prelude::ImageBuf;

use crate::core::{
    capacity::{Capacity, SECTOR_SIZE},
    driver::FsDriver,
    entry::Entry,
    errors::*,
};

pub mod archive;
pub mod echfs;
pub mod ext2;
pub mod fat;
pub mod fsz;
pub mod lean;
pub mod minix;

use archive::{CpioDriver, JamesmDriver, TarDriver};
use echfs::EchfsDriver;
use ext2::Ext2Driver;
use fat::FatDriver;
use fsz::FszDriver;
use lean::LeanDriver;
use minix::MinixDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsKind {
    Fat,
    Ext2,
    Minix,
    Lean,
    Fsz,
    Echfs,
    Tar,
    Cpio,
    Jamesm,
}

impl FsKind {
    pub const ALL: [FsKind; 9] = [
        FsKind::Fat,
        FsKind::Ext2,
        FsKind::Minix,
        FsKind::Lean,
        FsKind::Fsz,
        FsKind::Echfs,
        FsKind::Tar,
        FsKind::Cpio,
        FsKind::Jamesm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FsKind::Fat => "fat",
            FsKind::Ext2 => "ext2",
            FsKind::Minix => "minix",
            FsKind::Lean => "lean",
            FsKind::Fsz => "fsz",
            FsKind::Echfs => "ech",
            FsKind::Tar => "tar",
            FsKind::Cpio => "cpio",
            FsKind::Jamesm => "jamesm",
        }
    }

    /// Smallest partition, in 512-byte sectors, `open` accepts.
    pub fn min_sectors(self) -> Option<u64> {
        match self {
            FsKind::Fat => Some(fat::constant::FAT_MIN_SECTORS),
            FsKind::Ext2 => Some(ext2::constant::EXT2_MIN_BLOCKS * ext2::constant::EXT2_BLOCK_SIZE / SECTOR_SIZE),
            FsKind::Minix => Some(minix::constant::MINIX_MIN_BLOCKS * minix::constant::MINIX_BLOCK_SIZE / SECTOR_SIZE),
            FsKind::Lean => Some(lean::constant::LEAN_MIN_SECTORS),
            _ => None,
        }
    }

    pub fn supports_initrd(self) -> bool {
        !matches!(self, FsKind::Fat | FsKind::Ext2 | FsKind::Minix | FsKind::Lean)
    }

    pub fn supports_partition(self) -> bool {
        !matches!(self, FsKind::Cpio | FsKind::Jamesm)
    }
}

impl fmt::Display for FsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FsKind {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "fat" | "fat16" | "fat32" | "vfat" => FsKind::Fat,
            "ext2" => FsKind::Ext2,
            "minix" | "minix3" => FsKind::Minix,
            "lean" | "leanfs" => FsKind::Lean,
            "fsz" | "fs/z" => FsKind::Fsz,
            "ech" | "echfs" => FsKind::Echfs,
            "tar" | "ustar" => FsKind::Tar,
            "cpio" => FsKind::Cpio,
            "jamesm" => FsKind::Jamesm,
            _ => crate::bail!(FsFormatterError::Invalid("Unknown filesystem type")),
        };
        Ok(kind)
    }
}

/// One open driver session of any format.
#[derive(Debug)]
pub enum Driver {
    Fat(FatDriver),
    Ext2(Ext2Driver),
    Minix(MinixDriver),
    Lean(LeanDriver),
    Fsz(FszDriver),
    Echfs(EchfsDriver),
    Tar(TarDriver),
    Cpio(CpioDriver),
    Jamesm(JamesmDriver),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Driver::Fat($d) => $body,
            Driver::Ext2($d) => $body,
            Driver::Minix($d) => $body,
            Driver::Lean($d) => $body,
            Driver::Fsz($d) => $body,
            Driver::Echfs($d) => $body,
            Driver::Tar($d) => $body,
            Driver::Cpio($d) => $body,
            Driver::Jamesm($d) => $body,
        }
    };
}

impl Driver {
    pub fn open(kind: FsKind, capacity: Option<&Capacity>) -> FsResult<Self> {
        Ok(match kind {
            FsKind::Fat => Driver::Fat(FatDriver::open(capacity)?),
            FsKind::Ext2 => Driver::Ext2(Ext2Driver::open(capacity)?),
            FsKind::Minix => Driver::Minix(MinixDriver::open(capacity)?),
            FsKind::Lean => Driver::Lean(LeanDriver::open(capacity)?),
            FsKind::Fsz => Driver::Fsz(FszDriver::open(capacity)?),
            FsKind::Echfs => Driver::Echfs(EchfsDriver::open(capacity)?),
            FsKind::Tar => Driver::Tar(TarDriver::open(capacity)?),
            FsKind::Cpio => Driver::Cpio(CpioDriver::open(capacity)?),
            FsKind::Jamesm => Driver::Jamesm(JamesmDriver::open(capacity)?),
        })
    }

    pub fn kind(&self) -> FsKind {
        match self {
            Driver::Fat(_) => FsKind::Fat,
            Driver::Ext2(_) => FsKind::Ext2,
            Driver::Minix(_) => FsKind::Minix,
            Driver::Lean(_) => FsKind::Lean,
            Driver::Fsz(_) => FsKind::Fsz,
            Driver::Echfs(_) => FsKind::Echfs,
            Driver::Tar(_) => FsKind::Tar,
            Driver::Cpio(_) => FsKind::Cpio,
            Driver::Jamesm(_) => FsKind::Jamesm,
        }
    }

    pub fn add(&mut self, entry: &Entry) -> FsResult {
        dispatch!(self, d => d.add(entry))
    }

    pub fn close(&mut self) -> FsResult {
        dispatch!(self, d => d.close())
    }

    pub fn image(&self) -> &ImageBuf {
        dispatch!(self, d => d.image())
    }

    pub fn into_image(self) -> ImageBuf {
        dispatch!(self, d => d.into_image())
    }
}

/// Runs a whole session: `open`, one `add` per entry, `close`.
///
/// Entries must list parents before their children.
pub fn build_image<'a>(
    kind: FsKind,
    capacity: Option<&Capacity>,
    entries: impl IntoIterator<Item = &'a Entry>,
) -> FsResult<Vec<u8>> {
    let mut driver = Driver::open(kind, capacity)?;
    for entry in entries {
        driver.add(entry)?;
    }
    driver.close()?;
    Ok(driver.into_image().into_vec())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("FAT32".parse::<FsKind>().unwrap(), FsKind::Fat);
        assert_eq!("echfs".parse::<FsKind>().unwrap(), FsKind::Echfs);
        assert!("ntfs".parse::<FsKind>().is_err());
        for kind in FsKind::ALL {
            assert_eq!(kind.to_string().parse::<FsKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_min_sectors() {
        assert_eq!(FsKind::Fat.min_sectors(), Some(4153));
        assert_eq!(FsKind::Ext2.min_sectors(), Some(128));
        assert_eq!(FsKind::Minix.min_sectors(), Some(64));
        assert_eq!(FsKind::Lean.min_sectors(), Some(43));
        assert_eq!(FsKind::Tar.min_sectors(), None);
        for kind in FsKind::ALL {
            if let Some(min) = kind.min_sectors() {
                let cap = Capacity::from_sectors(min, [1; 16]);
                assert!(Driver::open(kind, Some(&cap)).is_ok(), "{kind} at {min}");
                let cap = Capacity::from_sectors(min - 1, [1; 16]);
                assert_eq!(
                    Driver::open(kind, Some(&cap)).unwrap_err().kind(),
                    FsErrorKind::BelowMinimum,
                    "{kind} below {min}"
                );
            }
        }
    }

    #[test]
    fn test_capacity_modes() {
        let cap = Capacity::from_sectors(8192, [2; 16]);
        for kind in FsKind::ALL {
            assert_eq!(Driver::open(kind, None).is_ok(), kind.supports_initrd(), "{kind} initrd");
            assert_eq!(Driver::open(kind, Some(&cap)).is_ok(), kind.supports_partition(), "{kind} partition");
        }
    }

    #[test]
    fn test_build_image() {
        let entries = [Entry::dir("boot"), Entry::file("boot/kernel", vec![0xAA; 5000])];
        for kind in FsKind::ALL {
            let cap = Capacity::from_sectors(8192, [3; 16]);
            let capacity = kind.supports_partition().then_some(&cap);
            let image = build_image(kind, capacity, &entries).unwrap();
            assert!(!image.is_empty(), "{kind}");
            if let Some(cap) = capacity {
                assert!(image.len() as u64 <= cap.bytes(), "{kind}");
            }
        }
    }
}
