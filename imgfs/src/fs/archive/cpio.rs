// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use imgio::prelude::*;

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind},
        errors::*,
    },
    fs::archive::{ARCHIVE_BLOCK, put_octal},
};

pub const CPIO_MAGIC: &[u8; 6] = b"070707";
pub const CPIO_HEADER_SIZE: usize = 76;
pub const CPIO_TRAILER: &[u8] = b"TRAILER!!!";

/// Portable ASCII (odc) header. Fields are fixed-width octal digits.
#[derive(Debug, Clone, Copy, Default)]
struct OdcHeader {
    ino: u64,
    mode: u64,
    nlink: u64,
    mtime: u64,
    name_size: u64,
    file_size: u64,
}

impl OdcHeader {
    fn encode(&self) -> FsInjectorResult<[u8; CPIO_HEADER_SIZE]> {
        let mut raw = [b'0'; CPIO_HEADER_SIZE];
        raw[..6].copy_from_slice(CPIO_MAGIC);
        // dev, uid, gid and rdev stay zero
        put_octal(&mut raw[12..18], self.ino)?;
        put_octal(&mut raw[18..24], self.mode)?;
        put_octal(&mut raw[36..42], self.nlink)?;
        put_octal(&mut raw[48..59], self.mtime)?;
        put_octal(&mut raw[59..65], self.name_size)?;
        put_octal(&mut raw[65..76], self.file_size)?;
        Ok(raw)
    }
}

/// CPIO odc initrd archive.
#[derive(Debug)]
pub struct CpioDriver {
    image: ImageBuf,
    members_len: u64,
    next_ino: u64,
}

impl CpioDriver {
    fn append_member(&mut self, header: OdcHeader, name: &[u8], data: &[u8]) -> FsResult {
        let mut member = Vec::with_capacity(CPIO_HEADER_SIZE + name.len() + 1 + data.len());
        member.extend_from_slice(&header.encode()?);
        member.extend_from_slice(name);
        member.push(0);
        member.extend_from_slice(data);
        self.image.append(&member)?;
        Ok(())
    }
}

impl FsDriver for CpioDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        crate::ensure!(capacity.is_none(), FsFormatterError::InitrdOnly);
        Ok(Self {
            image: ImageBuf::new(),
            members_len: 0,
            next_ino: 1,
        })
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        if !matches!(entry.kind, EntryKind::Regular | EntryKind::Directory | EntryKind::Symlink) {
            tracing::warn!(path = %entry.path, kind = ?entry.kind, "cpio entry kind not stored, skipped");
            return Ok(());
        }
        tracing::trace!(path = %entry.path, size = entry.size(), "cpio add");

        let name = entry.path.as_bytes();
        let header = OdcHeader {
            ino: self.next_ino,
            mode: entry.st_mode() as u64,
            nlink: if entry.is_dir() { 2 } else { 1 },
            mtime: entry.mtime.max(0) as u64,
            name_size: name.len() as u64 + 1,
            file_size: entry.size() as u64,
        };
        self.image.resize(self.members_len)?;
        self.append_member(header, name, &entry.data)?;
        self.members_len = self.image.len();
        self.next_ino += 1;
        Ok(())
    }

    /// Appends the trailer member and pads to a whole block.
    fn close(&mut self) -> FsResult {
        self.image.resize(self.members_len)?;
        let trailer = OdcHeader {
            nlink: 1,
            name_size: CPIO_TRAILER.len() as u64 + 1,
            ..Default::default()
        };
        self.append_member(trailer, CPIO_TRAILER, &[])?;
        self.image.pad_to(ARCHIVE_BLOCK)?;
        tracing::debug!(members = self.next_ino - 1, bytes = self.image.len(), "cpio archive closed");
        Ok(())
    }

    fn image(&self) -> &ImageBuf {
        &self.image
    }

    fn into_image(self) -> ImageBuf {
        self.image
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn field(raw: &[u8], range: core::ops::Range<usize>) -> u64 {
        u64::from_str_radix(std::str::from_utf8(&raw[range]).unwrap(), 8).unwrap()
    }

    /// Splits the archive into `(mode, name, data)` members.
    fn members(raw: &[u8]) -> Vec<(u64, String, Vec<u8>)> {
        let mut out = Vec::new();
        let mut pos = 0;
        loop {
            let hdr = &raw[pos..pos + CPIO_HEADER_SIZE];
            assert_eq!(&hdr[..6], CPIO_MAGIC);
            let (name_size, file_size) = (field(hdr, 59..65) as usize, field(hdr, 65..76) as usize);
            let name_start = pos + CPIO_HEADER_SIZE;
            let name = String::from_utf8(raw[name_start..name_start + name_size - 1].to_vec()).unwrap();
            let data_start = name_start + name_size;
            if name == "TRAILER!!!" {
                return out;
            }
            out.push((field(hdr, 18..24), name, raw[data_start..data_start + file_size].to_vec()));
            pos = data_start + file_size;
        }
    }

    #[test]
    fn test_archive() {
        let mut cpio = CpioDriver::open(None).unwrap();
        cpio.add(&Entry::dir("sbin")).unwrap();
        cpio.add(&Entry::file("sbin/init", vec![0x7F; 300]).with_mode(0o755)).unwrap();
        cpio.add(&Entry::symlink("init", "sbin/init")).unwrap();
        cpio.add(&Entry::device("console", EntryKind::CharDevice, 5, 1)).unwrap();
        cpio.close().unwrap();

        let raw = cpio.image().as_slice();
        assert_eq!(raw.len() % 512, 0);
        let list = members(raw);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].0, 0o040755);
        assert_eq!((list[1].0, list[1].1.as_str(), list[1].2.len()), (0o100755, "sbin/init", 300));
        assert_eq!((list[2].0, list[2].2.as_slice()), (0o120777, b"sbin/init".as_slice()));
    }

    #[test]
    fn test_initrd_only_and_idempotent_close() {
        assert_eq!(
            CpioDriver::open(Some(&Capacity::from_sectors(64, [0; 16]))).unwrap_err().kind(),
            FsErrorKind::Unsupported
        );
        let mut cpio = CpioDriver::open(None).unwrap();
        cpio.add(&Entry::file("a", b"1".to_vec())).unwrap();
        cpio.close().unwrap();
        let first = cpio.image().as_slice().to_vec();
        cpio.close().unwrap();
        assert_eq!(cpio.image().as_slice(), &first[..]);
        assert_eq!(first.len(), 512);
    }
}
