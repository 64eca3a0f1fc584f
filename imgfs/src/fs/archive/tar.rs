// SPDX-License-Identifier: MIT

use imgio::prelude::*;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind},
        errors::*,
    },
    fs::archive::{ARCHIVE_BLOCK, put_octal},
};

/// GNU flavoured magic plus version (`"ustar  \0"`).
pub const TAR_MAGIC: &[u8; 8] = b"ustar  \0";
pub const TAR_OWNER: &[u8] = b"root";
pub const TAR_NAME_MAX: usize = 99;
pub const TAR_TYPE_REG: u8 = b'0';
pub const TAR_TYPE_SYMLINK: u8 = b'2';
pub const TAR_TYPE_DIR: u8 = b'5';

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct TarHeader {
    pub name: [u8; 100],
    pub mode: [u8; 8],
    pub uid: [u8; 8],
    pub gid: [u8; 8],
    pub size: [u8; 12],
    pub mtime: [u8; 12],
    pub chksum: [u8; 8],
    pub typeflag: u8,
    pub linkname: [u8; 100],
    pub magic: [u8; 8],
    pub uname: [u8; 32],
    pub gname: [u8; 32],
    pub devmajor: [u8; 8],
    pub devminor: [u8; 8],
    pub prefix: [u8; 155],
    pub pad: [u8; 12],
}

impl TarHeader {
    /// Byte sum of the header with the checksum field read as spaces.
    pub fn checksum(&self) -> u64 {
        let spaces = self.chksum.len() as u64 * b' ' as u64;
        let field: u64 = self.chksum.iter().map(|&b| b as u64).sum();
        let all: u64 = self.as_bytes().iter().map(|&b| b as u64).sum();
        all - field + spaces
    }
}

fn put_str(field: &mut [u8], value: &[u8]) {
    field[..value.len()].copy_from_slice(value);
}

/// USTAR archive, usable as an initrd or as raw partition content.
#[derive(Debug)]
pub struct TarDriver {
    image: ImageBuf,
    /// Length of the member data, before the end-of-archive blocks.
    members_len: u64,
}

impl TarDriver {
    fn header(entry: &Entry) -> FsInjectorResult<TarHeader> {
        let path = entry.path.as_bytes();
        crate::ensure!(path.len() <= TAR_NAME_MAX, FsInjectorError::NameTooLong);

        let mut hdr = TarHeader::new_zeroed();
        let (typeflag, size) = match entry.kind {
            EntryKind::Directory => (TAR_TYPE_DIR, 0),
            EntryKind::Symlink => {
                crate::ensure!(entry.data.len() <= TAR_NAME_MAX, FsInjectorError::NameTooLong);
                put_str(&mut hdr.linkname, &entry.data);
                (TAR_TYPE_SYMLINK, 0)
            }
            _ => (TAR_TYPE_REG, entry.size() as u64),
        };
        put_str(&mut hdr.name, path);
        put_octal(&mut hdr.mode[..7], (entry.st_mode() & 0o77777) as u64)?;
        put_octal(&mut hdr.uid[..7], 0)?;
        put_octal(&mut hdr.gid[..7], 0)?;
        put_octal(&mut hdr.size[..11], size)?;
        put_octal(&mut hdr.mtime[..11], entry.mtime.max(0) as u64)?;
        hdr.typeflag = typeflag;
        hdr.magic = *TAR_MAGIC;
        put_str(&mut hdr.uname, TAR_OWNER);
        put_str(&mut hdr.gname, TAR_OWNER);

        let sum = hdr.checksum();
        put_octal(&mut hdr.chksum[..6], sum)?;
        hdr.chksum[7] = b' ';
        Ok(hdr)
    }
}

impl FsDriver for TarDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let image = match capacity {
            Some(cap) => {
                crate::ensure!(cap.bytes() >= 2 * ARCHIVE_BLOCK, FsFormatterError::BelowMinimum);
                ImageBuf::with_limit(cap.bytes())
            }
            None => ImageBuf::new(),
        };
        Ok(Self {
            image,
            members_len: 0,
        })
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        if !matches!(entry.kind, EntryKind::Regular | EntryKind::Directory | EntryKind::Symlink) {
            tracing::warn!(path = %entry.path, kind = ?entry.kind, "tar entry kind not stored, skipped");
            return Ok(());
        }
        tracing::trace!(path = %entry.path, size = entry.size(), "tar add");

        let hdr = Self::header(entry)?;
        self.image.resize(self.members_len)?;
        self.image.append(hdr.as_bytes())?;
        if entry.kind == EntryKind::Regular {
            self.image.append(&entry.data)?;
            self.image.pad_to(ARCHIVE_BLOCK)?;
        }
        self.members_len = self.image.len();
        Ok(())
    }

    /// Appends the two zero blocks that end the archive.
    fn close(&mut self) -> FsResult {
        self.image.resize(self.members_len + 2 * ARCHIVE_BLOCK)?;
        tracing::debug!(bytes = self.image.len(), "tar archive closed");
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

    fn octal(field: &[u8]) -> u64 {
        let text = std::str::from_utf8(field).unwrap().trim_matches(|c| c == '\0' || c == ' ');
        u64::from_str_radix(text, 8).unwrap()
    }

    #[test]
    fn test_members() {
        let mut tar = TarDriver::open(None).unwrap();
        tar.add(&Entry::dir("etc")).unwrap();
        tar.add(&Entry::file("etc/motd", b"welcome\n".to_vec()).with_mtime(1_000)).unwrap();
        tar.add(&Entry::symlink("motd", "etc/motd")).unwrap();
        tar.add(&Entry::fifo("pipe")).unwrap();
        tar.close().unwrap();

        let img = tar.image();
        assert_eq!(img.len(), 512 * (1 + 2 + 1 + 2));

        let dir: TarHeader = img.read_struct(0).unwrap();
        assert_eq!(dir.typeflag, TAR_TYPE_DIR);
        assert_eq!(&dir.magic, TAR_MAGIC);
        assert_eq!(&dir.uname[..5], b"root\0");
        assert_eq!(octal(&dir.mode), 0o40755);

        let file: TarHeader = img.read_struct(512).unwrap();
        assert_eq!(&file.name[..9], b"etc/motd\0");
        assert_eq!((octal(&file.size), octal(&file.mtime)), (8, 1_000));
        assert_eq!(octal(&file.chksum), file.checksum());
        assert_eq!(img.bytes(1024, 8).unwrap(), b"welcome\n");

        let link: TarHeader = img.read_struct(1536).unwrap();
        assert_eq!(link.typeflag, TAR_TYPE_SYMLINK);
        assert_eq!(&link.linkname[..8], b"etc/motd");
        assert_eq!(octal(&link.size), 0);
        assert!(img.as_slice()[2048..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_limits_and_idempotent_close() {
        let mut tar = TarDriver::open(Some(&Capacity::from_sectors(4, [0; 16]))).unwrap();
        assert_eq!(
            tar.add(&Entry::file(&"n".repeat(100), Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::NameTooLong)
        );
        assert_eq!(
            tar.add(&Entry::file("big", vec![1; 2048])).unwrap_err().kind(),
            FsErrorKind::OutOfSpace
        );
        tar.add(&Entry::file("ok", b"x".to_vec())).unwrap();
        tar.close().unwrap();
        let first = tar.image().as_slice().to_vec();
        tar.close().unwrap();
        assert_eq!(tar.image().as_slice(), &first[..]);
        assert_eq!(first.len(), 2048);
    }
}
