// SPDX-License-Identifier: MIT

//! Filesystem entries handed to the drivers.
//!
//! An [`Entry`] is one object of the source tree: its path relative to the
//! volume root, its kind, its content bytes and the POSIX metadata the
//! richer formats record.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::core::utils::path_utils::{normalize_path, split_parent};

pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;

/// Permission and set-id bits.
pub const MODE_PERM_MASK: u32 = 0o7777;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
}

impl EntryKind {
    /// Decodes the `S_IFMT` part of a POSIX mode.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(EntryKind::Regular),
            S_IFDIR => Some(EntryKind::Directory),
            S_IFLNK => Some(EntryKind::Symlink),
            S_IFCHR => Some(EntryKind::CharDevice),
            S_IFBLK => Some(EntryKind::BlockDevice),
            S_IFIFO => Some(EntryKind::Fifo),
            S_IFSOCK => Some(EntryKind::Socket),
            _ => None,
        }
    }

    /// `S_IFMT` bits for this kind.
    pub fn type_bits(self) -> u32 {
        match self {
            EntryKind::Regular => S_IFREG,
            EntryKind::Directory => S_IFDIR,
            EntryKind::Symlink => S_IFLNK,
            EntryKind::CharDevice => S_IFCHR,
            EntryKind::BlockDevice => S_IFBLK,
            EntryKind::Fifo => S_IFIFO,
            EntryKind::Socket => S_IFSOCK,
        }
    }

    pub fn is_device(self) -> bool {
        matches!(self, EntryKind::CharDevice | EntryKind::BlockDevice)
    }
}

/// One object of the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Slash separated, relative to the volume root, no leading slash.
    pub path: String,
    pub kind: EntryKind,
    /// File content, or the link target for symlinks. Empty otherwise.
    pub data: Vec<u8>,
    /// Permission bits only (`0o7777`).
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: i64,
    /// Device number (glibc `makedev` encoding) for device nodes.
    pub rdev: u64,
}

impl Entry {
    fn new(path: &str, kind: EntryKind, data: Vec<u8>, mode: u32) -> Self {
        Self {
            path: normalize_path(path),
            kind,
            data,
            mode,
            uid: 0,
            gid: 0,
            mtime: 0,
            rdev: 0,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self::new(path, EntryKind::Directory, Vec::new(), 0o755)
    }

    pub fn file(path: &str, data: impl Into<Vec<u8>>) -> Self {
        Self::new(path, EntryKind::Regular, data.into(), 0o644)
    }

    pub fn symlink(path: &str, target: &str) -> Self {
        Self::new(path, EntryKind::Symlink, target.as_bytes().to_vec(), 0o777)
    }

    /// Character or block device node.
    pub fn device(path: &str, kind: EntryKind, major: u32, minor: u32) -> Self {
        let mut entry = Self::new(path, kind, Vec::new(), 0o600);
        entry.rdev = makedev(major, minor);
        entry
    }

    pub fn fifo(path: &str) -> Self {
        Self::new(path, EntryKind::Fifo, Vec::new(), 0o644)
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & MODE_PERM_MASK;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Full POSIX mode: type bits plus permissions.
    #[inline]
    pub fn st_mode(&self) -> u32 {
        self.kind.type_bits() | (self.mode & MODE_PERM_MASK)
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        split_parent(&self.path).1
    }

    /// Everything before the last segment (empty for root children).
    pub fn parent(&self) -> &str {
        split_parent(&self.path).0
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Legacy 16-bit `major << 8 | minor` device encoding.
    pub fn old_rdev(&self) -> u16 {
        let (major, minor) = (dev_major(self.rdev), dev_minor(self.rdev));
        (((major & 0xFF) << 8) | (minor & 0xFF)) as u16
    }
}

/// glibc `makedev`.
pub fn makedev(major: u32, minor: u32) -> u64 {
    let (major, minor) = (major as u64, minor as u64);
    ((major & 0xFFFF_F000) << 32)
        | ((major & 0x0000_0FFF) << 8)
        | ((minor & 0xFFFF_FF00) << 12)
        | (minor & 0x0000_00FF)
}

pub fn dev_major(rdev: u64) -> u32 {
    (((rdev >> 32) & 0xFFFF_F000) | ((rdev >> 8) & 0x0000_0FFF)) as u32
}

pub fn dev_minor(rdev: u64) -> u32 {
    (((rdev >> 12) & 0xFFFF_FF00) | (rdev & 0x0000_00FF)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_parent() {
        let e = Entry::file("/docs/sub/readme.txt", b"hi".to_vec());
        assert_eq!(e.path, "docs/sub/readme.txt");
        assert_eq!(e.name(), "readme.txt");
        assert_eq!(e.parent(), "docs/sub");
        assert_eq!(e.size(), 2);

        let top = Entry::dir("boot/");
        assert_eq!(top.name(), "boot");
        assert_eq!(top.parent(), "");
    }

    #[test]
    fn test_modes() {
        let d = Entry::dir("x");
        assert_eq!(d.st_mode(), 0o040755);
        assert_eq!(EntryKind::from_mode(0o100644), Some(EntryKind::Regular));
        assert_eq!(EntryKind::from_mode(0o020600), Some(EntryKind::CharDevice));
        assert_eq!(EntryKind::from_mode(0), None);
        assert_eq!(Entry::file("f", Vec::new()).with_mode(0o104755).mode, 0o4755);
    }

    #[test]
    fn test_makedev_round_trip() {
        let dev = Entry::device("dev/tty0", EntryKind::CharDevice, 4, 0);
        assert_eq!(dev.rdev, 0x400);
        assert_eq!(dev.old_rdev(), 0x0400);

        let big = makedev(259, 70000);
        assert_eq!(dev_major(big), 259);
        assert_eq!(dev_minor(big), 70000);
    }
}
