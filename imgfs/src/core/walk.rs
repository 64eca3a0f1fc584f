// SPDX-License-Identifier: MIT

//! Host directory walker.
//!
//! Produces [`Entry`] values in the order the drivers expect: depth-first,
//! every directory before its children, siblings sorted by name so images
//! are reproducible.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::core::{
    entry::{Entry, EntryKind, MODE_PERM_MASK},
    utils::path_utils::join_paths,
};

/// Depth-first iterator over a host directory.
///
/// The root itself is not yielded; paths are relative to it.
#[derive(Debug)]
pub struct HostWalker {
    root: PathBuf,
    // (relative path, host path), popped from the end
    pending: Vec<(String, PathBuf)>,
}

impl HostWalker {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut walker = Self {
            root: root.clone(),
            pending: Vec::new(),
        };
        walker.push_children("", &root)?;
        Ok(walker)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn push_children(&mut self, rel: &str, dir: &Path) -> io::Result<()> {
        let mut children = Vec::new();
        for item in fs::read_dir(dir)? {
            let item = item?;
            let name = item.file_name().into_string().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "non UTF-8 file name")
            })?;
            children.push((join_paths(rel, &name), item.path()));
        }
        children.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        self.pending.extend(children);
        Ok(())
    }

    fn load(&mut self, rel: String, host: PathBuf) -> io::Result<Entry> {
        let meta = fs::symlink_metadata(&host)?;
        let ft = meta.file_type();

        let mut entry = if ft.is_dir() {
            self.push_children(&rel, &host)?;
            Entry::dir(&rel)
        } else if ft.is_symlink() {
            let target = fs::read_link(&host)?;
            Entry::symlink(&rel, &target.to_string_lossy())
        } else if ft.is_file() {
            Entry::file(&rel, fs::read(&host)?)
        } else {
            special_entry(&rel, &meta)
        };

        apply_metadata(&mut entry, &meta);
        Ok(entry)
    }
}

impl Iterator for HostWalker {
    type Item = io::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (rel, host) = self.pending.pop()?;
        Some(self.load(rel, host))
    }
}

/// Collects the whole tree under `root`.
pub fn walk_dir(root: impl AsRef<Path>) -> io::Result<Vec<Entry>> {
    HostWalker::new(root)?.collect()
}

#[cfg(unix)]
fn special_entry(rel: &str, meta: &fs::Metadata) -> Entry {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let ft = meta.file_type();
    let mut entry = if ft.is_char_device() {
        Entry::device(rel, EntryKind::CharDevice, 0, 0)
    } else if ft.is_block_device() {
        Entry::device(rel, EntryKind::BlockDevice, 0, 0)
    } else if ft.is_socket() {
        let mut e = Entry::fifo(rel);
        e.kind = EntryKind::Socket;
        e
    } else {
        Entry::fifo(rel)
    };
    entry.rdev = meta.rdev();
    entry
}

#[cfg(not(unix))]
fn special_entry(rel: &str, _meta: &fs::Metadata) -> Entry {
    Entry::fifo(rel)
}

#[cfg(unix)]
fn apply_metadata(entry: &mut Entry, meta: &fs::Metadata) {
    use std::os::unix::fs::MetadataExt;

    entry.mode = meta.mode() & MODE_PERM_MASK;
    entry.uid = meta.uid();
    entry.gid = meta.gid();
    entry.mtime = meta.mtime();
}

#[cfg(not(unix))]
fn apply_metadata(entry: &mut Entry, meta: &fs::Metadata) {
    use std::time::UNIX_EPOCH;

    if meta.permissions().readonly() {
        entry.mode &= !0o222 & MODE_PERM_MASK;
    }
    entry.mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_walk_order_and_content() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("b/inner/deep.bin"), [1u8, 2, 3]).unwrap();
        fs::write(root.join("b/z.txt"), b"zed").unwrap();
        fs::write(root.join("c.txt"), b"").unwrap();

        let entries = walk_dir(root).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            ["a.txt", "b", "b/inner", "b/inner/deep.bin", "b/z.txt", "c.txt"]
        );

        assert_eq!(entries[0].data, b"alpha");
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert_eq!(entries[3].data, [1, 2, 3]);
        assert!(entries[5].data.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("target"), b"x").unwrap();
        std::os::unix::fs::symlink("target", tmp.path().join("link")).unwrap();

        let entries = walk_dir(tmp.path()).unwrap();
        let link = entries.iter().find(|e| e.path == "link").unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert_eq!(link.data, b"target");
    }
}
