// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use imgio::prelude::*;
use zerocopy::FromZeros;

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind, MODE_PERM_MASK},
        errors::*,
        utils::path_utils::split_path,
    },
    fs::echfs::{constant::*, meta::EchMeta, types::*},
};

/// echfs volume. Entries and file data are collected during `add`; the
/// allocation table and final layout are written at `close`.
#[derive(Debug)]
pub struct EchfsDriver {
    image: ImageBuf,
    /// `None` until `close` for an initrd.
    meta: Option<EchMeta>,
    uuid: [u8; 16],
    entries: Vec<EchEntry>,
    /// Data region, each file padded to a whole block.
    data: ImageBuf,
}

impl EchfsDriver {
    /// Entry bound to `name` under directory id `parent`.
    fn lookup(&self, parent: u64, name: &[u8]) -> Option<&EchEntry> {
        self.entries
            .iter()
            .find(|e| { e.parent_id } == parent && e.name() == name)
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<u64> {
        let mut dir = ECH_ROOT_ID;
        for segment in split_path(path) {
            let ent = self
                .lookup(dir, segment.as_bytes())
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(ent.kind == ECH_TYPE_DIR, FsInjectorError::NotADirectory);
            dir = ent.payload;
        }
        Ok(dir)
    }

    fn layout(&self) -> EchMeta {
        self.meta.unwrap_or_else(|| {
            EchMeta::fitted(self.entries.len() as u64, self.data.len())
        })
    }

    /// Lays out the whole volume from the collected entries and data.
    fn write_volume(&mut self, meta: EchMeta) -> FsResult {
        let mut image = ImageBuf::zeroed(meta.offset(meta.blocks)).map_err(FsInjectorError::from)?;

        let mut sb = EchSuperBlock::new_zeroed();
        sb.signature = *ECH_SIGNATURE;
        sb.total_blocks = meta.blocks;
        sb.main_dir_blocks = meta.dir_blocks();
        sb.block_size = ECH_BLOCK_SIZE;
        sb.uuid = self.uuid;
        image.write_struct(0, &sb)?;

        let table = meta.offset(ECH_ALLOC_TABLE_BLOCK);
        for block in 0..meta.data_start() {
            image.write_u64_at(table + block * ECH_ALLOC_ENTRY, ECH_RESERVED_BLOCK)?;
        }

        let dir = meta.offset(meta.dir_start());
        for (i, stored) in self.entries.iter().enumerate() {
            let mut ent = *stored;
            let size = ent.size;
            if ent.kind == ECH_TYPE_FILE {
                ent.payload = match size {
                    0 => ECH_END_OF_CHAIN,
                    size => {
                        let first = meta.data_start() + ent.payload;
                        let count = size.div_ceil(ECH_BLOCK_SIZE);
                        for block in first..first + count {
                            let next = match block + 1 == first + count {
                                true => ECH_END_OF_CHAIN,
                                false => block + 1,
                            };
                            image.write_u64_at(table + block * ECH_ALLOC_ENTRY, next)?;
                        }
                        first
                    }
                };
            }
            image.write_struct(dir + i as u64 * ECH_ENTRY_SIZE, &ent)?;
        }

        image.write_at(meta.offset(meta.data_start()), self.data.as_slice())?;
        self.image = image;
        Ok(())
    }
}

impl FsDriver for EchfsDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let (meta, uuid, data) = match capacity {
            Some(cap) => {
                let meta = EchMeta::new(cap)?;
                let room = meta.offset(meta.blocks - meta.data_start());
                (Some(meta), cap.guid, ImageBuf::with_limit(room))
            }
            None => {
                let mut uuid = [0u8; 16];
                uuid[..ECH_INITRD_UUID.len()].copy_from_slice(ECH_INITRD_UUID);
                (None, uuid, ImageBuf::new())
            }
        };
        tracing::debug!(
            blocks = ?meta.map(|m| m.blocks),
            max_entries = ?meta.map(|m| m.max_entries),
            "echfs volume opened"
        );
        Ok(Self {
            image: ImageBuf::new(),
            meta,
            uuid,
            entries: Vec::new(),
            data,
        })
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        let kind = match entry.kind {
            EntryKind::Regular => ECH_TYPE_FILE,
            EntryKind::Directory => ECH_TYPE_DIR,
            _ => {
                tracing::warn!(path = %entry.path, kind = ?entry.kind, "echfs entry kind not stored, skipped");
                return Ok(());
            }
        };
        let name = entry.name().as_bytes();
        if name.is_empty() {
            return Ok(());
        }
        crate::ensure!(name.len() < ECH_NAME_LEN, FsInjectorError::NameTooLong);

        let parent = self.resolve_dir(entry.parent())?;
        if let Some(existing) = self.lookup(parent, name) {
            if existing.kind == ECH_TYPE_DIR && entry.is_dir() {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }
        if let Some(meta) = self.meta {
            crate::ensure!(
                (self.entries.len() as u64) < meta.max_entries,
                FsInjectorError::TooManyEntries
            );
        }
        tracing::trace!(path = %entry.path, size = entry.size(), "echfs add");

        let mut ent = EchEntry::new(parent, kind, name);
        let time = entry.mtime.max(0) as u64;
        ent.atime = time;
        ent.mtime = time;
        ent.ctime = time;
        ent.perms = (entry.mode & MODE_PERM_MASK) as u16;
        ent.owner = entry.uid as u16;
        ent.group = entry.gid as u16;

        if entry.is_dir() {
            ent.payload = self.entries.len() as u64 + 1;
        } else if !entry.data.is_empty() {
            ent.size = entry.size() as u64;
            ent.payload = self.data.len() / ECH_BLOCK_SIZE;
            self.data.append(&entry.data)?;
            self.data.pad_to(ECH_BLOCK_SIZE)?;
        }
        self.entries.push(ent);
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        let meta = self.layout();
        self.write_volume(meta)?;
        tracing::debug!(
            blocks = meta.blocks,
            entries = self.entries.len(),
            "echfs volume closed"
        );
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

    fn entry_at(img: &ImageBuf, meta: &EchMeta, i: u64) -> EchEntry {
        img.read_struct(meta.offset(meta.dir_start()) + i * ECH_ENTRY_SIZE)
            .unwrap()
    }

    /// Follows the allocation chain from `first` and concatenates `size` bytes.
    fn read_chain(img: &ImageBuf, meta: &EchMeta, first: u64, size: u64) -> Vec<u8> {
        let table = meta.offset(ECH_ALLOC_TABLE_BLOCK);
        let mut out = Vec::new();
        let mut block = first;
        while block != ECH_END_OF_CHAIN {
            out.extend_from_slice(img.bytes(meta.offset(block), ECH_BLOCK_SIZE as usize).unwrap());
            block = img.read_u64_at(table + block * ECH_ALLOC_ENTRY).unwrap();
        }
        out.truncate(size as usize);
        out
    }

    #[test]
    fn test_entry_table_limit() {
        let mut fs = EchfsDriver::open(Some(&Capacity::from_sectors(640, [3; 16]))).unwrap();
        let mut failed = None;
        for i in 0..70 {
            let entry = Entry::file(&format!("f{i:02}"), format!("file {i}").into_bytes());
            if let Err(err) = fs.add(&entry) {
                failed.get_or_insert((i, err));
            }
        }
        assert_eq!(failed, Some((64, FsError::Injector(FsInjectorError::TooManyEntries))));
        fs.close().unwrap();

        let meta = fs.meta.unwrap();
        let img = fs.image();
        assert_eq!(img.len(), 640 * 512);
        for i in 0..64u64 {
            let ent = entry_at(img, &meta, i);
            let (parent, payload, size) = (ent.parent_id, ent.payload, ent.size);
            assert_eq!(parent, ECH_ROOT_ID);
            assert_eq!(ent.name(), format!("f{i:02}").as_bytes());
            assert_eq!(payload, meta.data_start() + i);
            assert_eq!(read_chain(img, &meta, payload, size), format!("file {i}").into_bytes());
        }
    }

    #[test]
    fn test_superblock_and_chains() {
        let mut fs = EchfsDriver::open(Some(&Capacity::from_sectors(2048, [5; 16]))).unwrap();
        fs.add(&Entry::dir("boot")).unwrap();
        fs.add(&Entry::file("boot/kernel", vec![0x90; 1300])).unwrap();
        fs.add(&Entry::file("boot/empty", Vec::new())).unwrap();
        fs.add(&Entry::symlink("link", "boot")).unwrap();
        fs.close().unwrap();

        let img = fs.image();
        let sb: EchSuperBlock = img.read_struct(0).unwrap();
        let (blocks, dir_blocks, block_size) = (sb.total_blocks, sb.main_dir_blocks, sb.block_size);
        assert_eq!(&sb.signature, b"_ECH_FS_");
        assert_eq!((blocks, dir_blocks, block_size), (2048, 102, 512));
        assert_eq!(sb.uuid, [5; 16]);

        let meta = fs.meta.unwrap();
        let boot = entry_at(img, &meta, 0);
        let (kind, payload) = (boot.kind, boot.payload);
        assert_eq!((kind, payload), (ECH_TYPE_DIR, 1));

        let kernel = entry_at(img, &meta, 1);
        let (parent, first, size) = (kernel.parent_id, kernel.payload, kernel.size);
        assert_eq!((parent, first, size), (1, meta.data_start(), 1300));
        assert_eq!(read_chain(img, &meta, first, size), vec![0x90; 1300]);

        let empty = entry_at(img, &meta, 2);
        let payload = empty.payload;
        assert_eq!(payload, ECH_END_OF_CHAIN);

        let reserved = img.read_u64_at(meta.offset(ECH_ALLOC_TABLE_BLOCK)).unwrap();
        assert_eq!(reserved, ECH_RESERVED_BLOCK);
        let free = img
            .read_u64_at(meta.offset(ECH_ALLOC_TABLE_BLOCK) + (first + 3) * ECH_ALLOC_ENTRY)
            .unwrap();
        assert_eq!(free, 0);
    }

    #[test]
    fn test_initrd_fitted() {
        let mut fs = EchfsDriver::open(None).unwrap();
        fs.add(&Entry::dir("etc")).unwrap();
        fs.add(&Entry::file("etc/hosts", b"127.0.0.1 localhost\n".to_vec())).unwrap();
        fs.close().unwrap();

        let img = fs.image();
        let sb: EchSuperBlock = img.read_struct(0).unwrap();
        assert_eq!(&sb.uuid[..6], b"INITRD");
        let meta = EchMeta::fitted(2, 512);
        let blocks = sb.total_blocks;
        assert_eq!(blocks, meta.blocks);
        assert_eq!(img.len(), meta.offset(meta.blocks));

        let hosts = entry_at(img, &meta, 1);
        let (first, size) = (hosts.payload, hosts.size);
        assert_eq!(read_chain(img, &meta, first, size), b"127.0.0.1 localhost\n");
    }

    #[test]
    fn test_rejects() {
        assert_eq!(
            EchfsDriver::open(Some(&Capacity::from_sectors(19, [0; 16]))).unwrap_err().kind(),
            FsErrorKind::BelowMinimum
        );
        let mut fs = EchfsDriver::open(Some(&Capacity::from_sectors(100, [0; 16]))).unwrap();
        assert_eq!(
            fs.add(&Entry::file("big", vec![1; 100 * 512])).unwrap_err().kind(),
            FsErrorKind::OutOfSpace
        );
        fs.add(&Entry::file("a", Vec::new())).unwrap();
        assert_eq!(
            fs.add(&Entry::file("a", Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::AlreadyExists)
        );
        assert_eq!(
            fs.add(&Entry::file("a/b", Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::NotADirectory)
        );
    }

    #[test]
    fn test_close_idempotent() {
        let mut fs = EchfsDriver::open(None).unwrap();
        fs.add(&Entry::file("f", b"data".to_vec())).unwrap();
        fs.close().unwrap();
        let first = fs.image().as_slice().to_vec();
        fs.close().unwrap();
        assert_eq!(fs.image().as_slice(), &first[..]);
    }
}
