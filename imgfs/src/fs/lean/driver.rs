// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use imgio::prelude::*;
use zerocopy::{FromBytes, FromZeros, IntoBytes};

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind},
        errors::*,
        utils::{
            bitmap::BitmapOps,
            checksum_utils::lean_checksum,
            path_utils::split_path,
            time_utils::{now_unix, unix_to_micros},
        },
    },
    fs::lean::{constant::*, meta::LeanMeta, types::*},
};

/// LeanFS 0.7 volume. Inodes are addressed by their sector number.
#[derive(Debug)]
pub struct LeanDriver {
    image: ImageBuf,
    meta: LeanMeta,
    next_sector: u64,
    root: u64,
}

impl LeanDriver {
    pub fn meta(&self) -> &LeanMeta {
        &self.meta
    }

    /// Sector of the root directory inode.
    pub fn root(&self) -> u64 {
        self.root
    }

    fn format(&mut self) -> FsInjectorResult {
        let meta = self.meta;
        for band in 0..meta.bands {
            let first = meta.bitmap_sector(band);
            let bitmap = self.bitmap_mut(band)?;
            // Band 0 reserves everything up to and including its bitmap
            let reserved = match band {
                0 => first + LEAN_BITMAP_SECTORS,
                _ => LEAN_BITMAP_SECTORS,
            };
            bitmap.set_range(0, reserved as usize);
        }
        self.bitmap_mut(0)?
            .set_bit(meta.backup_super as usize, true);
        self.next_sector = LEAN_BITMAP_START + LEAN_BITMAP_SECTORS;

        let now = unix_to_micros(now_unix());
        self.root = self.alloc_inode(0o755, LEAN_FT_DIR, 0, 0, now)?;
        self.init_dir(self.root, self.root)?;
        self.write_superblock(0)?;
        Ok(())
    }

    fn bitmap_mut(&mut self, band: u64) -> ImgIOResult<&mut [u8]> {
        let off = self.meta.offset(self.meta.bitmap_sector(band));
        self.image
            .bytes_mut(off, (LEAN_BITMAP_SECTORS * LEAN_SECTOR_SIZE) as usize)
    }

    fn write_superblock(&mut self, free: u64) -> ImgIOResult {
        let meta = self.meta;
        let mut sb = LeanSuperBlock::new_zeroed();
        sb.magic = LEAN_SUPER_MAGIC;
        sb.fs_version = LEAN_SUPER_VERSION;
        sb.pre_alloc_count = LEAN_PREALLOC;
        sb.log_sectors_per_band = LEAN_LOG_BANDSIZE;
        sb.state = LEAN_STATE_CLEAN;
        sb.uuid = meta.uuid;
        sb.volume_label[..LEAN_LABEL.len()].copy_from_slice(LEAN_LABEL);
        sb.sector_count = meta.sectors;
        sb.free_sector_count = free;
        sb.primary_super = LEAN_PRIMARY_SUPER;
        sb.backup_super = meta.backup_super;
        sb.bitmap_start = LEAN_BITMAP_START;
        sb.root_inode = self.root;
        sb.log_block_size = LEAN_LOG_BLOCK_SIZE;
        sb.checksum = lean_checksum(sb.as_bytes());
        self.image.write_struct(meta.offset(LEAN_PRIMARY_SUPER), &sb)
    }

    // === Allocation ===

    /// Next clear bit scanning forward band by band.
    fn alloc_sector(&mut self) -> FsInjectorResult<u64> {
        let mut sector = self.next_sector;
        while sector < self.meta.sectors {
            let band = sector / LEAN_BAND_SECTORS;
            let start = (sector % LEAN_BAND_SECTORS) as usize;
            let end = self.meta.band_sectors(band) as usize;
            let bitmap = self.bitmap_mut(band)?;
            if let Some(bit) = bitmap.first_clear(start, end) {
                bitmap.set_bit(bit, true);
                let found = band * LEAN_BAND_SECTORS + bit as u64;
                self.next_sector = found + 1;
                return Ok(found);
            }
            sector = (band + 1) * LEAN_BAND_SECTORS;
        }
        Err(FsAllocatorError::OutOfBlocks.into())
    }

    fn alloc_inode(&mut self, mode: u32, file_type: u8, uid: u32, gid: u32, micros: u64) -> FsInjectorResult<u64> {
        let sector = self.alloc_sector()?;
        let mut inode = LeanInode::new(sector, mode, file_type, micros);
        inode.uid = uid;
        inode.gid = gid;
        if file_type == LEAN_FT_DIR {
            for _ in 0..LEAN_PREALLOC {
                let next = self.alloc_sector()?;
                Self::append_sector(&mut inode, next, FsInjectorError::TooManyEntries)?;
            }
        }
        self.write_inode(sector, &mut inode)?;
        Ok(sector)
    }

    /// Extends the last extent when `sector` follows it, opens a new one
    /// otherwise.
    fn append_sector(inode: &mut LeanInode, sector: u64, overflow: FsInjectorError) -> FsInjectorResult {
        let (mut starts, mut sizes) = (inode.extent_start, inode.extent_size);
        let count = inode.extent_count as usize;
        if count > 0 && starts[count - 1] + sizes[count - 1] as u64 == sector {
            sizes[count - 1] += 1;
        } else {
            crate::ensure!(count < LEAN_INODE_EXTENT_CNT, overflow);
            starts[count] = sector;
            sizes[count] = 1;
            inode.extent_count += 1;
        }
        inode.extent_start = starts;
        inode.extent_size = sizes;
        inode.sector_count += 1;
        Ok(())
    }

    // === Inodes ===

    fn read_inode(&self, sector: u64) -> FsInjectorResult<LeanInode> {
        let bytes = self.image.bytes(self.meta.offset(sector), LEAN_INODE_SIZE)?;
        let inode = LeanInode::read_from_bytes(bytes)
            .map_err(|_| FsInjectorError::Invalid("Short LeanFS inode"))?;
        let magic = inode.magic;
        crate::ensure!(magic == LEAN_INODE_MAGIC, FsInjectorError::Invalid("Bad LeanFS inode magic"));
        Ok(inode)
    }

    /// Stores `inode` with a fresh checksum.
    fn write_inode(&mut self, sector: u64, inode: &mut LeanInode) -> ImgIOResult {
        inode.checksum = lean_checksum(inode.as_bytes());
        self.image.write_struct(self.meta.offset(sector), inode)
    }

    /// Writes `data` at content offset `pos`, which starts in the sector
    /// after the inode. Directory data moves in 16-byte units, which never
    /// straddle a sector.
    fn write_stream(&mut self, inode: &LeanInode, pos: u64, data: &[u8]) -> FsInjectorResult {
        for (i, chunk) in data.chunks(LEAN_DIRENT_UNIT as usize).enumerate() {
            let at = pos + i as u64 * LEAN_DIRENT_UNIT;
            let sector = inode
                .sector_at(1 + at / LEAN_SECTOR_SIZE)
                .ok_or(FsInjectorError::Invalid("LeanFS offset past the last extent"))?;
            self.image
                .write_at(self.meta.offset(sector) + at % LEAN_SECTOR_SIZE, chunk)?;
        }
        Ok(())
    }

    fn read_stream(&self, inode: &LeanInode, len: u64) -> FsInjectorResult<Vec<u8>> {
        let mut out = Vec::with_capacity(len as usize);
        let mut pos = 0u64;
        while pos < len {
            let take = (LEAN_SECTOR_SIZE - pos % LEAN_SECTOR_SIZE).min(len - pos);
            let sector = inode
                .sector_at(1 + pos / LEAN_SECTOR_SIZE)
                .ok_or(FsInjectorError::Invalid("LeanFS offset past the last extent"))?;
            out.extend_from_slice(
                self.image
                    .bytes(self.meta.offset(sector) + pos % LEAN_SECTOR_SIZE, take as usize)?,
            );
            pos += take;
        }
        Ok(out)
    }

    // === Directories ===

    /// Appends a record for `target` to `dir` and bumps the target's link
    /// count.
    fn enter_dir(&mut self, dir: u64, name: &[u8], target: u64, file_type: u8) -> FsInjectorResult {
        let mut inode = self.read_inode(dir)?;
        let rec_len = record_len(name.len());
        while inode.file_size + rec_len > (inode.sector_count - 1) * LEAN_SECTOR_SIZE {
            let sector = self.alloc_sector()?;
            Self::append_sector(&mut inode, sector, FsInjectorError::TooManyEntries)?;
        }

        let header = LeanDirEntryHeader {
            inode: target,
            file_type,
            rec_len: (rec_len / LEAN_DIRENT_UNIT) as u8,
            name_len: name.len() as u16,
        };
        let mut record = Vec::with_capacity(rec_len as usize);
        record.extend_from_slice(header.as_bytes());
        record.extend_from_slice(name);
        record.resize(rec_len as usize, 0);
        self.write_stream(&inode, inode.file_size, &record)?;
        inode.file_size += rec_len;

        if target == dir {
            inode.links_count += 1;
        } else {
            let mut child = self.read_inode(target)?;
            child.links_count += 1;
            self.write_inode(target, &mut child)?;
        }
        self.write_inode(dir, &mut inode)?;
        Ok(())
    }

    fn init_dir(&mut self, dir: u64, parent: u64) -> FsInjectorResult {
        self.enter_dir(dir, b".", dir, LEAN_FT_DIR)?;
        self.enter_dir(dir, b"..", parent, LEAN_FT_DIR)
    }

    /// Records of `dir` as `(name, inode sector, type)`.
    fn list_dir(&self, dir: u64) -> FsInjectorResult<Vec<(Vec<u8>, u64, u8)>> {
        let inode = self.read_inode(dir)?;
        let stream = self.read_stream(&inode, inode.file_size)?;
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos + LEAN_DIRENT_HEADER <= stream.len() {
            let header = LeanDirEntryHeader::read_from_bytes(&stream[pos..pos + LEAN_DIRENT_HEADER])
                .map_err(|_| FsInjectorError::Invalid("Short LeanFS record"))?;
            crate::ensure!(header.rec_len != 0, FsInjectorError::Invalid("Corrupt LeanFS directory record"));
            let name_start = pos + LEAN_DIRENT_HEADER;
            let name_end = (name_start + header.name_len as usize).min(stream.len());
            if header.inode != 0 {
                out.push((stream[name_start..name_end].to_vec(), header.inode, header.file_type));
            }
            pos += header.rec_len as usize * LEAN_DIRENT_UNIT as usize;
        }
        Ok(out)
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<u64> {
        let mut dir = self.root;
        for segment in split_path(path) {
            let (_, ino, file_type) = self
                .list_dir(dir)?
                .into_iter()
                .find(|(name, _, _)| name == segment.as_bytes())
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(file_type == LEAN_FT_DIR, FsInjectorError::NotADirectory);
            dir = ino;
        }
        Ok(dir)
    }

    fn free_sectors(&mut self) -> ImgIOResult<u64> {
        let mut used = 0u64;
        for band in 0..self.meta.bands {
            let len = self.meta.band_sectors(band) as usize;
            used += self.bitmap_mut(band)?.count_set(0, len) as u64;
        }
        Ok(self.meta.sectors - used)
    }
}

impl FsDriver for LeanDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let capacity = capacity.ok_or(FsFormatterError::PartitionOnly)?;
        let meta = LeanMeta::new(capacity)?;
        let image = ImageBuf::zeroed(meta.offset(meta.sectors)).map_err(FsFormatterError::from)?;

        let mut driver = Self {
            image,
            meta,
            next_sector: 0,
            root: 0,
        };
        driver.format()?;

        tracing::debug!(
            sectors = meta.sectors,
            bands = meta.bands,
            root = driver.root,
            "leanfs volume formatted"
        );
        Ok(driver)
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        let file_type = match entry.kind {
            EntryKind::Regular => LEAN_FT_REG,
            EntryKind::Directory => LEAN_FT_DIR,
            EntryKind::Symlink => LEAN_FT_LNK,
            _ => {
                tracing::warn!(path = %entry.path, kind = ?entry.kind, "leanfs entry kind not stored, skipped");
                return Ok(());
            }
        };
        let name = entry.name().as_bytes();
        if name.is_empty() {
            return Ok(());
        }
        crate::ensure!(
            record_len(name.len()) <= LEAN_MAX_RECORD_UNITS * LEAN_DIRENT_UNIT,
            FsInjectorError::NameTooLong
        );
        tracing::trace!(path = %entry.path, size = entry.size(), "leanfs add");

        let parent = self.resolve_dir(entry.parent())?;
        if let Some((_, _, existing)) = self.list_dir(parent)?.into_iter().find(|(n, _, _)| n == name) {
            if existing == LEAN_FT_DIR && entry.is_dir() {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }

        let micros = unix_to_micros(entry.mtime);
        let ino = self.alloc_inode(entry.mode, file_type, entry.uid, entry.gid, micros)?;
        self.enter_dir(parent, name, ino, file_type)?;

        if entry.is_dir() {
            self.init_dir(ino, parent)?;
        } else {
            let mut inode = self.read_inode(ino)?;
            for chunk in entry.data.chunks(LEAN_SECTOR_SIZE as usize) {
                let sector = self.alloc_sector()?;
                self.image.write_at(self.meta.offset(sector), chunk)?;
                Self::append_sector(&mut inode, sector, FsInjectorError::TooBig)?;
            }
            inode.file_size = entry.size() as u64;
            self.write_inode(ino, &mut inode)?;
        }
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        let free = self.free_sectors()?;
        self.write_superblock(free)?;
        let primary = self.meta.offset(LEAN_PRIMARY_SUPER);
        let backup = self.meta.offset(self.meta.backup_super);
        self.image
            .copy_within(primary, backup, LEAN_SECTOR_SIZE as usize)?;
        tracing::debug!(free_sectors = free, "leanfs volume closed");
        Ok(())
    }

    fn image(&self) -> &ImageBuf {
        &self.image
    }

    fn into_image(self) -> ImageBuf {
        self.image
    }
}
