// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use imgio::prelude::*;

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind, S_IFDIR, dev_major, dev_minor},
        errors::*,
        utils::{bitmap::BitmapOps, path_utils::split_path, time_utils::now_unix},
    },
    fs::minix::{constant::*, meta::MinixMeta, types::*},
};

#[inline]
fn clamp_time(t: i64) -> u32 {
    t.clamp(0, u32::MAX as i64) as u32
}

/// Minix V3 volume with 4 KiB blocks and one block per zone.
#[derive(Debug)]
pub struct MinixDriver {
    image: ImageBuf,
    meta: MinixMeta,
    next_zone: u32,
    next_inode: u32,
}

impl MinixDriver {
    pub fn meta(&self) -> &MinixMeta {
        &self.meta
    }

    fn format(&mut self) -> FsInjectorResult {
        let meta = self.meta;
        let sb = MinixSuperBlock {
            s_ninodes: meta.inodes,
            s_imap_blocks: meta.imap_blocks as u16,
            s_zmap_blocks: meta.zmap_blocks as u16,
            s_firstdatazone_old: u16::try_from(meta.first_data_zone())
                .map_err(|_| FsInjectorError::Invalid("Minix first data zone past 16 bits"))?,
            s_max_size: MINIX_MAX_SIZE as u32,
            s_zones: meta.blocks,
            s_magic: MINIX_SUPER_MAGIC_V3,
            s_block_size: MINIX_BLOCK_SIZE as u16,
            ..Default::default()
        };
        self.image.write_struct(MINIX_SUPERBLOCK_OFFSET, &sb)?;

        // Bit 0 of both maps is reserved, bits past the volume read as used
        let imap_bits = (meta.imap_blocks * MINIX_BITS_PER_BLOCK) as usize;
        let imap = self.map_mut(MINIX_IMAP_BLOCK, meta.imap_blocks)?;
        imap.set_bit(0, true);
        imap.set_range(meta.inodes as usize + 1, imap_bits);

        let zmap_bits = (meta.zmap_blocks * MINIX_BITS_PER_BLOCK) as usize;
        let zmap = self.map_mut(meta.zmap_block(), meta.zmap_blocks)?;
        zmap.set_bit(0, true);
        zmap.set_range(meta.data_zones() as usize + 1, zmap_bits);

        self.next_zone = meta.first_data_zone();
        self.next_inode = MINIX_ROOT_INO;

        let now = clamp_time(now_unix());
        let root = self.alloc_inode()?;
        let inode = MinixInode::new(S_IFDIR | 0o755, 0, 0, now);
        self.write_inode(root, &inode)?;
        self.init_dir(root, root)?;
        Ok(())
    }

    fn map_mut(&mut self, first: u32, blocks: u32) -> ImgIOResult<&mut [u8]> {
        let off = self.meta.block_offset(first);
        self.image
            .bytes_mut(off, (blocks as u64 * MINIX_BLOCK_SIZE) as usize)
    }

    // === Allocation ===

    fn alloc_inode(&mut self) -> FsInjectorResult<u32> {
        let ino = self.next_inode;
        if ino > self.meta.inodes {
            return Err(FsAllocatorError::OutOfInodes.into());
        }
        self.next_inode += 1;
        self.map_mut(MINIX_IMAP_BLOCK, self.meta.imap_blocks)?
            .set_bit(ino as usize, true);
        Ok(ino)
    }

    fn alloc_zone(&mut self) -> FsInjectorResult<u32> {
        let zone = self.next_zone;
        if zone >= self.meta.blocks {
            return Err(FsAllocatorError::OutOfBlocks.into());
        }
        self.next_zone += 1;
        let bit = (zone - self.meta.zoff()) as usize;
        self.map_mut(self.meta.zmap_block(), self.meta.zmap_blocks)?
            .set_bit(bit, true);
        Ok(zone)
    }

    // === Inodes and zone maps ===

    fn read_inode(&self, ino: u32) -> ImgIOResult<MinixInode> {
        self.image.read_struct(self.meta.inode_offset(ino))
    }

    fn write_inode(&mut self, ino: u32, inode: &MinixInode) -> ImgIOResult {
        self.image.write_struct(self.meta.inode_offset(ino), inode)
    }

    fn indirect_slot(&mut self, inode: &mut MinixInode, slot: usize) -> FsInjectorResult<u32> {
        match inode.zone(slot) {
            0 => {
                let zone = self.alloc_zone()?;
                inode.set_zone(slot, zone);
                Ok(zone)
            }
            zone => Ok(zone),
        }
    }

    fn indirect_entry(&mut self, table: u32, index: u32) -> FsInjectorResult<u32> {
        let off = self.meta.block_offset(table) + index as u64 * 4;
        match self.image.read_u32_at(off)? {
            0 => {
                let zone = self.alloc_zone()?;
                self.image.write_u32_at(off, zone)?;
                Ok(zone)
            }
            zone => Ok(zone),
        }
    }

    /// Maps logical zone `index` of `inode` to `zone`.
    fn map_zone(&mut self, inode: &mut MinixInode, index: u32, zone: u32) -> FsInjectorResult {
        const IND: u32 = MINIX_INDIRECTS;
        if index < MINIX_NR_DZONES {
            inode.set_zone(index as usize, zone);
        } else if index < MINIX_NR_DZONES + IND {
            let ind = self.indirect_slot(inode, MINIX_IND_ZONE)?;
            let off = self.meta.block_offset(ind) + (index - MINIX_NR_DZONES) as u64 * 4;
            self.image.write_u32_at(off, zone)?;
        } else if (index as u64) < MINIX_MAX_FILE_ZONES {
            let rel = index - MINIX_NR_DZONES - IND;
            let dind = self.indirect_slot(inode, MINIX_DIND_ZONE)?;
            let ind = self.indirect_entry(dind, rel / IND)?;
            let off = self.meta.block_offset(ind) + (rel % IND) as u64 * 4;
            self.image.write_u32_at(off, zone)?;
        } else {
            return Err(FsInjectorError::TooBig);
        }
        Ok(())
    }

    fn lookup_zone(&self, inode: &MinixInode, index: u32) -> ImgIOResult<u32> {
        const IND: u32 = MINIX_INDIRECTS;
        if index < MINIX_NR_DZONES {
            return Ok(inode.zone(index as usize));
        }
        let read = |table: u32, i: u32| -> ImgIOResult<u32> {
            if table == 0 {
                return Ok(0);
            }
            self.image
                .read_u32_at(self.meta.block_offset(table) + i as u64 * 4)
        };
        if index < MINIX_NR_DZONES + IND {
            return read(inode.zone(MINIX_IND_ZONE), index - MINIX_NR_DZONES);
        }
        let rel = index - MINIX_NR_DZONES - IND;
        let ind = read(inode.zone(MINIX_DIND_ZONE), rel / IND)?;
        read(ind, rel % IND)
    }

    fn write_data(&mut self, inode: &mut MinixInode, data: &[u8]) -> FsInjectorResult {
        for (index, chunk) in data.chunks(MINIX_BLOCK_SIZE as usize).enumerate() {
            let zone = self.alloc_zone()?;
            self.image.write_at(self.meta.block_offset(zone), chunk)?;
            self.map_zone(inode, index as u32, zone)?;
        }
        inode.i_size = data.len() as u32;
        Ok(())
    }

    // === Directories ===

    /// Appends a record at the end of `dir`, growing it by one zone when the
    /// last one is full.
    fn enter_dir(&mut self, dir: u32, name: &[u8], ino: u32) -> FsInjectorResult {
        let mut inode = self.read_inode(dir)?;
        let pos = inode.i_size as u64;
        let index = (pos / MINIX_BLOCK_SIZE) as u32;
        let zone = match self.lookup_zone(&inode, index)? {
            0 => {
                let zone = self.alloc_zone()?;
                self.map_zone(&mut inode, index, zone)?;
                zone
            }
            zone => zone,
        };
        let off = self.meta.block_offset(zone) + pos % MINIX_BLOCK_SIZE;
        self.image.write_struct(off, &MinixDirEntry::new(ino, name))?;
        inode.i_size += MINIX_DIRENT_SIZE as u32;
        self.write_inode(dir, &inode)?;
        Ok(())
    }

    fn init_dir(&mut self, dir: u32, parent: u32) -> FsInjectorResult {
        self.enter_dir(dir, b".", dir)?;
        self.enter_dir(dir, b"..", parent)?;

        let mut inode = self.read_inode(dir)?;
        inode.i_nlinks = 2;
        self.write_inode(dir, &inode)?;
        if parent != dir {
            let mut up = self.read_inode(parent)?;
            up.i_nlinks += 1;
            self.write_inode(parent, &up)?;
        }
        Ok(())
    }

    fn list_dir(&self, dir: u32) -> FsInjectorResult<Vec<(Vec<u8>, u32)>> {
        let inode = self.read_inode(dir)?;
        let count = inode.i_size as u64 / MINIX_DIRENT_SIZE;
        let per_zone = MINIX_BLOCK_SIZE / MINIX_DIRENT_SIZE;
        let mut out = Vec::with_capacity(count as usize);
        let mut zone = 0;
        for slot in 0..count {
            if slot % per_zone == 0 {
                zone = self.lookup_zone(&inode, (slot / per_zone) as u32)?;
            }
            let off = self.meta.block_offset(zone) + (slot % per_zone) * MINIX_DIRENT_SIZE;
            let record: MinixDirEntry = self.image.read_struct(off)?;
            if record.d_ino != 0 {
                out.push((record.name().to_vec(), record.d_ino));
            }
        }
        Ok(out)
    }

    fn is_dir(&self, ino: u32) -> ImgIOResult<bool> {
        let mode = self.read_inode(ino)?.i_mode as u32;
        Ok(EntryKind::from_mode(mode) == Some(EntryKind::Directory))
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<u32> {
        let mut dir = MINIX_ROOT_INO;
        for segment in split_path(path) {
            let (_, ino) = self
                .list_dir(dir)?
                .into_iter()
                .find(|(name, _)| name == segment.as_bytes())
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(self.is_dir(ino)?, FsInjectorError::NotADirectory);
            dir = ino;
        }
        Ok(dir)
    }
}

impl FsDriver for MinixDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let capacity = capacity.ok_or(FsFormatterError::PartitionOnly)?;
        let meta = MinixMeta::new(capacity)?;
        let image = ImageBuf::zeroed(meta.blocks as u64 * MINIX_BLOCK_SIZE)
            .map_err(FsFormatterError::from)?;

        let mut driver = Self {
            image,
            meta,
            next_zone: 0,
            next_inode: 0,
        };
        driver.format()?;

        tracing::debug!(
            blocks = meta.blocks,
            inodes = meta.inodes,
            first_data_zone = meta.first_data_zone(),
            "minix volume formatted"
        );
        Ok(driver)
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        if matches!(entry.kind, EntryKind::Fifo | EntryKind::Socket) {
            tracing::warn!(path = %entry.path, kind = ?entry.kind, "minix entry kind not stored, skipped");
            return Ok(());
        }
        let name = entry.name().as_bytes();
        if name.is_empty() {
            return Ok(());
        }
        crate::ensure!(name.len() <= MINIX_DIRSIZ, FsInjectorError::NameTooLong);
        tracing::trace!(path = %entry.path, size = entry.size(), "minix add");

        let parent = self.resolve_dir(entry.parent())?;
        if let Some((_, existing)) = self.list_dir(parent)?.into_iter().find(|(n, _)| n == name) {
            if entry.is_dir() && self.is_dir(existing)? {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }
        match entry.kind {
            EntryKind::Regular => {
                let size = entry.size() as u64;
                crate::ensure!(
                    size <= MINIX_MAX_SIZE && size.div_ceil(MINIX_BLOCK_SIZE) <= MINIX_MAX_FILE_ZONES,
                    FsInjectorError::TooBig
                );
            }
            EntryKind::Symlink => crate::ensure!(
                (entry.size() as u64) < MINIX_BLOCK_SIZE,
                FsInjectorError::TooBig
            ),
            _ => {}
        }

        let ino = self.alloc_inode()?;
        let mut inode = MinixInode::new(entry.st_mode(), entry.uid, entry.gid, clamp_time(entry.mtime));
        match entry.kind {
            EntryKind::Regular | EntryKind::Symlink => self.write_data(&mut inode, &entry.data)?,
            EntryKind::CharDevice | EntryKind::BlockDevice => {
                let dev = (dev_major(entry.rdev) << 8) | (dev_minor(entry.rdev) & 0xFF);
                inode.set_zone(0, dev);
            }
            _ => {}
        }
        self.write_inode(ino, &inode)?;
        self.enter_dir(parent, name, ino)?;
        if entry.is_dir() {
            self.init_dir(ino, parent)?;
        }
        Ok(())
    }

    /// Minix keeps no free counters; the bitmaps are already final.
    fn close(&mut self) -> FsResult {
        tracing::debug!(
            zones_used = self.next_zone - self.meta.first_data_zone(),
            inodes_used = self.next_inode - 1,
            "minix volume closed"
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
