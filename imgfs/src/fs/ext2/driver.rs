// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use imgio::prelude::*;
use zerocopy::FromZeros;

use crate::{
    core::{
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind, S_IFDIR, dev_major, dev_minor},
        errors::*,
        utils::{bitmap::BitmapOps, path_utils::split_path, time_utils::now_unix},
    },
    fs::ext2::{constant::*, meta::Ext2Meta, types::*},
};

/// Refuses sizes beyond direct + single + double indirect addressing or the
/// 32-bit `i_size` field.
pub fn check_file_size(size: u64) -> FsInjectorResult {
    let blocks = size.div_ceil(EXT2_BLOCK_SIZE);
    if size > u32::MAX as u64 || blocks > EXT2_MAX_FILE_BLOCKS {
        return Err(FsInjectorError::TooBig);
    }
    Ok(())
}

#[inline]
fn clamp_time(t: i64) -> u32 {
    t.clamp(0, u32::MAX as i64) as u32
}

/// ext2 revision 1 volume with 4 KiB blocks.
#[derive(Debug)]
pub struct Ext2Driver {
    image: ImageBuf,
    meta: Ext2Meta,
    next_block: u32,
    next_inode: u32,
    now: u32,
}

impl Ext2Driver {
    pub fn meta(&self) -> &Ext2Meta {
        &self.meta
    }

    // === Formatting ===

    fn format(&mut self) -> FsInjectorResult {
        let meta = self.meta;

        let mut sb = Ext2SuperBlock::new_zeroed();
        sb.s_inodes_count = meta.inodes_count();
        sb.s_blocks_count = meta.blocks;
        sb.s_r_blocks_count = meta.reserved_blocks();
        sb.s_log_block_size = EXT2_LOG_BLOCK_SIZE;
        sb.s_log_frag_size = EXT2_LOG_BLOCK_SIZE;
        sb.s_blocks_per_group = EXT2_BLOCKS_PER_GROUP;
        sb.s_frags_per_group = EXT2_BLOCKS_PER_GROUP;
        sb.s_inodes_per_group = meta.inodes_per_group;
        sb.s_wtime = self.now;
        sb.s_lastcheck = self.now;
        sb.s_max_mnt_count = EXT2_MAX_MNT_COUNT;
        sb.s_magic = EXT2_SUPER_MAGIC;
        sb.s_state = EXT2_VALID_FS;
        sb.s_errors = EXT2_ERRORS_CONTINUE;
        sb.s_creator_os = EXT2_OS_LINUX;
        sb.s_rev_level = EXT2_DYNAMIC_REV;
        sb.s_first_ino = EXT2_FIRST_INO;
        sb.s_inode_size = EXT2_INODE_SIZE as u16;
        sb.s_feature_incompat = EXT2_FEATURE_INCOMPAT_FILETYPE;
        sb.s_uuid = meta.uuid;
        self.image.write_struct(EXT2_SUPERBLOCK_OFFSET, &sb)?;

        for group in 0..meta.groups {
            let desc = Ext2GroupDesc {
                bg_block_bitmap: meta.block_bitmap(group),
                bg_inode_bitmap: meta.inode_bitmap(group),
                bg_inode_table: meta.inode_table(group),
                ..Default::default()
            };
            self.image.write_struct(meta.desc_offset(group), &desc)?;

            // Group metadata plus padding past the end of a short group
            let bitmap = self.image.bytes_mut(
                meta.block_offset(meta.block_bitmap(group)),
                EXT2_BLOCK_SIZE as usize,
            )?;
            bitmap.set_range(0, meta.overhead() as usize);
            bitmap.set_range(meta.group_blocks(group) as usize, EXT2_BLOCKS_PER_GROUP as usize);

            let bitmap = self.image.bytes_mut(
                meta.block_offset(meta.inode_bitmap(group)),
                EXT2_BLOCK_SIZE as usize,
            )?;
            bitmap.set_range(
                meta.inodes_per_group as usize,
                EXT2_MAX_INODES_PER_GROUP as usize,
            );
        }
        self.next_block = meta.overhead();

        // Reserved inodes 1..=10; only the root carries data
        for ino in 1..EXT2_FIRST_INO {
            self.mark_inode(ino)?;
        }
        self.next_inode = EXT2_FIRST_INO;

        let root = Ext2Inode::new(S_IFDIR | 0o755, 0, 0, self.now);
        self.write_inode(EXT2_ROOT_INO, &root)?;
        self.mark_dir(EXT2_ROOT_INO)?;
        self.init_dir(EXT2_ROOT_INO, EXT2_ROOT_INO)?;

        let lost = self.alloc_inode(true)?;
        let inode = Ext2Inode::new(S_IFDIR | 0o700, 0, 0, self.now);
        self.write_inode(lost, &inode)?;
        self.init_dir(lost, EXT2_ROOT_INO)?;
        // lost+found spans four blocks
        for _ in 1..EXT2_LOST_FOUND_BLOCKS {
            self.append_dir_block(lost)?;
        }
        self.link(EXT2_ROOT_INO, b"lost+found", lost, EXT2_FT_DIR)?;
        Ok(())
    }

    // === Allocation ===

    fn alloc_block(&mut self) -> FsInjectorResult<u32> {
        let meta = self.meta;
        let mut group = self.next_block / EXT2_BLOCKS_PER_GROUP;
        while group < meta.groups {
            let start = self.next_block.max(meta.group_start(group)) - meta.group_start(group);
            let bitmap = self.image.bytes_mut(
                meta.block_offset(meta.block_bitmap(group)),
                EXT2_BLOCK_SIZE as usize,
            )?;
            if let Some(bit) = bitmap.first_clear(start as usize, meta.group_blocks(group) as usize) {
                bitmap.set_bit(bit, true);
                let block = meta.group_start(group) + bit as u32;
                self.next_block = block + 1;
                return Ok(block);
            }
            group += 1;
        }
        Err(FsAllocatorError::OutOfBlocks.into())
    }

    fn mark_inode(&mut self, ino: u32) -> ImgIOResult {
        let meta = self.meta;
        let group = (ino - 1) / meta.inodes_per_group;
        let bitmap = self.image.bytes_mut(
            meta.block_offset(meta.inode_bitmap(group)),
            EXT2_BLOCK_SIZE as usize,
        )?;
        bitmap.set_bit(((ino - 1) % meta.inodes_per_group) as usize, true);
        Ok(())
    }

    fn alloc_inode(&mut self, is_dir: bool) -> FsInjectorResult<u32> {
        if self.next_inode > self.meta.inodes_count() {
            return Err(FsAllocatorError::OutOfInodes.into());
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.mark_inode(ino)?;
        if is_dir {
            self.mark_dir(ino)?;
        }
        Ok(ino)
    }

    fn mark_dir(&mut self, ino: u32) -> ImgIOResult {
        let off = self.meta.desc_offset((ino - 1) / self.meta.inodes_per_group);
        let mut desc: Ext2GroupDesc = self.image.read_struct(off)?;
        desc.bg_used_dirs_count += 1;
        self.image.write_struct(off, &desc)
    }

    // === Inodes and block maps ===

    fn read_inode(&self, ino: u32) -> ImgIOResult<Ext2Inode> {
        self.image.read_struct(self.meta.inode_offset(ino))
    }

    fn write_inode(&mut self, ino: u32, inode: &Ext2Inode) -> ImgIOResult {
        self.image.write_struct(self.meta.inode_offset(ino), inode)
    }

    /// Returns the pointer block in `slot`, allocating it when empty.
    fn pointer_block(&mut self, inode: &mut Ext2Inode, slot: usize) -> FsInjectorResult<u32> {
        match inode.block(slot) {
            0 => {
                let block = self.alloc_block()?;
                inode.set_block(slot, block);
                inode.charge_block();
                Ok(block)
            }
            block => Ok(block),
        }
    }

    /// Returns the entry at `index` of pointer block `table`, allocating a
    /// pointer block there when empty.
    fn pointer_entry(&mut self, inode: &mut Ext2Inode, table: u32, index: u32) -> FsInjectorResult<u32> {
        let off = self.meta.block_offset(table) + index as u64 * 4;
        match self.image.read_u32_at(off)? {
            0 => {
                let block = self.alloc_block()?;
                self.image.write_u32_at(off, block)?;
                inode.charge_block();
                Ok(block)
            }
            block => Ok(block),
        }
    }

    /// Maps logical block `index` of `inode` to physical `block`.
    fn map_block(&mut self, inode: &mut Ext2Inode, index: u32, block: u32) -> FsInjectorResult {
        const PTRS: u32 = EXT2_PTRS_PER_BLOCK;
        if index < EXT2_NDIR_BLOCKS {
            inode.set_block(index as usize, block);
        } else if index < EXT2_NDIR_BLOCKS + PTRS {
            let ind = self.pointer_block(inode, EXT2_IND_BLOCK)?;
            let off = self.meta.block_offset(ind) + (index - EXT2_NDIR_BLOCKS) as u64 * 4;
            self.image.write_u32_at(off, block)?;
        } else if (index as u64) < EXT2_MAX_FILE_BLOCKS {
            let rel = index - EXT2_NDIR_BLOCKS - PTRS;
            let dind = self.pointer_block(inode, EXT2_DIND_BLOCK)?;
            let ind = self.pointer_entry(inode, dind, rel / PTRS)?;
            let off = self.meta.block_offset(ind) + (rel % PTRS) as u64 * 4;
            self.image.write_u32_at(off, block)?;
        } else {
            return Err(FsInjectorError::TooBig);
        }
        inode.charge_block();
        Ok(())
    }

    fn lookup_block(&self, inode: &Ext2Inode, index: u32) -> ImgIOResult<u32> {
        const PTRS: u32 = EXT2_PTRS_PER_BLOCK;
        if index < EXT2_NDIR_BLOCKS {
            return Ok(inode.block(index as usize));
        }
        let read = |table: u32, i: u32| -> ImgIOResult<u32> {
            if table == 0 {
                return Ok(0);
            }
            self.image
                .read_u32_at(self.meta.block_offset(table) + i as u64 * 4)
        };
        if index < EXT2_NDIR_BLOCKS + PTRS {
            return read(inode.block(EXT2_IND_BLOCK), index - EXT2_NDIR_BLOCKS);
        }
        let rel = index - EXT2_NDIR_BLOCKS - PTRS;
        let ind = read(inode.block(EXT2_DIND_BLOCK), rel / PTRS)?;
        read(ind, rel % PTRS)
    }

    /// Allocates and maps the data blocks of a regular file or symlink.
    fn write_data(&mut self, inode: &mut Ext2Inode, data: &[u8]) -> FsInjectorResult {
        for (index, chunk) in data.chunks(EXT2_BLOCK_SIZE as usize).enumerate() {
            let block = self.alloc_block()?;
            self.image.write_at(self.meta.block_offset(block), chunk)?;
            self.map_block(inode, index as u32, block)?;
        }
        inode.i_size = data.len() as u32;
        Ok(())
    }

    // === Directories ===

    fn write_dirent(&mut self, off: u64, ino: u32, rec_len: u64, name: &[u8], file_type: u8) -> ImgIOResult {
        let header = Ext2DirEntryHeader {
            inode: ino,
            rec_len: rec_len as u16,
            name_len: name.len() as u8,
            file_type,
        };
        self.image.write_struct(off, &header)?;
        self.image.write_at(off + EXT2_DIRENT_HEADER, name)
    }

    /// Adds an empty block (one unused record spanning it) to a directory.
    fn append_dir_block(&mut self, dir: u32) -> FsInjectorResult<u32> {
        let mut inode = self.read_inode(dir)?;
        let index = inode.i_size / EXT2_BLOCK_SIZE as u32;
        let block = self.alloc_block()?;
        self.map_block(&mut inode, index, block)?;
        inode.i_size += EXT2_BLOCK_SIZE as u32;
        self.write_inode(dir, &inode)?;
        self.write_dirent(self.meta.block_offset(block), 0, EXT2_BLOCK_SIZE, &[], EXT2_FT_UNKNOWN)?;
        Ok(block)
    }

    /// First block of a new directory: `.` and `..`.
    fn init_dir(&mut self, dir: u32, parent: u32) -> FsInjectorResult {
        let block = self.append_dir_block(dir)?;
        let off = self.meta.block_offset(block);
        let dot = dirent_size(1);
        self.write_dirent(off, dir, dot, b".", EXT2_FT_DIR)?;
        self.write_dirent(off + dot, parent, EXT2_BLOCK_SIZE - dot, b"..", EXT2_FT_DIR)?;

        let mut inode = self.read_inode(dir)?;
        inode.i_links_count = 2;
        self.write_inode(dir, &inode)?;
        if parent != dir {
            let mut up = self.read_inode(parent)?;
            up.i_links_count += 1;
            self.write_inode(parent, &up)?;
        }
        Ok(())
    }

    /// Live records of a directory as `(name, inode, type)`.
    fn list_dir(&self, dir: u32) -> FsInjectorResult<Vec<(Vec<u8>, u32, u8)>> {
        let inode = self.read_inode(dir)?;
        let mut out = Vec::new();
        for index in 0..inode.i_size / EXT2_BLOCK_SIZE as u32 {
            let base = self.meta.block_offset(self.lookup_block(&inode, index)?);
            let mut pos = 0u64;
            while pos < EXT2_BLOCK_SIZE {
                let header: Ext2DirEntryHeader = self.image.read_struct(base + pos)?;
                if header.rec_len < EXT2_DIRENT_HEADER as u16 {
                    return Err(FsInjectorError::Invalid("Corrupt ext2 directory record"));
                }
                if header.inode != 0 {
                    let name = self
                        .image
                        .bytes(base + pos + EXT2_DIRENT_HEADER, header.name_len as usize)?;
                    out.push((name.to_vec(), header.inode, header.file_type));
                }
                pos += header.rec_len as u64;
            }
        }
        Ok(out)
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<u32> {
        let mut dir = EXT2_ROOT_INO;
        for segment in split_path(path) {
            let (_, ino, file_type) = self
                .list_dir(dir)?
                .into_iter()
                .find(|(name, _, _)| name == segment.as_bytes())
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(file_type == EXT2_FT_DIR, FsInjectorError::NotADirectory);
            dir = ino;
        }
        Ok(dir)
    }

    /// Appends a record to the last block of `dir`, splitting the slack of
    /// the final record or starting a new block.
    fn link(&mut self, dir: u32, name: &[u8], ino: u32, file_type: u8) -> FsInjectorResult {
        let needed = dirent_size(name.len());
        let inode = self.read_inode(dir)?;
        let blocks = inode.i_size / EXT2_BLOCK_SIZE as u32;

        if blocks > 0 {
            let base = self.meta.block_offset(self.lookup_block(&inode, blocks - 1)?);
            let mut pos = 0u64;
            loop {
                let header: Ext2DirEntryHeader = self.image.read_struct(base + pos)?;
                let rec_len = header.rec_len as u64;
                if rec_len < EXT2_DIRENT_HEADER {
                    return Err(FsInjectorError::Invalid("Corrupt ext2 directory record"));
                }
                if pos + rec_len < EXT2_BLOCK_SIZE {
                    pos += rec_len;
                    continue;
                }
                if header.inode == 0 && rec_len >= needed {
                    return Ok(self.write_dirent(base + pos, ino, rec_len, name, file_type)?);
                }
                let used = dirent_size(header.name_len as usize);
                if rec_len - used >= needed {
                    self.image.write_u16_at(base + pos + 4, used as u16)?;
                    return Ok(self.write_dirent(base + pos + used, ino, rec_len - used, name, file_type)?);
                }
                break;
            }
        }

        let block = self.append_dir_block(dir)?;
        self.write_dirent(self.meta.block_offset(block), ino, EXT2_BLOCK_SIZE, name, file_type)?;
        Ok(())
    }

    // === Summary ===

    fn update_counts(&mut self) -> ImgIOResult {
        let meta = self.meta;
        let (mut free_blocks, mut free_inodes) = (0u32, 0u32);
        for group in 0..meta.groups {
            let group_blocks = meta.group_blocks(group) as usize;
            let blocks = self.image.bytes(
                meta.block_offset(meta.block_bitmap(group)),
                EXT2_BLOCK_SIZE as usize,
            )?;
            let bfree = (group_blocks - blocks.count_set(0, group_blocks)) as u32;
            let inodes = self.image.bytes(
                meta.block_offset(meta.inode_bitmap(group)),
                EXT2_BLOCK_SIZE as usize,
            )?;
            let ipg = meta.inodes_per_group as usize;
            let ifree = (ipg - inodes.count_set(0, ipg)) as u32;

            let off = meta.desc_offset(group);
            let mut desc: Ext2GroupDesc = self.image.read_struct(off)?;
            desc.bg_free_blocks_count = bfree as u16;
            desc.bg_free_inodes_count = ifree as u16;
            self.image.write_struct(off, &desc)?;

            free_blocks += bfree;
            free_inodes += ifree;
        }

        let mut sb: Ext2SuperBlock = self.image.read_struct(EXT2_SUPERBLOCK_OFFSET)?;
        sb.s_free_blocks_count = free_blocks;
        sb.s_free_inodes_count = free_inodes;
        sb.s_block_group_nr = 0;
        self.image.write_struct(EXT2_SUPERBLOCK_OFFSET, &sb)
    }

    /// Superblock and descriptor copies at the head of every other group.
    fn write_backups(&mut self) -> ImgIOResult {
        let meta = self.meta;
        let mut sb: Ext2SuperBlock = self.image.read_struct(EXT2_SUPERBLOCK_OFFSET)?;
        for group in 1..meta.groups {
            let start = meta.block_offset(meta.group_start(group));
            sb.s_block_group_nr = group as u16;
            self.image.write_struct(start, &sb)?;
            self.image.copy_within(
                meta.block_offset(EXT2_GDT_BLOCK),
                start + EXT2_BLOCK_SIZE,
                EXT2_BLOCK_SIZE as usize,
            )?;
        }
        Ok(())
    }
}

impl FsDriver for Ext2Driver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let capacity = capacity.ok_or(FsFormatterError::PartitionOnly)?;
        let meta = Ext2Meta::new(capacity)?;
        let image =
            ImageBuf::zeroed(meta.blocks as u64 * EXT2_BLOCK_SIZE).map_err(FsFormatterError::from)?;

        let mut driver = Self {
            image,
            meta,
            next_block: 0,
            next_inode: 1,
            now: clamp_time(now_unix()),
        };
        driver.format()?;

        tracing::debug!(
            blocks = meta.blocks,
            groups = meta.groups,
            inodes_per_group = meta.inodes_per_group,
            "ext2 volume formatted"
        );
        Ok(driver)
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        let file_type = match entry.kind {
            EntryKind::Regular => EXT2_FT_REG_FILE,
            EntryKind::Directory => EXT2_FT_DIR,
            EntryKind::Symlink => EXT2_FT_SYMLINK,
            EntryKind::CharDevice => EXT2_FT_CHRDEV,
            EntryKind::BlockDevice => EXT2_FT_BLKDEV,
            EntryKind::Fifo | EntryKind::Socket => {
                tracing::warn!(path = %entry.path, kind = ?entry.kind, "ext2 entry kind not stored, skipped");
                return Ok(());
            }
        };
        let name = entry.name().as_bytes();
        if name.is_empty() {
            return Ok(());
        }
        crate::ensure!(name.len() <= EXT2_NAME_LEN, FsInjectorError::NameTooLong);
        tracing::trace!(path = %entry.path, size = entry.size(), "ext2 add");

        let parent = self.resolve_dir(entry.parent())?;
        if let Some((_, _, existing)) = self.list_dir(parent)?.into_iter().find(|(n, _, _)| n == name) {
            if existing == EXT2_FT_DIR && entry.is_dir() {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }
        match entry.kind {
            EntryKind::Regular => check_file_size(entry.size() as u64)?,
            EntryKind::Symlink => crate::ensure!(
                (entry.size() as u64) < EXT2_BLOCK_SIZE,
                FsInjectorError::TooBig
            ),
            _ => {}
        }

        let ino = self.alloc_inode(entry.is_dir())?;
        let mut inode = Ext2Inode::new(entry.st_mode(), entry.uid, entry.gid, clamp_time(entry.mtime));
        match entry.kind {
            EntryKind::Symlink if entry.size() < EXT2_FAST_SYMLINK_MAX => inode.set_inline(&entry.data),
            EntryKind::Regular | EntryKind::Symlink => self.write_data(&mut inode, &entry.data)?,
            EntryKind::CharDevice | EntryKind::BlockDevice => {
                let (major, minor) = (dev_major(entry.rdev), dev_minor(entry.rdev));
                if major < 256 && minor < 256 {
                    inode.set_block(0, entry.old_rdev() as u32);
                } else {
                    let new = (minor & 0xFF) | (major << 8) | ((minor & !0xFF) << 12);
                    inode.set_block(1, new);
                }
            }
            _ => {}
        }
        self.write_inode(ino, &inode)?;
        if entry.is_dir() {
            self.init_dir(ino, parent)?;
        }
        self.link(parent, name, ino, file_type)?;
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        self.update_counts()?;
        self.write_backups()?;
        tracing::debug!(
            next_block = self.next_block,
            inodes_used = self.next_inode - 1,
            "ext2 volume closed"
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
