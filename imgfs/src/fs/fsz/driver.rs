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
            checksum_utils::crc32c_fsz,
            path_utils::split_path,
            time_utils::{now_unix, unix_to_micros},
        },
    },
    fs::fsz::{constant::*, mime::classify, types::*},
};

/// FS/Z image. Every inode occupies one logical sector and is addressed
/// by its sector number; the image grows one sector at a time.
#[derive(Debug)]
pub struct FszDriver {
    image: ImageBuf,
    /// Partition size in sectors, `None` for an initrd.
    numsec: Option<u64>,
    uuid: [u8; 16],
    now: u64,
}

#[inline]
fn offset(sector: u64) -> u64 {
    sector * FSZ_SECTOR_SIZE
}

#[inline]
fn inline_offset(sector: u64) -> u64 {
    offset(sector) + FSZ_INODE_HEADER
}

impl FszDriver {
    fn is_partition(&self) -> bool {
        self.numsec.is_some()
    }

    /// Appends one zeroed sector.
    fn alloc_sector(&mut self) -> ImgIOResult<u64> {
        let sector = self.image.len() / FSZ_SECTOR_SIZE;
        self.image.resize(offset(sector + 1))?;
        Ok(sector)
    }

    fn write_superblock(&mut self) -> ImgIOResult {
        let sectors = self.image.len() / FSZ_SECTOR_SIZE;
        let mut sb = FszSuperBlock::new_zeroed();
        sb.magic = *FSZ_MAGIC;
        sb.version_major = FSZ_VERSION_MAJOR;
        sb.version_minor = FSZ_VERSION_MINOR;
        sb.logsec = FSZ_LOGSEC;
        sb.maxmounts = FSZ_MAX_MOUNTS;
        sb.numsec = self.numsec.unwrap_or(sectors);
        sb.freesec = sectors;
        sb.rootdirfid = FSZ_ROOT_FID;
        sb.createdate = self.now;
        sb.lastmountdate = self.now;
        sb.lastumountdate = self.now;
        sb.uuid = self.uuid;
        sb.magic2 = *FSZ_MAGIC;
        sb.checksum = crc32c_fsz(&sb.as_bytes()[FSZ_SB_CRC_START..FSZ_SB_CRC_END]);
        self.image.write_struct(0, &sb)
    }

    // === Inodes ===

    /// Allocates an inode. Directories start with an empty inline header.
    fn new_inode(&mut self, filetype: &[u8; 4], access: u8, modified: u64) -> FsInjectorResult<(u64, FszInode)> {
        let sector = self.alloc_sector()?;
        let mut inode = FszInode::new_zeroed();
        inode.magic = *FSZ_IN_MAGIC;
        inode.filetype = *filetype;
        inode.owner = FszAccess::root(access);
        inode.createdate = self.now;
        inode.changedate = self.now;
        inode.modifydate = modified;

        if filetype == FSZ_FILETYPE_DIR {
            inode.sec = sector;
            inode.flags = FSZ_IN_FLAG_INLINE;
            self.write_dir(sector, &mut inode, &[])?;
        }
        self.write_inode(sector, &mut inode)?;
        Ok((sector, inode))
    }

    fn read_inode(&self, sector: u64) -> FsInjectorResult<FszInode> {
        let inode: FszInode = self.image.read_struct(offset(sector))?;
        crate::ensure!(inode.magic == *FSZ_IN_MAGIC, FsInjectorError::Invalid("Bad FS/Z inode magic"));
        Ok(inode)
    }

    /// Stores `inode` with a fresh checksum.
    fn write_inode(&mut self, sector: u64, inode: &mut FszInode) -> ImgIOResult {
        let crc_end = FSZ_IN_CRC_START + FSZ_IN_CRC_LEN;
        inode.checksum = crc32c_fsz(&inode.as_bytes()[FSZ_IN_CRC_START..crc_end]);
        self.image.write_struct(offset(sector), inode)
    }

    // === Directories ===

    /// Sectors holding the entry table of a directory that outgrew its
    /// inode sector; empty while the table is inline.
    fn dir_sectors(&self, dir: u64, inode: &FszInode) -> FsInjectorResult<Vec<u64>> {
        let flags = inode.flags;
        match flags {
            FSZ_IN_FLAG_INLINE => Ok(Vec::new()),
            FSZ_IN_FLAG_DIRECT => Ok(Vec::from([inode.sec])),
            _ => (0..inode.size.div_ceil(FSZ_SECTOR_SIZE))
                .map(|i| -> FsInjectorResult<u64> {
                    let slot: FszSectorDir = self.image.read_struct(inline_offset(dir) + i * FSZ_SD_ENTRY)?;
                    Ok(slot.sec)
                })
                .collect(),
        }
    }

    /// Raw entry table of `dir`, header included.
    fn dir_table(&self, dir: u64) -> FsInjectorResult<Vec<u8>> {
        let inode = self.read_inode(dir)?;
        crate::ensure!(inode.filetype == *FSZ_FILETYPE_DIR, FsInjectorError::NotADirectory);
        let size = inode.size as usize;
        let sectors = self.dir_sectors(dir, &inode)?;
        if sectors.is_empty() {
            return Ok(self.image.bytes(inline_offset(dir), size)?.to_vec());
        }
        let mut table = Vec::with_capacity(sectors.len() * FSZ_SECTOR_SIZE as usize);
        for sector in sectors {
            table.extend_from_slice(self.image.bytes(offset(sector), FSZ_SECTOR_SIZE as usize)?);
        }
        table.truncate(size);
        Ok(table)
    }

    fn list_dir(&self, dir: u64) -> FsInjectorResult<Vec<FszDirEnt>> {
        let table = self.dir_table(dir)?;
        let (header, rest) =
            FszDirEntHeader::read_from_prefix(&table).map_err(|_| FsInjectorError::NotADirectory)?;
        crate::ensure!(header.magic == *FSZ_DIR_MAGIC, FsInjectorError::NotADirectory);
        let count = header.numentries.min(FSZ_DIR_MAX_ENTRIES) as usize;
        rest.chunks_exact(FSZ_DIRENT_SIZE as usize)
            .take(count)
            .map(|raw| {
                FszDirEnt::read_from_bytes(raw).map_err(|_| FsInjectorError::Invalid("Truncated FS/Z directory"))
            })
            .collect()
    }

    /// Rewrites the entry table of `dir`, its header checksum and the
    /// directory size. The caller stores the inode.
    ///
    /// A table that no longer fits the inode sector moves to one direct
    /// sector, then to data sectors listed by an inline sector directory.
    /// Tables only grow, so sectors already holding the table are reused.
    fn write_dir(&mut self, dir: u64, inode: &mut FszInode, entries: &[FszDirEnt]) -> FsInjectorResult {
        let mut header = FszDirEntHeader::new_zeroed();
        header.magic = *FSZ_DIR_MAGIC;
        header.numentries = entries.len() as u64;
        header.fid = dir;

        let mut table = Vec::with_capacity((entries.len() + 1) * FSZ_DIRENT_SIZE as usize);
        table.extend_from_slice(header.as_bytes());
        for ent in entries {
            table.extend_from_slice(ent.as_bytes());
        }
        let crc = crc32c_fsz(&table[16..]);
        table[4..8].copy_from_slice(&crc.to_le_bytes());
        let size = table.len() as u64;

        if size <= FSZ_INLINE_SIZE {
            self.image.write_at(inline_offset(dir), &table)?;
            inode.sec = dir;
            inode.flags = FSZ_IN_FLAG_INLINE;
            inode.size = size;
            return Ok(());
        }

        let needed = size.div_ceil(FSZ_SECTOR_SIZE);
        crate::ensure!(needed <= FSZ_SD0_MAX, FsInjectorError::TooManyEntries);
        let mut sectors = self.dir_sectors(dir, inode)?;
        while (sectors.len() as u64) < needed {
            sectors.push(self.alloc_sector()?);
        }

        let mut inline = Vec::new();
        inline.resize(FSZ_INLINE_SIZE as usize, 0u8);
        for (i, (chunk, &sector)) in table.chunks(FSZ_SECTOR_SIZE as usize).zip(&sectors).enumerate() {
            self.image.write_at(offset(sector), chunk)?;
            let slot = FszSectorDir {
                sec: sector,
                sec_hi: 0,
                chksum: crc32c_fsz(self.image.bytes(offset(sector), FSZ_SECTOR_SIZE as usize)?),
            };
            let at = i * FSZ_SD_ENTRY as usize;
            inline[at..at + FSZ_SD_ENTRY as usize].copy_from_slice(slot.as_bytes());
        }

        match sectors.as_slice() {
            [only] => {
                inline.fill(0);
                inode.sec = *only;
                inode.flags = FSZ_IN_FLAG_DIRECT;
            }
            _ => {
                inode.sec = dir;
                inode.flags = FSZ_IN_FLAG_SD0;
            }
        }
        self.image.write_at(inline_offset(dir), &inline)?;
        inode.numblocks = needed;
        inode.size = size;
        Ok(())
    }

    /// Binds `target` under `name` in `dir`, keeping the table sorted.
    fn link(&mut self, dir: u64, name: &[u8], target: u64, is_dir: bool) -> FsInjectorResult {
        let mut entries = self.list_dir(dir)?;
        crate::ensure!(
            (entries.len() as u64) < FSZ_DIR_MAX_ENTRIES,
            FsInjectorError::TooManyEntries
        );

        let mut stored = Vec::with_capacity(name.len() + 1);
        stored.extend_from_slice(name);
        if is_dir {
            stored.push(b'/');
        }
        entries.push(FszDirEnt::new(target, &stored));
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        let mut inode = self.read_inode(dir)?;
        self.write_dir(dir, &mut inode, &entries)?;
        inode.modifydate = self.now;
        self.write_inode(dir, &mut inode)?;

        let mut child = self.read_inode(target)?;
        child.numlinks += 1;
        self.write_inode(target, &mut child)?;
        Ok(())
    }

    /// Finds `name` in `dir`; the flag tells whether it is a directory.
    fn lookup(&self, dir: u64, name: &[u8]) -> FsInjectorResult<Option<(u64, bool)>> {
        Ok(self.list_dir(dir)?.into_iter().find_map(|ent| {
            let stored = ent.name();
            match stored.strip_suffix(b"/") {
                Some(base) if base == name => Some((ent.fid, true)),
                None if stored == name => Some((ent.fid, false)),
                _ => None,
            }
        }))
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<u64> {
        let mut dir = FSZ_ROOT_FID;
        for segment in split_path(path) {
            let (fid, is_dir) = self
                .lookup(dir, segment.as_bytes())?
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(is_dir, FsInjectorError::NotADirectory);
            dir = fid;
        }
        Ok(dir)
    }

    // === File data ===

    /// Sparse sectors are only used on partitions; initrd loaders expect
    /// every sector to be present.
    fn is_sparse(&self, chunk: &[u8]) -> bool {
        self.is_partition() && chunk.iter().all(|&b| b == 0)
    }

    /// Stores one data sector and returns its sector directory slot.
    fn write_data_sector(&mut self, chunk: &[u8]) -> FsInjectorResult<FszSectorDir> {
        if self.is_sparse(chunk) {
            return Ok(FszSectorDir::default());
        }
        let sector = self.alloc_sector()?;
        self.image.write_at(offset(sector), chunk)?;
        let chksum = crc32c_fsz(self.image.bytes(offset(sector), FSZ_SECTOR_SIZE as usize)?);
        Ok(FszSectorDir {
            sec: sector,
            sec_hi: 0,
            chksum,
        })
    }

    fn write_file(&mut self, ino: u64, inode: &mut FszInode, data: &[u8]) -> FsInjectorResult {
        let size = data.len() as u64;
        inode.size = size;

        if size <= FSZ_INLINE_SIZE {
            inode.sec = ino;
            inode.flags = FSZ_IN_FLAG_INLINE;
            self.image.write_at(inline_offset(ino), data)?;
            return Ok(());
        }

        if size <= FSZ_SECTOR_SIZE {
            inode.flags = FSZ_IN_FLAG_DIRECT;
            let slot = self.write_data_sector(data)?;
            inode.sec = slot.sec;
            inode.numblocks = (slot.sec != 0) as u64;
            return Ok(());
        }

        let count = size.div_ceil(FSZ_SECTOR_SIZE);
        crate::ensure!(count <= FSZ_SD1_MAX, FsInjectorError::TooBig);
        let table = match count <= FSZ_SD0_MAX {
            true => {
                inode.sec = ino;
                inode.flags = FSZ_IN_FLAG_SD0;
                inline_offset(ino)
            }
            false => {
                let sd = self.alloc_sector()?;
                inode.sec = sd;
                inode.flags = FSZ_IN_FLAG_SD1;
                inode.numblocks = 1;
                offset(sd)
            }
        };

        for (i, chunk) in data.chunks(FSZ_SECTOR_SIZE as usize).enumerate() {
            let slot = self.write_data_sector(chunk)?;
            if slot.sec != 0 {
                inode.numblocks += 1;
            }
            self.image.write_struct(table + i as u64 * FSZ_SD_ENTRY, &slot)?;
        }
        Ok(())
    }
}

impl FsDriver for FszDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let now = unix_to_micros(now_unix());
        let (image, numsec, uuid) = match capacity {
            Some(cap) => {
                let numsec = cap.bytes() / FSZ_SECTOR_SIZE;
                crate::ensure!(numsec >= FSZ_MIN_SECTORS, FsFormatterError::BelowMinimum);
                (ImageBuf::with_limit(offset(numsec)), Some(numsec), cap.guid)
            }
            None => (ImageBuf::new(), None, [0u8; 16]),
        };

        let mut driver = Self {
            image,
            numsec,
            uuid,
            now,
        };
        driver.alloc_sector().map_err(FsFormatterError::from)?;
        let access = FSZ_READ | FSZ_WRITE | FSZ_DELETE | FSZ_EXEC;
        let (root, mut inode) = driver.new_inode(FSZ_FILETYPE_DIR, access, now)?;
        inode.set_mimetype(FSZ_MIMETYPE_DIR_ROOT);
        inode.numlinks = 1;
        driver.write_inode(root, &mut inode).map_err(FsFormatterError::from)?;
        driver.write_superblock().map_err(FsFormatterError::from)?;

        tracing::debug!(partition_sectors = ?numsec, root, "fsz volume formatted");
        Ok(driver)
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        let name = entry.name().as_bytes();
        if name.is_empty() {
            return Ok(());
        }
        if !matches!(entry.kind, EntryKind::Regular | EntryKind::Directory | EntryKind::Symlink) {
            tracing::warn!(path = %entry.path, kind = ?entry.kind, "fsz entry kind not stored, skipped");
            return Ok(());
        }
        crate::ensure!(name.len() <= FSZ_NAME_MAX, FsInjectorError::NameTooLong);
        tracing::trace!(path = %entry.path, size = entry.size(), "fsz add");

        let parent = self.resolve_dir(entry.parent())?;
        if let Some((_, is_dir)) = self.lookup(parent, name)? {
            if is_dir && entry.is_dir() {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }

        let modified = unix_to_micros(entry.mtime);
        let base = FSZ_READ | FSZ_WRITE | FSZ_DELETE;
        let ino = match entry.kind {
            EntryKind::Directory => self.new_inode(FSZ_FILETYPE_DIR, base | FSZ_EXEC, modified)?.0,
            EntryKind::Symlink => {
                crate::ensure!(entry.size() as u64 <= FSZ_INLINE_SIZE, FsInjectorError::TooBig);
                let (ino, mut inode) = self.new_inode(FSZ_FILETYPE_SYMLINK, base, modified)?;
                self.write_file(ino, &mut inode, &entry.data)?;
                self.write_inode(ino, &mut inode)?;
                ino
            }
            _ => {
                let mime = classify(entry.name(), &entry.data);
                let access = base | if mime.exec { FSZ_EXEC } else { 0 };
                let (ino, mut inode) = self.new_inode(mime.filetype, access, modified)?;
                inode.set_mimetype(mime.mimetype);
                self.write_file(ino, &mut inode, &entry.data)?;
                self.write_inode(ino, &mut inode)?;
                ino
            }
        };
        self.link(parent, name, ino, entry.is_dir())?;
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        self.write_superblock()?;
        tracing::debug!(sectors = self.image.len() / FSZ_SECTOR_SIZE, "fsz image closed");
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

    const SEC: usize = FSZ_SECTOR_SIZE as usize;

    fn names(fs: &FszDriver, dir: u64) -> Vec<String> {
        fs.list_dir(dir)
            .unwrap()
            .iter()
            .map(|e| String::from_utf8(e.name().to_vec()).unwrap())
            .collect()
    }

    fn inode_crc_ok(fs: &FszDriver, sector: u64) -> bool {
        let bytes = fs.image().bytes(offset(sector), SEC).unwrap();
        let stored = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        stored == crc32c_fsz(&bytes[8..1024])
    }

    fn dir_crc_ok(fs: &FszDriver, dir: u64) -> bool {
        let bytes = fs.dir_table(dir).unwrap();
        let stored = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        stored == crc32c_fsz(&bytes[16..])
    }

    #[test]
    fn test_fresh_initrd() {
        let mut fs = FszDriver::open(None).unwrap();
        fs.close().unwrap();
        let img = fs.image().as_slice();
        assert_eq!(img.len(), 2 * SEC);
        assert_eq!(&img[512..516], b"FS/Z");
        assert_eq!(&img[1016..1020], b"FS/Z");
        let stored = u32::from_le_bytes(img[1020..1024].try_into().unwrap());
        assert_eq!(stored, crc32c_fsz(&img[512..1020]));

        let sb: FszSuperBlock = fs.image().read_struct(0).unwrap();
        let (numsec, freesec, root, logsec) = (sb.numsec, sb.freesec, sb.rootdirfid, sb.logsec);
        assert_eq!((numsec, freesec, root, logsec), (2, 2, 1, 1));

        let inode = fs.read_inode(1).unwrap();
        let (links, size, sec, flags) = (inode.numlinks, inode.size, inode.sec, inode.flags);
        assert_eq!((links, size, sec, flags), (1, 128, 1, FSZ_IN_FLAG_INLINE));
        assert_eq!(&inode.filetype, b"dir:");
        assert_eq!(&inode.mimetype[..8], b"fs-root\0");
        assert_eq!(inode.owner.access & FSZ_EXEC, FSZ_EXEC);
        assert!(inode_crc_ok(&fs, 1));
        assert!(dir_crc_ok(&fs, 1));
        assert!(names(&fs, 1).is_empty());
    }

    #[test]
    fn test_sorted_tree() {
        let mut fs = FszDriver::open(None).unwrap();
        fs.add(&Entry::dir("sys")).unwrap();
        fs.add(&Entry::dir("etc")).unwrap();
        fs.add(&Entry::file("etc/motd", b"hello\n".to_vec())).unwrap();
        fs.add(&Entry::file("a.txt", b"x".to_vec())).unwrap();
        fs.add(&Entry::symlink("lib", "sys/lib")).unwrap();
        fs.add(&Entry::fifo("pipe")).unwrap();

        assert_eq!(names(&fs, 1), ["a.txt", "etc/", "lib", "sys/"]);
        let etc = fs.resolve_dir("etc").unwrap();
        assert_eq!(etc, 3);
        assert_eq!(names(&fs, etc), ["motd"]);
        assert!(dir_crc_ok(&fs, 1));
        assert!(dir_crc_ok(&fs, etc));

        let motd = fs.read_inode(4).unwrap();
        let (size, sec, links) = (motd.size, motd.sec, motd.numlinks);
        assert_eq!((size, sec, links), (6, 4, 1));
        assert_eq!(&motd.filetype, b"text");
        assert_eq!(fs.image().bytes(inline_offset(4), 6).unwrap(), b"hello\n");
        assert!(inode_crc_ok(&fs, 4));

        let link = fs.read_inode(6).unwrap();
        assert_eq!(&link.filetype, b"lnk:");
        assert_eq!(fs.image().bytes(inline_offset(6), 7).unwrap(), b"sys/lib");
    }

    #[test]
    fn test_data_encodings() {
        let mut fs = FszDriver::open(None).unwrap();
        fs.add(&Entry::file("direct", vec![1; SEC])).unwrap();
        let direct = fs.read_inode(2).unwrap();
        let (sec, flags, blocks) = (direct.sec, direct.flags, direct.numblocks);
        assert_eq!((sec, flags, blocks), (3, FSZ_IN_FLAG_DIRECT, 1));

        fs.add(&Entry::file("sd0", vec![2; 2 * SEC + 100])).unwrap();
        let sd0 = fs.read_inode(4).unwrap();
        let (sec, flags, blocks) = (sd0.sec, sd0.flags, sd0.numblocks);
        assert_eq!((sec, flags, blocks), (4, FSZ_IN_FLAG_SD0, 3));
        let slot: FszSectorDir = fs.image().read_struct(inline_offset(4) + 32).unwrap();
        let slot_sec = slot.sec;
        assert_eq!(slot_sec, 7);
        assert_eq!(fs.image().bytes(offset(7), 100).unwrap(), &[2; 100][..]);

        fs.add(&Entry::file("sd1", vec![3; 200 * SEC])).unwrap();
        let sd1 = fs.read_inode(8).unwrap();
        let (sec, flags, blocks) = (sd1.sec, sd1.flags, sd1.numblocks);
        assert_eq!((sec, flags, blocks), (9, FSZ_IN_FLAG_SD1, 201));
        let first: FszSectorDir = fs.image().read_struct(offset(9)).unwrap();
        let (first_sec, chksum) = (first.sec, first.chksum);
        assert_eq!(first_sec, 10);
        assert_eq!(chksum, crc32c_fsz(&vec![3; SEC]));

        assert_eq!(
            fs.add(&Entry::file("huge", vec![4; 257 * SEC])).unwrap_err(),
            FsError::Injector(FsInjectorError::TooBig)
        );
    }

    #[test]
    fn test_sparse_only_on_partitions() {
        let zeros = vec![0u8; 2 * SEC];
        let mut part = FszDriver::open(Some(&Capacity::from_sectors(2048, [9; 16]))).unwrap();
        part.add(&Entry::file("z", zeros.clone())).unwrap();
        let inode = part.read_inode(2).unwrap();
        let blocks = inode.numblocks;
        assert_eq!(blocks, 0);
        assert_eq!(part.image().len(), 3 * FSZ_SECTOR_SIZE);
        part.close().unwrap();
        let sb: FszSuperBlock = part.image().read_struct(0).unwrap();
        let (numsec, freesec, uuid) = (sb.numsec, sb.freesec, sb.uuid);
        assert_eq!((numsec, freesec, uuid), (256, 3, [9; 16]));

        let mut initrd = FszDriver::open(None).unwrap();
        initrd.add(&Entry::file("z", zeros)).unwrap();
        let blocks = initrd.read_inode(2).unwrap().numblocks;
        assert_eq!(blocks, 2);
    }

    #[test]
    fn test_limits() {
        assert_eq!(
            FszDriver::open(Some(&Capacity::from_sectors(15, [0; 16]))).unwrap_err().kind(),
            FsErrorKind::BelowMinimum
        );
        let mut small = FszDriver::open(Some(&Capacity::from_sectors(32, [0; 16]))).unwrap();
        assert_eq!(
            small.add(&Entry::file("big", vec![5; 3 * SEC])).unwrap_err().kind(),
            FsErrorKind::OutOfSpace
        );

        let mut fs = FszDriver::open(None).unwrap();
        assert_eq!(
            fs.add(&Entry::file(&"n".repeat(111), Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::NameTooLong)
        );
    }

    #[test]
    fn test_directory_outgrows_inode() {
        let mut fs = FszDriver::open(None).unwrap();
        fs.add(&Entry::dir("d")).unwrap();
        let d = fs.resolve_dir("d").unwrap();
        let flags_after = |fs: &mut FszDriver, upto: usize, from: usize| {
            for i in from..upto {
                fs.add(&Entry::file(&format!("d/f{i:03}"), Vec::new())).unwrap();
            }
            let inode = fs.read_inode(d).unwrap();
            (inode.flags, inode.numblocks, inode.size)
        };

        // 23 entries and the header fill the inline area exactly
        assert_eq!(flags_after(&mut fs, 23, 0), (FSZ_IN_FLAG_INLINE, 0, 24 * 128));
        assert_eq!(flags_after(&mut fs, 24, 23), (FSZ_IN_FLAG_DIRECT, 1, 25 * 128));
        let direct = fs.read_inode(d).unwrap().sec;
        assert_eq!(flags_after(&mut fs, 31, 24), (FSZ_IN_FLAG_DIRECT, 1, 32 * 128));
        assert_eq!({ fs.read_inode(d).unwrap().sec }, direct);
        assert_eq!(flags_after(&mut fs, 40, 31), (FSZ_IN_FLAG_SD0, 2, 41 * 128));

        // the direct sector stays first in the sector directory
        let first: FszSectorDir = fs.image().read_struct(inline_offset(d)).unwrap();
        let (first_sec, chksum) = (first.sec, first.chksum);
        assert_eq!(first_sec, direct);
        assert_eq!(chksum, crc32c_fsz(fs.image().bytes(offset(direct), SEC).unwrap()));
        assert!(dir_crc_ok(&fs, d));

        let expected: Vec<String> = (0..40).map(|i| format!("f{i:03}")).collect();
        assert_eq!(names(&fs, d), expected);
        assert!(inode_crc_ok(&fs, d));

        fs.add(&Entry::dir("d/zz")).unwrap();
        fs.add(&Entry::file("d/zz/inner", b"deep".to_vec())).unwrap();
        let zz = fs.resolve_dir("d/zz").unwrap();
        assert_eq!(names(&fs, zz), ["inner"]);
        assert_eq!(names(&fs, d).last().unwrap(), "zz/");
        assert_eq!(
            fs.add(&Entry::file("d/f007", Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::AlreadyExists)
        );
    }

    #[test]
    fn test_duplicates_and_close() {
        let mut fs = FszDriver::open(None).unwrap();
        fs.add(&Entry::dir("d")).unwrap();
        fs.add(&Entry::dir("d")).unwrap();
        fs.add(&Entry::file("f", b"1".to_vec())).unwrap();
        assert_eq!(
            fs.add(&Entry::file("f", b"2".to_vec())).unwrap_err(),
            FsError::Injector(FsInjectorError::AlreadyExists)
        );
        assert_eq!(
            fs.add(&Entry::file("f/x", Vec::new())).unwrap_err(),
            FsError::Injector(FsInjectorError::NotADirectory)
        );
        assert_eq!(names(&fs, 1), ["d/", "f"]);

        fs.close().unwrap();
        let first = fs.image().as_slice().to_vec();
        fs.close().unwrap();
        assert_eq!(fs.image().as_slice(), &first[..]);
    }
}
