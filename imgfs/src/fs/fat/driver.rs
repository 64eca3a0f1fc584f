// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use imgio::prelude::*;

use crate::{
    core::{
        allocator::{FsAllocator, LinearAllocator},
        capacity::Capacity,
        driver::FsDriver,
        entry::{Entry, EntryKind},
        errors::*,
        utils::{checksum_utils::sfn_checksum, path_utils::split_path, time_utils::fat_datetime},
    },
    fs::fat::{attr::FatAttributes, constant::*, meta::*, types::*, utils::*},
};

/// Where a directory's records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirLoc {
    /// Fixed root region of FAT16.
    Root16,
    Cluster(u32),
}

#[derive(Debug, Clone)]
struct DirRecord {
    name: String,
    entry: FatDirEntry,
}

/// A directory as found on disk: every slot offset, how many are in use,
/// and the decoded children (without `.`/`..`).
#[derive(Debug)]
struct DirListing {
    slots: Vec<u64>,
    used: usize,
    records: Vec<DirRecord>,
}

impl DirListing {
    fn find(&self, name: &str) -> Option<&DirRecord> {
        self.records
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

/// FAT16/FAT32 volume with long file names, one sector per cluster.
#[derive(Debug)]
pub struct FatDriver {
    image: ImageBuf,
    meta: FatMeta,
    alloc: LinearAllocator,
    lfn_count: u32,
}

impl FatDriver {
    pub fn meta(&self) -> &FatMeta {
        &self.meta
    }

    fn format(&mut self) -> FsFormatterResult {
        self.image
            .write_struct(0, &BiosParamBlock::from_meta(&self.meta))?;
        match self.meta.fat_type {
            FatType::Fat16 => self
                .image
                .write_struct(FAT_EXT_BPB_OFFSET, &Fat16Ebpb::from_meta(&self.meta))?,
            FatType::Fat32 => {
                self.image
                    .write_struct(FAT_EXT_BPB_OFFSET, &Fat32Ebpb::from_meta(&self.meta))?;
                self.write_fsinfo()?;
            }
        }
        self.image.write_u16_at(FAT_SIGNATURE_OFFSET, FAT_SIGNATURE)?;

        match self.meta.fat_type {
            FatType::Fat16 => {
                self.fat_set(0, FAT16_MEDIA_ENTRY)?;
                self.fat_set(1, FAT16_EOC)?;
            }
            FatType::Fat32 => {
                self.fat_set(0, FAT32_MEDIA_ENTRY)?;
                self.fat_set(1, FAT32_EOC)?;
                self.fat_set(FAT32_ROOT_CLUSTER, FAT32_EOC)?;
            }
        }
        Ok(())
    }

    fn root_loc(&self) -> DirLoc {
        match self.meta.fat_type {
            FatType::Fat16 => DirLoc::Root16,
            FatType::Fat32 => DirLoc::Cluster(FAT32_ROOT_CLUSTER),
        }
    }

    // === FAT table ===

    fn fat_get(&self, cluster: u32) -> ImgIOResult<u32> {
        let off = self.meta.fat_offset(0) + cluster as u64 * self.meta.entry_size();
        match self.meta.fat_type {
            FatType::Fat16 => Ok(self.image.read_u16_at(off)? as u32),
            FatType::Fat32 => Ok(self.image.read_u32_at(off)? & FAT32_ENTRY_MASK),
        }
    }

    /// Writes `value` into both FAT copies.
    fn fat_set(&mut self, cluster: u32, value: u32) -> ImgIOResult {
        for copy in 0..FAT_NUM_FATS {
            let off = self.meta.fat_offset(copy) + cluster as u64 * self.meta.entry_size();
            match self.meta.fat_type {
                FatType::Fat16 => self.image.write_u16_at(off, value as u16)?,
                FatType::Fat32 => self.image.write_u32_at(off, value & FAT32_ENTRY_MASK)?,
            }
        }
        Ok(())
    }

    fn chain(&self, first: u32) -> FsInjectorResult<Vec<u32>> {
        let mut clusters = Vec::new();
        let mut current = first;
        loop {
            if current < FAT_FIRST_CLUSTER
                || current > self.meta.max_cluster()
                || clusters.len() > self.meta.clusters as usize
            {
                return Err(FsInjectorError::Invalid("Broken cluster chain"));
            }
            clusters.push(current);
            let next = self.fat_get(current)?;
            if self.meta.is_eoc(next) {
                return Ok(clusters);
            }
            current = next;
        }
    }

    // === Directories ===

    fn cluster_slots(&self, cluster: u32) -> impl Iterator<Item = u64> + use<> {
        let base = self.meta.cluster_offset(cluster);
        (0..FAT_CLUSTER_SIZE / FAT_DIR_ENTRY_SIZE).map(move |i| base + i * FAT_DIR_ENTRY_SIZE)
    }

    fn dir_slots(&self, loc: DirLoc) -> FsInjectorResult<Vec<u64>> {
        match loc {
            DirLoc::Root16 => {
                let base = self.meta.root_dir_offset();
                Ok((0..FAT16_ROOT_ENTRY_COUNT as u64)
                    .map(|i| base + i * FAT_DIR_ENTRY_SIZE)
                    .collect())
            }
            DirLoc::Cluster(first) => Ok(self
                .chain(first)?
                .into_iter()
                .flat_map(|c| self.cluster_slots(c))
                .collect()),
        }
    }

    fn list_dir(&self, loc: DirLoc) -> FsInjectorResult<DirListing> {
        let slots = self.dir_slots(loc)?;
        let mut used = slots.len();
        let mut records = Vec::new();
        let mut lfn: Vec<FatLfnEntry> = Vec::new();

        for (i, &off) in slots.iter().enumerate() {
            let raw: FatDirEntry = self.image.read_struct(off)?;
            match raw.name[0] {
                FAT_ENTRY_END_OF_DIR => {
                    used = i;
                    break;
                }
                FAT_ENTRY_DELETED => {
                    lfn.clear();
                    continue;
                }
                _ => {}
            }
            if FatAttributes::is_lfn(raw.attr) {
                lfn.push(self.image.read_struct(off)?);
                continue;
            }

            let checksum = sfn_checksum(&raw.name);
            let name = if !lfn.is_empty() && lfn.iter().all(|r| r.checksum == checksum) {
                decode_lfn(&lfn)
            } else {
                decode_sfn(&raw.name)
            };
            lfn.clear();

            if raw.attr & FatAttributes::VOLUME_ID.bits() != 0 || name == "." || name == ".." {
                continue;
            }
            records.push(DirRecord { name, entry: raw });
        }

        Ok(DirListing {
            slots,
            used,
            records,
        })
    }

    fn resolve_dir(&self, path: &str) -> FsInjectorResult<DirLoc> {
        let mut loc = self.root_loc();
        for segment in split_path(path) {
            let listing = self.list_dir(loc)?;
            let record = listing
                .find(segment)
                .ok_or(FsInjectorError::ParentNotFound)?;
            crate::ensure!(record.entry.is_dir(), FsInjectorError::NotADirectory);
            loc = DirLoc::Cluster(record.entry.first_cluster());
        }
        Ok(loc)
    }

    /// Links one more zeroed cluster onto a directory chain.
    fn extend_dir(&mut self, first: u32) -> FsInjectorResult<u32> {
        let last = *self
            .chain(first)?
            .last()
            .ok_or(FsInjectorError::Invalid("Empty cluster chain"))?;
        let cluster = self.alloc.allocate_unit()? as u32;
        self.image
            .zero_fill(self.meta.cluster_offset(cluster), FAT_CLUSTER_SIZE as usize)?;
        self.fat_set(last, cluster)?;
        self.fat_set(cluster, self.meta.eoc())?;
        Ok(cluster)
    }

    /// Writes consecutive 32-byte records after the last used slot,
    /// growing the directory when it is full.
    fn insert_records(
        &mut self,
        loc: DirLoc,
        mut listing: DirListing,
        records: &[u8],
    ) -> FsInjectorResult {
        let needed = records.len() / FAT_DIR_ENTRY_SIZE as usize;
        while listing.used + needed > listing.slots.len() {
            match loc {
                DirLoc::Root16 => return Err(FsInjectorError::TooManyEntries),
                DirLoc::Cluster(first) => {
                    let cluster = self.extend_dir(first)?;
                    listing.slots.extend(self.cluster_slots(cluster));
                }
            }
        }
        for (record, &off) in records
            .chunks_exact(FAT_DIR_ENTRY_SIZE as usize)
            .zip(&listing.slots[listing.used..])
        {
            self.image.write_at(off, record)?;
        }
        Ok(())
    }

    // === Content ===

    fn create_dir(&mut self, parent: DirLoc, stamp: (u16, u16)) -> FsInjectorResult<u32> {
        let cluster = self.alloc.allocate_unit()? as u32;
        self.fat_set(cluster, self.meta.eoc())?;

        // `..` of a root child points to cluster 0
        let parent_cluster = match parent {
            DirLoc::Cluster(c) if c != FAT32_ROOT_CLUSTER || self.meta.fat_type == FatType::Fat16 => c,
            _ => 0,
        };
        let mut buf = Vec::with_capacity(2 * FAT_DIR_ENTRY_SIZE as usize);
        FatDirEntry::new(*FAT_DOT_NAME, FatAttributes::DIRECTORY, cluster, 0, stamp)
            .to_raw_buffer(&mut buf);
        FatDirEntry::new(
            *FAT_DOTDOT_NAME,
            FatAttributes::DIRECTORY,
            parent_cluster,
            0,
            stamp,
        )
        .to_raw_buffer(&mut buf);
        self.image.write_at(self.meta.cluster_offset(cluster), &buf)?;
        Ok(cluster)
    }

    fn write_content(&mut self, data: &[u8]) -> FsInjectorResult<u32> {
        if data.is_empty() {
            return Ok(0);
        }
        let count = (data.len() as u64).div_ceil(FAT_CLUSTER_SIZE);
        let run = self.alloc.allocate_run(count)?;
        self.image
            .write_at(self.meta.cluster_offset(run.first as u32), data)?;
        for cluster in run.units() {
            let next = if cluster == run.last() {
                self.meta.eoc()
            } else {
                cluster as u32 + 1
            };
            self.fat_set(cluster as u32, next)?;
        }
        Ok(run.first as u32)
    }

    fn write_fsinfo(&mut self) -> ImgIOResult {
        let (free, next) = match self.free_clusters() {
            Ok(free) => (free, self.alloc.next_free() as u32),
            Err(_) => (u32::MAX, u32::MAX),
        };
        let next = if next > self.meta.max_cluster() {
            u32::MAX
        } else {
            next
        };
        self.image.write_struct(
            FAT_FSINFO_SECTOR as u64 * FAT_SECTOR_SIZE as u64,
            &FatFsInfo::new(free, next),
        )
    }

    /// Counts zero entries in the first FAT.
    fn free_clusters(&self) -> ImgIOResult<u32> {
        let entry = self.meta.entry_size() as usize;
        let first = FAT_FIRST_CLUSTER as u64 * entry as u64;
        let table = self.image.bytes(
            self.meta.fat_offset(0) + first,
            self.meta.clusters as usize * entry,
        )?;
        Ok(table
            .chunks_exact(entry)
            .filter(|e| e.iter().all(|&b| b == 0))
            .count() as u32)
    }
}

impl FsDriver for FatDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        let capacity = capacity.ok_or(FsFormatterError::PartitionOnly)?;
        let meta = FatMeta::new(capacity)?;
        let image = ImageBuf::zeroed(capacity.bytes()).map_err(FsFormatterError::from)?;
        let alloc = LinearAllocator::new(
            meta.first_free_cluster() as u64,
            meta.max_cluster() as u64,
        );

        let mut driver = Self {
            image,
            meta,
            alloc,
            lfn_count: 1,
        };
        driver.format()?;

        tracing::debug!(
            fat = ?meta.fat_type,
            sectors = meta.total_sectors,
            clusters = meta.clusters,
            sectors_per_fat = meta.sectors_per_fat,
            "FAT volume formatted"
        );
        Ok(driver)
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        if !matches!(entry.kind, EntryKind::Regular | EntryKind::Directory) {
            tracing::warn!(path = %entry.path, kind = ?entry.kind, "FAT cannot store this entry, skipped");
            return Ok(());
        }
        let name = entry.name();
        if name.is_empty() {
            return Ok(());
        }
        crate::ensure!(
            is_valid_long_name(name),
            FsInjectorError::Invalid("Invalid FAT file name")
        );
        tracing::trace!(path = %entry.path, size = entry.size(), "fat add");

        let parent = self.resolve_dir(entry.parent())?;
        let listing = self.list_dir(parent)?;
        if let Some(existing) = listing.find(name) {
            if existing.entry.is_dir() && entry.is_dir() {
                return Ok(());
            }
            crate::bail!(FsInjectorError::AlreadyExists);
        }

        let size = u32::try_from(entry.size()).map_err(|_| FsInjectorError::TooBig)?;
        let stamp = fat_datetime(entry.mtime);
        let cluster = if entry.is_dir() {
            self.create_dir(parent, stamp)?
        } else {
            self.write_content(&entry.data)?
        };

        let mut buf = Vec::new();
        let short = match exact_short_name(name) {
            Some(short) => short,
            None => {
                let alias = lfn_alias(self.lfn_count);
                self.lfn_count += 1;
                for record in lfn_entries(name, &alias)? {
                    record.to_raw_buffer(&mut buf);
                }
                alias
            }
        };
        FatDirEntry::new(
            short,
            FatAttributes::for_entry(entry.is_dir(), entry.mode),
            cluster,
            if entry.is_dir() { 0 } else { size },
            stamp,
        )
        .to_raw_buffer(&mut buf);

        self.insert_records(parent, listing, &buf)?;
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        if self.meta.fat_type == FatType::Fat32 {
            self.write_fsinfo()?;
            let sector = FAT_SECTOR_SIZE as u64;
            self.image.copy_within(
                0,
                FAT_VBR_BACKUP_SECTOR as u64 * sector,
                FAT_BOOT_REGION_SECTORS * sector as usize,
            )?;
        }
        tracing::debug!(
            used_clusters = self.alloc.used_units(),
            free_clusters = self.alloc.remaining_units(),
            "FAT volume closed"
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
