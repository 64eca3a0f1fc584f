// SPDX-License-Identifier: MIT

use imgio::prelude::*;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::core::{
    capacity::Capacity,
    driver::FsDriver,
    entry::{Entry, EntryKind},
    errors::*,
};

pub const JAMESM_MAX_FILES: u32 = 64;
pub const JAMESM_MAGIC: u8 = 0xBF;
pub const JAMESM_NAME_LEN: usize = 64;
pub const JAMESM_SLOT_SIZE: u64 = 73;
pub const JAMESM_HEADER_SIZE: u64 = 4 + JAMESM_MAX_FILES as u64 * JAMESM_SLOT_SIZE;

/// One slot of the fixed header table.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct JamesmSlot {
    pub magic: u8,
    pub name: [u8; JAMESM_NAME_LEN],
    /// Absolute offset of the content in the archive.
    pub offset: u32,
    pub length: u32,
}

/// James Molloy's tutorial initrd: a file count, 64 header slots, then the
/// file contents back to back. Flat; the full path is the name.
#[derive(Debug)]
pub struct JamesmDriver {
    image: ImageBuf,
}

impl JamesmDriver {
    fn count(&self) -> ImgIOResult<u32> {
        self.image.read_u32_at(0)
    }
}

impl FsDriver for JamesmDriver {
    fn open(capacity: Option<&Capacity>) -> FsResult<Self> {
        crate::ensure!(capacity.is_none(), FsFormatterError::InitrdOnly);
        let mut image = ImageBuf::new();
        image.resize(JAMESM_HEADER_SIZE).map_err(FsFormatterError::from)?;
        Ok(Self { image })
    }

    fn add(&mut self, entry: &Entry) -> FsResult {
        if entry.kind != EntryKind::Regular || entry.data.is_empty() {
            tracing::debug!(path = %entry.path, "jamesm stores non-empty regular files only, skipped");
            return Ok(());
        }
        let name = entry.path.as_bytes();
        crate::ensure!(name.len() < JAMESM_NAME_LEN, FsInjectorError::NameTooLong);
        let count = self.count()?;
        crate::ensure!(count < JAMESM_MAX_FILES, FsInjectorError::TooManyEntries);
        let length = u32::try_from(entry.size()).map_err(|_| FsInjectorError::TooBig)?;

        let offset = self.image.append(&entry.data)?;
        let offset = u32::try_from(offset).map_err(|_| FsInjectorError::TooBig)?;
        let mut slot = JamesmSlot {
            magic: JAMESM_MAGIC,
            name: [0; JAMESM_NAME_LEN],
            offset,
            length,
        };
        slot.name[..name.len()].copy_from_slice(name);
        self.image.write_struct(4 + count as u64 * JAMESM_SLOT_SIZE, &slot)?;
        self.image.write_u32_at(0, count + 1)?;
        tracing::trace!(path = %entry.path, offset, length, "jamesm add");
        Ok(())
    }

    fn close(&mut self) -> FsResult {
        tracing::debug!(files = self.count()?, "jamesm archive closed");
        Ok(())
    }

    fn image(&self) -> &ImageBuf {
        &self.image
    }

    fn into_image(self) -> ImageBuf {
        self.image
    }
}
