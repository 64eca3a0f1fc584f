// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use imgfs::{Capacity, FsKind, SECTOR_SIZE};
use serde::{Deserialize, Deserializer};

use crate::layout::{error::LayoutError, size::Size};

/// One `[[image]]` table of the layout.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ImageSpec {
    pub name: String,
    #[serde(deserialize_with = "deserialize_fs")]
    pub fs: FsKind,
    pub size: Size,
    /// Host directory, relative to the layout file.
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub uuid: Option<uuid::Uuid>,
    #[serde(default)]
    pub start_lba: u64,
}

fn deserialize_fs<'de, D>(deserializer: D) -> Result<FsKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.parse()
        .map_err(|_| serde::de::Error::custom(format!("Unknown filesystem '{name}'")))
}

impl ImageSpec {
    /// Partition handed to the driver, `None` for an initrd.
    pub fn capacity(&self) -> Option<Capacity> {
        let bytes = self.size.bytes()?;
        let sectors = bytes / SECTOR_SIZE;
        let guid = self.uuid.map(|u| u.to_bytes_le()).unwrap_or_default();
        Some(Capacity::new(
            self.start_lba,
            (self.start_lba + sectors).saturating_sub(1),
            guid,
        ))
    }

    pub fn file_name(&self) -> String {
        format!("{}.img", self.name)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            anyhow::bail!(LayoutError::InvalidConfig(
                "image names must be non-empty and free of path separators"
            ));
        }

        match self.size {
            Size::Initrd if !self.fs.supports_initrd() => {
                anyhow::bail!(LayoutError::InitrdUnsupported(self.fs))
            }
            Size::Fixed(_) if !self.fs.supports_partition() => {
                anyhow::bail!(LayoutError::PartitionUnsupported(self.fs))
            }
            _ => {}
        }

        if let (Some(cap), Some(min)) = (self.capacity(), self.fs.min_sectors())
            && cap.sectors() < min
        {
            anyhow::bail!(LayoutError::SizeTooSmall(self.fs, min));
        }

        if self.size.bytes().is_some() && self.uuid.is_none() {
            anyhow::bail!(
                "Image '{}' has no UUID assigned. Did you forget to call `assign_uuids()`?",
                self.name
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(fs: FsKind, size: Size) -> ImageSpec {
        ImageSpec {
            name: "test".into(),
            fs,
            size,
            source: None,
            uuid: Some(uuid::Uuid::from_bytes([0x11; 16])),
            start_lba: 2048,
        }
    }

    #[test]
    fn test_capacity() {
        let image = spec(FsKind::Fat, Size::Fixed(4 << 20));
        let cap = image.capacity().unwrap();
        assert_eq!(cap.first_lba, 2048);
        assert_eq!(cap.sectors(), 8192);
        assert_eq!(cap.guid, [0x11; 16]);
        assert!(spec(FsKind::Tar, Size::Initrd).capacity().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(spec(FsKind::Fat, Size::Fixed(4 << 20)).validate().is_ok());
        assert!(spec(FsKind::Fat, Size::Fixed(1 << 20)).validate().is_err());
        assert!(spec(FsKind::Ext2, Size::Initrd).validate().is_err());
        assert!(spec(FsKind::Cpio, Size::Fixed(1 << 20)).validate().is_err());
        assert!(spec(FsKind::Cpio, Size::Initrd).validate().is_ok());

        let mut unnamed = spec(FsKind::Tar, Size::Initrd);
        unnamed.name = "a/b".into();
        assert!(unnamed.validate().is_err());
    }
}
