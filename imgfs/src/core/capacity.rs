// SPDX-License-Identifier: MIT

/// Sector size every capacity is expressed in.
pub const SECTOR_SIZE: u64 = 512;

/// Target partition handed to `open`.
///
/// Sectors are 512-byte LBAs of the final disk; `guid` is the partition's
/// unique GUID in on-disk (mixed-endian) byte order, reused as the volume
/// serial / UUID by the formats that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub first_lba: u64,
    pub last_lba: u64,
    pub guid: [u8; 16],
}

impl Capacity {
    pub fn new(first_lba: u64, last_lba: u64, guid: [u8; 16]) -> Self {
        Self {
            first_lba,
            last_lba,
            guid,
        }
    }

    /// Partition of `count` sectors starting at LBA 0. Zero sectors give an
    /// empty range.
    pub fn from_sectors(count: u64, guid: [u8; 16]) -> Self {
        match count.checked_sub(1) {
            Some(last) => Self::new(0, last, guid),
            None => Self::new(1, 0, guid),
        }
    }

    /// Partition of `bytes` bytes (rounded down to whole sectors).
    pub fn from_bytes(bytes: u64, guid: [u8; 16]) -> Self {
        Self::from_sectors(bytes / SECTOR_SIZE, guid)
    }

    #[inline]
    pub fn sectors(&self) -> u64 {
        if self.last_lba < self.first_lba {
            return 0;
        }
        self.last_lba - self.first_lba + 1
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.sectors() * SECTOR_SIZE
    }

    /// First four GUID bytes as a little-endian serial number.
    #[inline]
    pub fn serial(&self) -> u32 {
        u32::from_le_bytes([self.guid[0], self.guid[1], self.guid[2], self.guid[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sectors() {
        let c = Capacity::new(2048, 4095, [0; 16]);
        assert_eq!(c.sectors(), 2048);
        assert_eq!(c.bytes(), 1024 * 1024);
        assert_eq!(Capacity::from_bytes(4096, [0; 16]).sectors(), 8);
        assert_eq!(Capacity::from_sectors(1, [0; 16]).sectors(), 1);
    }

    #[test]
    fn test_empty() {
        assert_eq!(Capacity::from_sectors(0, [0; 16]).sectors(), 0);
        assert_eq!(Capacity::from_bytes(511, [0; 16]).bytes(), 0);
        assert_ne!(Capacity::from_sectors(0, [0; 16]), Capacity::from_sectors(1, [0; 16]));
    }

    #[test]
    fn test_serial() {
        let mut guid = [0u8; 16];
        guid[..4].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(Capacity::from_sectors(8, guid).serial(), 0x1234_5678);
    }
}
