// SPDX-License-Identifier: MIT

use crate::core::{capacity::Capacity, errors::*};
use crate::fs::lean::constant::*;

/// Band geometry of a LeanFS volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeanMeta {
    pub sectors: u64,
    pub bands: u64,
    pub backup_super: u64,
    pub uuid: [u8; 16],
}

impl LeanMeta {
    pub fn new(capacity: &Capacity) -> FsFormatterResult<Self> {
        let sectors = capacity.sectors();
        if sectors < LEAN_MIN_SECTORS {
            return Err(FsFormatterError::BelowMinimum);
        }
        Ok(Self {
            sectors,
            bands: sectors.div_ceil(LEAN_BAND_SECTORS),
            backup_super: sectors.min(LEAN_BAND_SECTORS) - 1,
            uuid: capacity.guid,
        })
    }

    /// Band 0 keeps its bitmap after the superblock, the others at their
    /// first sector.
    #[inline]
    pub fn bitmap_sector(&self, band: u64) -> u64 {
        match band {
            0 => LEAN_BITMAP_START,
            _ => band * LEAN_BAND_SECTORS,
        }
    }

    /// Sectors of `band` inside the volume.
    #[inline]
    pub fn band_sectors(&self, band: u64) -> u64 {
        (self.sectors - band * LEAN_BAND_SECTORS).min(LEAN_BAND_SECTORS)
    }

    #[inline]
    pub fn offset(&self, sector: u64) -> u64 {
        sector * LEAN_SECTOR_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        let cap = |n| Capacity::from_sectors(n, [1; 16]);
        assert_eq!(LeanMeta::new(&cap(LEAN_MIN_SECTORS - 1)), Err(FsFormatterError::BelowMinimum));

        let small = LeanMeta::new(&cap(64)).unwrap();
        assert_eq!((small.bands, small.backup_super), (1, 63));

        let big = LeanMeta::new(&cap(10_000)).unwrap();
        assert_eq!(big.bands, 3);
        assert_eq!(big.backup_super, 4095);
        assert_eq!(big.bitmap_sector(0), 33);
        assert_eq!(big.bitmap_sector(2), 8192);
        assert_eq!(big.band_sectors(2), 10_000 - 8192);
    }
}
