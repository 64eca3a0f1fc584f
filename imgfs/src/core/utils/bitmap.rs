// SPDX-License-Identifier: MIT

//! Allocation bitmap helpers.
//!
//! ext2, Minix and LeanFS keep their allocation bitmaps inside the image
//! itself; these helpers operate directly on those byte slices. Bit 0 is the
//! least significant bit of byte 0.

pub trait BitmapOps {
    /// Sets or clears a bit. Out-of-range bits are ignored.
    fn set_bit(&mut self, bit: usize, value: bool);

    /// Out-of-range bits read as clear.
    fn get_bit(&self, bit: usize) -> bool;

    /// Sets every bit in `[start, end)`.
    fn set_range(&mut self, start: usize, end: usize);

    /// First clear bit in `[start, end)`.
    fn first_clear(&self, start: usize, end: usize) -> Option<usize>;

    /// Number of set bits in `[start, end)`.
    fn count_set(&self, start: usize, end: usize) -> usize;
}

impl BitmapOps for [u8] {
    #[inline]
    fn set_bit(&mut self, bit: usize, value: bool) {
        if let Some(byte) = self.get_mut(bit / 8) {
            let mask = 1u8 << (bit % 8);
            if value {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    #[inline]
    fn get_bit(&self, bit: usize) -> bool {
        self.get(bit / 8).is_some_and(|b| b & (1 << (bit % 8)) != 0)
    }

    fn set_range(&mut self, start: usize, end: usize) {
        for bit in start..end {
            self.set_bit(bit, true);
        }
    }

    fn first_clear(&self, start: usize, end: usize) -> Option<usize> {
        let end = end.min(self.len() * 8);
        let mut bit = start;
        while bit < end {
            // Skip whole bytes that are full
            if bit % 8 == 0 && bit + 8 <= end && self[bit / 8] == 0xFF {
                bit += 8;
                continue;
            }
            if !self.get_bit(bit) {
                return Some(bit);
            }
            bit += 1;
        }
        None
    }

    fn count_set(&self, start: usize, end: usize) -> usize {
        (start..end).filter(|&b| self.get_bit(b)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_bit() {
        let mut bitmap = [0u8; 4];
        bitmap.set_bit(0, true);
        bitmap.set_bit(7, true);
        bitmap.set_bit(8, true);
        assert_eq!(bitmap, [0b1000_0001, 0b0000_0001, 0, 0]);

        bitmap.set_bit(0, false);
        assert!(!bitmap.get_bit(0));
        assert!(bitmap.get_bit(8));

        // Out of range is a no-op
        bitmap.set_bit(100, true);
        assert!(!bitmap.get_bit(100));
    }

    #[test]
    fn test_first_clear_and_count() {
        let mut bitmap = [0u8; 4];
        bitmap.set_range(0, 11);
        assert_eq!(bitmap.first_clear(0, 32), Some(11));
        assert_eq!(bitmap.first_clear(0, 11), None);
        assert_eq!(bitmap.count_set(0, 32), 11);
        assert_eq!(bitmap.count_set(8, 16), 3);

        let full = [0xFFu8; 2];
        assert_eq!(full.first_clear(0, 64), None);
    }
}
