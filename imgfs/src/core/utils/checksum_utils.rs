// SPDX-License-Identifier: MIT

//! Checksums used by on-disk metadata.

/// Rolling "rotate right by one, then add" accumulator.
pub trait RollingWord: Copy + Default {
    fn roll(self, word: Self) -> Self;
}

impl RollingWord for u8 {
    #[inline(always)]
    fn roll(self, word: Self) -> Self {
        self.rotate_right(1).wrapping_add(word)
    }
}

impl RollingWord for u32 {
    #[inline(always)]
    fn roll(self, word: Self) -> Self {
        self.rotate_right(1).wrapping_add(word)
    }
}

/// Folds `words` into a rolling checksum.
#[inline]
pub fn rolling<T: RollingWord>(words: impl IntoIterator<Item = T>) -> T {
    words.into_iter().fold(T::default(), T::roll)
}

/// FAT long-name checksum over an 11-byte short name.
#[inline]
pub fn sfn_checksum(short: &[u8; 11]) -> u8 {
    rolling(short.iter().copied())
}

/// LeanFS structure checksum.
///
/// `data` is read as little-endian 32-bit words; word 0 holds the checksum
/// itself and is skipped. Trailing bytes that do not fill a word are ignored.
pub fn lean_checksum(data: &[u8]) -> u32 {
    rolling(
        data.chunks_exact(4)
            .skip(1)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]])),
    )
}

/// CRC32 with the Castagnoli polynomial as FS/Z computes it:
/// zero register, no final inversion.
///
/// `crc32c_append` inverts on entry and exit, so both are undone here.
#[inline]
pub fn crc32c_fsz(data: &[u8]) -> u32 {
    !crc32c::crc32c_append(!0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfn_checksum_matches_reference_loop() {
        let sfn = *b"~0000001LFN";
        let mut c: u8 = 0;
        for &b in &sfn {
            c = (((c & 1) << 7) | ((c & 0xFE) >> 1)).wrapping_add(b);
        }
        assert_eq!(sfn_checksum(&sfn), c);
    }

    #[test]
    fn test_lean_checksum_skips_first_word() {
        let mut data = [0u8; 16];
        data[4] = 1;
        let a = lean_checksum(&data);
        data[0] = 0xFF;
        assert_eq!(lean_checksum(&data), a);
        // word1 = 1 -> ror(0)+1 = 1, word2 = 0 -> ror(1) = 0x80000000, word3 -> 0x40000000
        assert_eq!(a, 0x4000_0000);
    }

    #[test]
    fn test_crc32c_fsz_raw_register() {
        assert_eq!(crc32c_fsz(&[]), 0);
        assert_eq!(crc32c::crc32c(b"123456789"), 0xE306_9283);
        // one byte from a zero register is a plain table lookup
        assert_eq!(crc32c_fsz(&[1]), 0xF26B_8303);
        assert_eq!(crc32c_fsz(b"123456789"), 0x58E3_FA20);
    }
}
