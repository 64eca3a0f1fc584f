// SPDX-License-Identifier: MIT

//! Append-only archive formats. `add` writes each member in full, `close`
//! only appends a trailer.

#[cfg(not(feature = "std"))]
use alloc::format;

use crate::core::errors::*;

pub mod cpio;
pub mod jamesm;
pub mod tar;

pub use cpio::CpioDriver;
pub use jamesm::JamesmDriver;
pub use tar::TarDriver;

/// Archive member alignment shared by USTAR and the CPIO trailer.
pub const ARCHIVE_BLOCK: u64 = 512;

/// Writes `value` as zero-padded octal digits filling `field`.
pub(crate) fn put_octal(field: &mut [u8], value: u64) -> FsInjectorResult {
    let digits = format!("{value:0width$o}", width = field.len());
    crate::ensure!(digits.len() == field.len(), FsInjectorError::TooBig);
    field.copy_from_slice(digits.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_octal() {
        let mut field = [0u8; 7];
        put_octal(&mut field, 0o755).unwrap();
        assert_eq!(&field, b"0000755");
        let mut small = [0u8; 2];
        assert_eq!(put_octal(&mut small, 0o100), Err(FsInjectorError::TooBig));
    }
}
