// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod errors;
#[macro_use]
mod macros;

// Backend modules
#[cfg(feature = "alloc")]
mod image;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::ImgIO;
    pub use super::ImgIOExt;
    pub use super::ImgIOStructExt;
    pub use super::errors::*;

    #[cfg(feature = "alloc")]
    pub use super::image::ImageBuf;
}

use errors::*;

/// Size of the scratch buffer used by chunked helpers.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Byte-addressed image storage.
///
/// Offsets are always relative to the first byte of the volume under
/// construction. Implementations decide whether writing past the end grows
/// the storage or fails with [`ImgIOError::OutOfBounds`].
pub trait ImgIO {
    /// Writes `data` at `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> ImgIOResult;

    /// Reads `buf.len()` bytes from `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ImgIOResult;

    /// Current logical length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes buffered data (no-op for memory backends).
    fn flush(&mut self) -> ImgIOResult {
        Ok(())
    }
}

/// Convenience helpers layered over [`ImgIO`].
pub trait ImgIOExt: ImgIO {
    /// Fills `len` bytes at `offset` with zeroes.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: usize) -> ImgIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Copies `len` bytes from `src` to `dst` inside the same image.
    ///
    /// Used for mirrored metadata (backup boot sectors, backup superblocks).
    fn copy_within(&mut self, src: u64, dst: u64, len: usize) -> ImgIOResult {
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        let mut done = 0usize;
        while done < len {
            let chunk = (len - done).min(BLOCK_BUF_SIZE);
            self.read_at(src + done as u64, &mut buf[..chunk])?;
            self.write_at(dst + done as u64, &buf[..chunk])?;
            done += chunk;
        }
        Ok(())
    }

    // Implements read/write helpers for primitive types
    imgio_impl_primitive_rw!(u8, u16, u32, u64);
}

impl<T: ImgIO + ?Sized> ImgIOExt for T {}

/// Reads and writes on-disk structures through zerocopy.
pub trait ImgIOStructExt: ImgIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &self,
        offset: u64,
    ) -> ImgIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(ImgIOError::Invalid("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| ImgIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> ImgIOResult {
        self.write_at(offset, val.as_bytes())
    }
}

impl<T: ImgIO + ?Sized> ImgIOStructExt for T {}
