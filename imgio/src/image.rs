// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use crate::{ImgIO, ImgIOError, ImgIOResult};

/// Owned, growable image buffer.
///
/// Fixed-geometry formats create it pre-sized with [`ImageBuf::zeroed`]; the
/// limit then equals the volume size and any write past it fails.
/// Append-style formats start from [`ImageBuf::new`] and grow on demand,
/// optionally bounded by [`ImageBuf::with_limit`].
#[derive(Debug, Default, Clone)]
pub struct ImageBuf {
    data: Vec<u8>,
    limit: Option<u64>,
}

impl ImageBuf {
    /// Empty, unbounded buffer.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            limit: None,
        }
    }

    /// Empty buffer that may grow up to `limit` bytes.
    #[inline]
    pub fn with_limit(limit: u64) -> Self {
        Self {
            data: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Zero-filled buffer of exactly `len` bytes, limited to that size.
    pub fn zeroed(len: u64) -> ImgIOResult<Self> {
        let mut buf = Self::with_limit(len);
        buf.resize(len)?;
        Ok(buf)
    }

    #[inline]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Grows (zero-filled) or truncates the logical length.
    pub fn resize(&mut self, new_len: u64) -> ImgIOResult {
        if self.limit.is_some_and(|l| new_len > l) {
            return Err(ImgIOError::OutOfBounds);
        }
        let new_len = usize::try_from(new_len).map_err(|_| ImgIOError::OutOfMemory)?;
        if new_len > self.data.len() {
            self.data
                .try_reserve(new_len - self.data.len())
                .map_err(|_| ImgIOError::OutOfMemory)?;
        }
        self.data.resize(new_len, 0);
        Ok(())
    }

    /// Appends `data` at the logical end and returns the offset it was written at.
    pub fn append(&mut self, data: &[u8]) -> ImgIOResult<u64> {
        let offset = self.data.len() as u64;
        self.write_at(offset, data)?;
        Ok(offset)
    }

    /// Zero-pads the logical length up to a multiple of `align`.
    pub fn pad_to(&mut self, align: u64) -> ImgIOResult {
        let len = self.data.len() as u64;
        if align > 1 && len % align != 0 {
            self.resize(len.div_ceil(align) * align)?;
        }
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Borrows `len` bytes at `offset`.
    pub fn bytes(&self, offset: u64, len: usize) -> ImgIOResult<&[u8]> {
        let (start, end) = self.range(offset, len)?;
        Ok(&self.data[start..end])
    }

    /// Mutably borrows `len` bytes at `offset`.
    pub fn bytes_mut(&mut self, offset: u64, len: usize) -> ImgIOResult<&mut [u8]> {
        let (start, end) = self.range(offset, len)?;
        Ok(&mut self.data[start..end])
    }

    /// Consumes the buffer, returning the image bytes.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn range(&self, offset: u64, len: usize) -> ImgIOResult<(usize, usize)> {
        let start = usize::try_from(offset).map_err(|_| ImgIOError::OutOfBounds)?;
        let end = start.checked_add(len).ok_or(ImgIOError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(ImgIOError::OutOfBounds);
        }
        Ok((start, end))
    }
}

impl ImgIO for ImageBuf {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> ImgIOResult {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(ImgIOError::OutOfBounds)?;
        if end > self.data.len() as u64 {
            self.resize(end)?;
        }
        let start = offset as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ImgIOResult {
        let (start, end) = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    #[inline]
    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}
