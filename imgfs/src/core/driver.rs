// SPDX-License-Identifier: MIT

use imgio::prelude::ImageBuf;

use crate::core::{capacity::Capacity, entry::Entry, errors::FsResult};

/// The three-step contract every format implements.
///
/// A session is `open` once, `add` once per entry (parents before their
/// children), then `close`. Drivers keep no in-memory directory tree: each
/// `add` resolves the parent by walking the records already written to the
/// image. `close` only recomputes summary fields from the image, so calling
/// it more than once yields the same bytes.
///
/// Entry kinds a format cannot represent are skipped and `add` returns `Ok`.
/// Every other failure is fatal for the image being built.
pub trait FsDriver: Sized {
    /// Lays out an empty volume.
    ///
    /// `None` requests an unbounded initrd image; formats that need a fixed
    /// geometry reject it, archive-only formats reject `Some`.
    fn open(capacity: Option<&Capacity>) -> FsResult<Self>;

    /// Writes one entry.
    fn add(&mut self, entry: &Entry) -> FsResult;

    /// Finalizes free counts, checksums and backup copies.
    fn close(&mut self) -> FsResult;

    /// Borrows the image under construction.
    fn image(&self) -> &ImageBuf;

    /// Releases the image buffer.
    fn into_image(self) -> ImageBuf;
}
