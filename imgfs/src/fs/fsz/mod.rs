// SPDX-License-Identifier: MIT

//! FS/Z 1.0 with 4096-byte logical sectors.
//!
//! Directories live inline in their inode sector until they hold more
//! than 23 entries, then move out like file content.
//! File content is stored inline, in one direct sector, or through a
//! sector directory, depending on its size.

pub mod constant;
pub mod driver;
pub mod mime;
pub mod types;

pub use driver::FszDriver;
