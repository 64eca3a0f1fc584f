// SPDX-License-Identifier: MIT

//! LeanFS 0.7.
//!
//! The volume is cut into bands of 4096 sectors, each tracked by a one-sector
//! bitmap. An inode lives in the first sector of its own first extent and
//! its content starts in the sector after it. Indirect extent lists are not
//! written, so an object spans at most six extents.

pub mod constant;
pub mod driver;
pub mod meta;
pub mod types;

pub use driver::LeanDriver;
pub use meta::LeanMeta;
