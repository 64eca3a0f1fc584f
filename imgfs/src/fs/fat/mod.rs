// SPDX-License-Identifier: MIT

//! FAT16/FAT32 with long file names.
//!
//! One sector per cluster; the variant follows from the cluster count
//! alone. Long-named entries carry a `~NNNNNNNLFN` placeholder alias.

pub mod attr;
pub mod constant;
pub mod driver;
pub mod meta;
pub mod types;
pub mod utils;

pub use driver::FatDriver;
pub use meta::{FatMeta, FatType};
