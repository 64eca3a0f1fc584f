// SPDX-License-Identifier: MIT

//! ext2 revision 1, 4 KiB blocks, no optional features besides `filetype`.

pub mod constant;
pub mod driver;
pub mod meta;
pub mod types;

pub use driver::{Ext2Driver, check_file_size};
pub use meta::Ext2Meta;
