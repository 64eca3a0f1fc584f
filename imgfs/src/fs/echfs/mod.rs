// SPDX-License-Identifier: MIT

//! echfs: a flat table of 256-byte entries, each naming its parent
//! directory by id, and a 64-bit allocation table chaining data blocks.

pub mod constant;
pub mod driver;
pub mod meta;
pub mod types;

pub use driver::EchfsDriver;
pub use meta::EchMeta;
