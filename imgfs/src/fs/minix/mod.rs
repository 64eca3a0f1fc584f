// SPDX-License-Identifier: MIT

//! Minix V3 (4 KiB blocks, 60-byte names).

pub mod constant;
pub mod driver;
pub mod meta;
pub mod types;

pub use driver::MinixDriver;
pub use meta::MinixMeta;
