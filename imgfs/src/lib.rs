#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
extern crate alloc;

// Core Modules
pub mod core;
pub mod fs;

// Reusable types and traits
pub use core::traits::*;
pub use core::{Capacity, Entry, EntryKind, FsError, FsErrorKind, FsResult, SECTOR_SIZE};

// Utilities
pub use core::utils::path_utils::*;
#[cfg(feature = "std")]
pub use core::walk::{HostWalker, walk_dir};

// Filesystem APIs
pub use fs::{Driver, FsKind, build_image};

/// FAT16/FAT32 with long file names.
pub mod fat {
    pub use super::fs::fat::{FatDriver, FatMeta, FatType};
}

/// ext2 revision 1.
pub mod ext2 {
    pub use super::fs::ext2::{Ext2Driver, Ext2Meta, check_file_size};
}

/// Minix V3.
pub mod minix {
    pub use super::fs::minix::{MinixDriver, MinixMeta};
}

/// LeanFS 0.7.
pub mod lean {
    pub use super::fs::lean::{LeanDriver, LeanMeta};
}

/// FS/Z 1.0.
pub mod fsz {
    pub use super::fs::fsz::FszDriver;
}

/// echfs.
pub mod echfs {
    pub use super::fs::echfs::{EchMeta, EchfsDriver};
}

/// USTAR, CPIO odc and jamesm initrd archives.
pub mod archive {
    pub use super::fs::archive::{CpioDriver, JamesmDriver, TarDriver};
}
