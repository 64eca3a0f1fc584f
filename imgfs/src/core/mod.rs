// SPDX-License-Identifier: MIT

// === Sub-modules ===
pub mod allocator;
pub mod capacity;
pub mod driver;
pub mod entry;
pub mod errors;
pub mod macros;
pub mod utils;
#[cfg(feature = "std")]
pub mod walk;

// === Core Traits ===
pub mod traits {
    pub use super::allocator::{FsAllocator, LinearAllocator, UnitRun};
    pub use super::driver::FsDriver;
}

// === Core types ===
pub use capacity::{Capacity, SECTOR_SIZE};
pub use entry::{Entry, EntryKind};
pub use errors::*;

// === Utilities ===
pub use utils::{bitmap::BitmapOps, path_utils::*, time_utils::*};

// === Standard-only extensions ===
#[cfg(feature = "std")]
pub use walk::{HostWalker, walk_dir};
