// SPDX-License-Identifier: MIT

pub use crate::core::errors::{FsAllocatorError, FsAllocatorResult};

/// Handle to a run of consecutive allocation units.
///
/// Units are format-relative indices (cluster, block, sector); the driver
/// turns them into byte offsets through its own geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRun {
    pub first: u64,
    pub count: u64,
}

impl UnitRun {
    #[inline]
    pub fn last(&self) -> u64 {
        self.first + self.count.saturating_sub(1)
    }

    pub fn units(&self) -> impl Iterator<Item = u64> {
        self.first..self.first + self.count
    }
}

/// Allocation of logical units in a filesystem.
pub trait FsAllocator {
    /// Allocates `count` consecutive units.
    fn allocate_run(&mut self, count: u64) -> FsAllocatorResult<UnitRun>;

    /// Allocates a single unit.
    fn allocate_unit(&mut self) -> FsAllocatorResult<u64> {
        Ok(self.allocate_run(1)?.first)
    }

    /// Number of units handed out so far.
    fn used_units(&self) -> u64;

    /// Number of units still available.
    fn remaining_units(&self) -> u64;
}

/// Bump allocator over `[first, last]`.
///
/// Write-once images never free units, so a single cursor is enough for the
/// chained formats (FAT clusters, echfs blocks).
#[derive(Debug, Clone)]
pub struct LinearAllocator {
    first: u64,
    last: u64,
    next_free: u64,
}

impl LinearAllocator {
    pub fn new(first: u64, last: u64) -> Self {
        Self {
            first,
            last,
            next_free: first,
        }
    }

    /// Next unit that would be handed out.
    #[inline]
    pub fn next_free(&self) -> u64 {
        self.next_free
    }
}

impl FsAllocator for LinearAllocator {
    fn allocate_run(&mut self, count: u64) -> FsAllocatorResult<UnitRun> {
        if count == 0 {
            return Ok(UnitRun {
                first: self.next_free,
                count: 0,
            });
        }
        let end = self
            .next_free
            .checked_add(count - 1)
            .ok_or(FsAllocatorError::OutOfBlocks)?;
        if end > self.last {
            return Err(FsAllocatorError::OutOfBlocks);
        }
        let run = UnitRun {
            first: self.next_free,
            count,
        };
        self.next_free = end + 1;
        Ok(run)
    }

    fn used_units(&self) -> u64 {
        self.next_free - self.first
    }

    fn remaining_units(&self) -> u64 {
        (self.last + 1).saturating_sub(self.next_free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_runs() {
        let mut alloc = LinearAllocator::new(3, 10);
        let run = alloc.allocate_run(4).unwrap();
        assert_eq!((run.first, run.last()), (3, 6));
        assert_eq!(alloc.allocate_unit().unwrap(), 7);
        assert_eq!(alloc.used_units(), 5);
        assert_eq!(alloc.remaining_units(), 3);
        assert_eq!(alloc.allocate_run(4), Err(FsAllocatorError::OutOfBlocks));
        assert_eq!(alloc.allocate_run(3).unwrap().last(), 10);
        assert_eq!(alloc.remaining_units(), 0);
    }
}
