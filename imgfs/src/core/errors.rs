// SPDX-License-Identifier: MIT

use core::fmt;

pub use imgio::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAllocatorError {
    /// No free cluster/block/zone/sector left.
    OutOfBlocks,
    /// No free inode or file id left.
    OutOfInodes,
    Other(&'static str),
}

impl FsAllocatorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsAllocatorError::OutOfBlocks => "Out of blocks",
            FsAllocatorError::OutOfInodes => "Out of inodes",
            FsAllocatorError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsAllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())
    }
}

/// Errors raised while laying out a fresh volume in `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFormatterError {
    IO(ImgIOError),
    /// Requested capacity is below the format's floor.
    BelowMinimum,
    /// The format only produces unbounded initrd archives.
    InitrdOnly,
    /// The format needs a partition capacity.
    PartitionOnly,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsFormatterError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFormatterError::IO(_) => "IO error",
            FsFormatterError::BelowMinimum => "Partition too small for this filesystem",
            FsFormatterError::InitrdOnly => "Filesystem can only be used as initrd",
            FsFormatterError::PartitionOnly => "Filesystem cannot be used as initrd",
            FsFormatterError::Invalid(msg) => msg,
            FsFormatterError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFormatterError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsFormatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

/// Errors raised while adding an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsInjectorError {
    IO(ImgIOError),
    Allocator(FsAllocatorError),
    /// A fixed-size directory or entry table is full.
    TooManyEntries,
    /// The object exceeds what the format can address.
    TooBig,
    ParentNotFound,
    NotADirectory,
    AlreadyExists,
    NameTooLong,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsInjectorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsInjectorError::IO(_) => "IO error",
            FsInjectorError::Allocator(_) => "Allocator error",
            FsInjectorError::TooManyEntries => "Too many directory entries",
            FsInjectorError::TooBig => "File too big",
            FsInjectorError::ParentNotFound => "Parent directory not found",
            FsInjectorError::NotADirectory => "Path component is not a directory",
            FsInjectorError::AlreadyExists => "Entry already exists",
            FsInjectorError::NameTooLong => "Name too long",
            FsInjectorError::Invalid(msg) => msg,
            FsInjectorError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsInjectorError::IO(e) => Some(FsError::IO(*e)),
            FsInjectorError::Allocator(e) => Some(FsError::Allocator(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsInjectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(ImgIOError),
    Allocator(FsAllocatorError),
    Formatter(FsFormatterError),
    Injector(FsInjectorError),
    Other(&'static str),
}

/// Uniform classification shared by every driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    OutOfSpace,
    TooManyEntries,
    TooBig,
    OutOfMemory,
    BelowMinimum,
    Unsupported,
    Invalid,
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Allocator(e) => e.msg(),
            FsError::Formatter(e) => e.msg(),
            FsError::Injector(e) => e.msg(),
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsError::Formatter(e) => e.source(),
            FsError::Injector(e) => e.source(),
            FsError::IO(_) | FsError::Allocator(_) | FsError::Other(_) => None,
        }
    }

    pub fn kind(&self) -> FsErrorKind {
        fn io_kind(e: &ImgIOError) -> FsErrorKind {
            match e {
                ImgIOError::OutOfMemory => FsErrorKind::OutOfMemory,
                ImgIOError::OutOfBounds => FsErrorKind::OutOfSpace,
                _ => FsErrorKind::Invalid,
            }
        }

        match self {
            FsError::IO(e) => io_kind(e),
            FsError::Allocator(_) => FsErrorKind::OutOfSpace,
            FsError::Formatter(e) => match e {
                FsFormatterError::IO(e) => io_kind(e),
                FsFormatterError::BelowMinimum => FsErrorKind::BelowMinimum,
                FsFormatterError::InitrdOnly | FsFormatterError::PartitionOnly => {
                    FsErrorKind::Unsupported
                }
                _ => FsErrorKind::Invalid,
            },
            FsError::Injector(e) => match e {
                FsInjectorError::IO(e) => io_kind(e),
                FsInjectorError::Allocator(_) => FsErrorKind::OutOfSpace,
                FsInjectorError::TooManyEntries => FsErrorKind::TooManyEntries,
                FsInjectorError::TooBig => FsErrorKind::TooBig,
                _ => FsErrorKind::Invalid,
            },
            FsError::Other(_) => FsErrorKind::Invalid,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsAllocatorResult<T = ()> = Result<T, FsAllocatorError>;
pub type FsFormatterResult<T = ()> = Result<T, FsFormatterError>;
pub type FsInjectorResult<T = ()> = Result<T, FsInjectorError>;

crate::fs_error_wiring! {
    top => FsError {
        ImgIOError       : IO,
        FsAllocatorError : Allocator,
        FsFormatterError : Formatter,
        FsInjectorError  : Injector,
    },
    str_into => [
        FsAllocatorError,
        FsFormatterError,
        FsInjectorError,
    ],
    sub => {
        ImgIOError       => [ FsFormatterError::IO, FsInjectorError::IO ],
        FsAllocatorError => [ FsInjectorError::Allocator ],
    },
}
