// SPDX-License-Identifier: MIT

use core::fmt;

use imgfs::FsKind;

#[derive(Debug)]
pub enum LayoutError {
    SizeTooSmall(FsKind, u64),
    InitrdUnsupported(FsKind),
    PartitionUnsupported(FsKind),
    DuplicateName(String),
    InvalidConfig(&'static str),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::SizeTooSmall(fs, sectors) => {
                write!(f, "{fs} needs at least {sectors} sectors of 512 bytes")
            }
            LayoutError::InitrdUnsupported(fs) => {
                write!(f, "{fs} cannot be built as an initrd, give it a fixed size")
            }
            LayoutError::PartitionUnsupported(fs) => {
                write!(f, "{fs} is an initrd-only format, use size = 'initrd'")
            }
            LayoutError::DuplicateName(name) => write!(f, "Duplicate image name '{name}'"),
            LayoutError::InvalidConfig(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}
