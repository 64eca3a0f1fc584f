// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for image buffer operations.
pub type ImgIOResult<T = ()> = core::result::Result<T, ImgIOError>;

/// Error type for image buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImgIOError {
    /// Access past the logical end, or growth past the hard limit.
    OutOfBounds,
    /// The backing allocation could not be grown.
    OutOfMemory,
    Invalid(&'static str),
    Other(&'static str),
}

impl ImgIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            ImgIOError::OutOfBounds => "Out of bounds",
            ImgIOError::OutOfMemory => "Out of memory",
            ImgIOError::Invalid(msg) => msg,
            ImgIOError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for ImgIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        ImgIOError::Other(msg)
    }
}

impl fmt::Display for ImgIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ImgIOError {}
