// SPDX-License-Identifier: MIT

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FatAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0F;
    }
}

impl FatAttributes {
    /// Attributes for a stored entry: directories get `DIRECTORY`, files
    /// `ARCHIVE`, and entries without any owner write bit become read-only.
    pub fn for_entry(is_dir: bool, mode: u32) -> Self {
        let mut attr = if is_dir {
            FatAttributes::DIRECTORY
        } else {
            FatAttributes::ARCHIVE
        };
        if !is_dir && mode & 0o200 == 0 {
            attr |= FatAttributes::READ_ONLY;
        }
        attr
    }

    #[inline]
    pub fn is_lfn(bits: u8) -> bool {
        bits & 0x3F == FatAttributes::LFN.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_for_entry() {
        assert_eq!(FatAttributes::for_entry(true, 0o555), FatAttributes::DIRECTORY);
        assert_eq!(FatAttributes::for_entry(false, 0o644), FatAttributes::ARCHIVE);
        assert_eq!(
            FatAttributes::for_entry(false, 0o444).bits(),
            FatAttributes::ARCHIVE.bits() | FatAttributes::READ_ONLY.bits()
        );
        assert!(FatAttributes::is_lfn(0x0F));
        assert!(!FatAttributes::is_lfn(0x10));
    }
}
