// SPDX-License-Identifier: MIT

//! File type detection for FS/Z inodes.
//!
//! The 4-byte filetype plus the mimetype string form the full MIME type
//! (`text` + `plain` reads as `text/plain`).

use crate::fs::fsz::constant::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeInfo {
    pub filetype: &'static [u8; 4],
    pub mimetype: &'static str,
    /// Grants the owner execute access.
    pub exec: bool,
}

impl MimeInfo {
    const fn new(filetype: &'static [u8; 4], mimetype: &'static str) -> Self {
        Self {
            filetype,
            mimetype,
            exec: false,
        }
    }
}

/// Extension table, matched case-sensitively against the last `.` suffix.
const BY_EXTENSION: &[(&str, MimeInfo)] = &[
    ("h", MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")),
    ("c", MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")),
    ("md", MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")),
    ("txt", MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")),
    ("conf", MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")),
    ("htm", MimeInfo::new(FSZ_FILETYPE_TEXT, "html")),
    ("html", MimeInfo::new(FSZ_FILETYPE_TEXT, "html")),
    ("css", MimeInfo::new(FSZ_FILETYPE_TEXT, "stylesheet")),
    ("svg", MimeInfo::new(FSZ_FILETYPE_IMAGE, "svg")),
    ("gif", MimeInfo::new(FSZ_FILETYPE_IMAGE, "gif")),
    ("png", MimeInfo::new(FSZ_FILETYPE_IMAGE, "png")),
    ("jpg", MimeInfo::new(FSZ_FILETYPE_IMAGE, "jpeg")),
    ("bmp", MimeInfo::new(FSZ_FILETYPE_IMAGE, "bitmap")),
    ("sfn", MimeInfo::new(FSZ_FILETYPE_FONT, "ssfont")),
    ("psf", MimeInfo::new(FSZ_FILETYPE_FONT, "pc-screen-font")),
    ("ttf", MimeInfo::new(FSZ_FILETYPE_FONT, "sfnt")),
];

const EXEC_MAGICS: &[&[u8]] = &[b"OS/Z", b"CSBC", b"\0asm"];

fn is_executable(data: &[u8]) -> bool {
    data.get(1..4) == Some(b"ELF".as_slice()) || EXEC_MAGICS.iter().any(|m| data.starts_with(m))
}

fn is_boot_sector(data: &[u8]) -> bool {
    data.len() > 12
        && data[0] == 0x55
        && data[1] == 0xAA
        && data[3] == 0xE9
        && data[8] == b'B'
        && data[12] == b'B'
}

/// Classifies a regular file by its name and content. Execute access
/// granted by the content survives an extension match.
pub fn classify(name: &str, data: &[u8]) -> MimeInfo {
    let filetype = match is_boot_sector(data) {
        true => FSZ_FILETYPE_BOOT,
        false => FSZ_FILETYPE_APP,
    };
    let mut info = MimeInfo::new(filetype, "octet-stream");
    if is_executable(data) {
        info.mimetype = "executable";
        info.exec = true;
    }

    let ext = name.rsplit_once('.').map(|(_, ext)| ext);
    match ext {
        Some("so") => info.mimetype = "sharedlib",
        Some("sh") => {
            info = MimeInfo::new(FSZ_FILETYPE_TEXT, "shellscript");
            info.exec = true;
        }
        Some("m3d") => {
            let filetype = match data.get(1) {
                Some(b'd') => FSZ_FILETYPE_TEXT,
                _ => FSZ_FILETYPE_MODEL,
            };
            info = MimeInfo {
                exec: info.exec,
                ..MimeInfo::new(filetype, "3d-model")
            };
        }
        _ => match BY_EXTENSION.iter().find(|(e, _)| Some(*e) == ext) {
            Some((_, known)) => {
                info = MimeInfo {
                    exec: info.exec,
                    ..*known
                }
            }
            None if data.iter().all(|&b| b >= 9) => {
                info = MimeInfo {
                    exec: info.exec,
                    ..MimeInfo::new(FSZ_FILETYPE_TEXT, "plain")
                };
            }
            None => {}
        },
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        let css = classify("style.css", b"");
        assert_eq!((css.filetype, css.mimetype), (FSZ_FILETYPE_TEXT, "stylesheet"));
        let png = classify("logo.png", &[0x89, b'P', b'N', b'G', 0, 1]);
        assert_eq!((png.filetype, png.mimetype), (FSZ_FILETYPE_IMAGE, "png"));
        let sh = classify("init.sh", b"#!/bin/sh\n");
        assert!(sh.exec);
        assert_eq!(sh.mimetype, "shellscript");
        assert_eq!(classify("m.m3d", b"3dmodel").filetype, FSZ_FILETYPE_TEXT);
        assert_eq!(classify("m.m3d", b"3DMO\0").filetype, FSZ_FILETYPE_MODEL);
    }

    #[test]
    fn test_magic_bytes() {
        let elf = classify("core", b"\x7fELF\x02\x01\x01\0");
        assert_eq!((elf.filetype, elf.mimetype, elf.exec), (FSZ_FILETYPE_APP, "executable", true));
        let lib = classify("libc.so", b"\x7fELF\x02\x01\x01\0");
        assert_eq!((lib.mimetype, lib.exec), ("sharedlib", true));

        let mut boot = vec![0u8; 512];
        boot[..4].copy_from_slice(&[0x55, 0xAA, 0, 0xE9]);
        boot[8] = b'B';
        boot[12] = b'B';
        assert_eq!(classify("loader", &boot).filetype, FSZ_FILETYPE_BOOT);
    }

    #[test]
    fn test_printable_fallback() {
        let text = classify("README", b"hello world\n");
        assert_eq!((text.filetype, text.mimetype), (FSZ_FILETYPE_TEXT, "plain"));
        let blob = classify("blob", &[1, 2, 3]);
        assert_eq!((blob.filetype, blob.mimetype), (FSZ_FILETYPE_APP, "octet-stream"));
    }
}
