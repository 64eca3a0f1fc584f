// SPDX-License-Identifier: MIT

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::{
    core::{errors::*, utils::checksum_utils::sfn_checksum},
    fs::fat::{constant::*, types::FatLfnEntry},
};

/// Allowed characters in a short name (upper case only):
/// A–Z, 0–9 and !$%'-_@~`^#&(){}.
#[inline(always)]
fn is_valid_sfn_char(b: u8) -> bool {
    matches!(b,
        b'A'..=b'Z' | b'0'..=b'9' |
        b'!' | b'$' | b'%' | b'\'' | b'-' | b'_' | b'@' | b'~' | b'`' |
        b'^' | b'#' | b'&' | b'(' | b')' | b'{' | b'}'
    )
}

/// Returns the padded 8.3 form when `name` already is a valid upper-case
/// short name, `None` when it needs long-name records.
pub fn exact_short_name(name: &str) -> Option<[u8; 11]> {
    let (base, ext) = match name.split_once('.') {
        Some((base, ext)) => (base, Some(ext)),
        None => (name, None),
    };
    if base.is_empty() || base.len() > 8 {
        return None;
    }
    if let Some(ext) = ext {
        if ext.is_empty() || ext.len() > 3 {
            return None;
        }
    }
    let ext = ext.unwrap_or("");
    if !base.bytes().chain(ext.bytes()).all(is_valid_sfn_char) {
        return None;
    }

    let mut raw = [b' '; 11];
    raw[..base.len()].copy_from_slice(base.as_bytes());
    raw[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
    Some(raw)
}

/// Placeholder short name `~NNNNNNNLFN` carried by long-named entries.
pub fn lfn_alias(counter: u32) -> [u8; 11] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut raw = *b"~0000000LFN";
    for (i, slot) in raw[1..8].iter_mut().enumerate() {
        let shift = (6 - i) * 4;
        *slot = HEX[((counter >> shift) & 0xF) as usize];
    }
    raw
}

/// Characters FAT refuses in long names.
pub fn is_valid_long_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| (c as u32) < 0x20 || matches!(c, '"' | '*' | '/' | ':' | '<' | '>' | '?' | '\\' | '|'))
}

/// Long-name records for `name`, in on-disk order (highest sequence first).
pub fn lfn_entries(name: &str, alias: &[u8; 11]) -> FsInjectorResult<Vec<FatLfnEntry>> {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() > FAT_LFN_MAX_UNITS {
        return Err(FsInjectorError::NameTooLong);
    }
    let checksum = sfn_checksum(alias);
    let chunks: Vec<&[u16]> = units.chunks(FAT_LFN_CHARS).collect();
    let count = chunks.len();

    Ok(chunks
        .iter()
        .enumerate()
        .rev()
        .map(|(i, chunk)| FatLfnEntry::new((i + 1) as u8, i + 1 == count, chunk, checksum))
        .collect())
}

/// Decodes a padded 8.3 name (`README  TXT` -> `README.TXT`).
pub fn decode_sfn(raw: &[u8; 11]) -> String {
    let mut name = [0u8; 11];
    name.copy_from_slice(raw);
    if name[0] == 0x05 {
        name[0] = FAT_ENTRY_DELETED;
    }
    let base: String = name[..8]
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .into();
    let ext: String = name[8..]
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .into();
    if ext.is_empty() {
        base
    } else {
        let mut out = base;
        out.push('.');
        out.push_str(&ext);
        out
    }
}

/// Rebuilds a long name from its records in on-disk order.
pub fn decode_lfn(records: &[FatLfnEntry]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(records.len() * FAT_LFN_CHARS);
    for record in records.iter().rev() {
        units.extend(
            record
                .units()
                .iter()
                .copied()
                .take_while(|&u| u != 0 && u != 0xFFFF),
        );
    }
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
