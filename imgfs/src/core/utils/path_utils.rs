// SPDX-License-Identifier: MIT

//! Path helpers shared by every driver's resolver.
//!
//! Paths are always `/`-separated and relative to the volume root.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Normalizes a path: backslashes become `/`, empty and `.` segments are dropped,
/// leading and trailing slashes are removed.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for part in path.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

/// Splits a path into its non-empty components.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty()).collect()
}

/// Splits a normalized path into `(parent, name)`.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Joins two path components with exactly one `/`.
pub fn join_paths(base: &str, part: &str) -> String {
    let base = base.trim_end_matches('/');
    let part = part.trim_start_matches('/');
    if base.is_empty() {
        return String::from(part);
    }
    let mut out = String::with_capacity(base.len() + part.len() + 1);
    out.push_str(base);
    out.push('/');
    out.push_str(part);
    out
}
