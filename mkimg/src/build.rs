// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use imgfs::{Driver, Entry, FsKind, walk_dir};

use crate::layout::{ImageSpec, Layout};
use crate::utils::entries_bar;

#[derive(Debug)]
pub struct BuiltImage {
    pub name: String,
    pub fs: FsKind,
    pub path: PathBuf,
    pub bytes: u64,
    pub entries: usize,
}

fn collect_entries(layout: &Layout, image: &ImageSpec) -> anyhow::Result<Vec<Entry>> {
    match layout.source_dir(image) {
        Some(dir) => walk_dir(&dir).with_context(|| format!("walking {}", dir.display())),
        None => Ok(Vec::new()),
    }
}

/// Runs one driver session and writes `<out_dir>/<name>.img`.
///
/// Partition images are written at their full declared size.
pub fn build_one(
    layout: &Layout,
    image: &ImageSpec,
    out_dir: &Path,
    quiet: bool,
) -> anyhow::Result<BuiltImage> {
    let entries = collect_entries(layout, image)?;
    let capacity = image.capacity();
    tracing::debug!(image = %image.name, fs = %image.fs, entries = entries.len(), "building");

    let mut driver = Driver::open(image.fs, capacity.as_ref())
        .with_context(|| format!("formatting '{}' as {}", image.name, image.fs))?;

    let pb = entries_bar(entries.len() as u64, &image.name, quiet);
    for entry in &entries {
        driver
            .add(entry)
            .with_context(|| format!("adding '{}' to '{}'", entry.path, image.name))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    driver
        .close()
        .with_context(|| format!("finalizing '{}'", image.name))?;
    let mut buf = driver.into_image();
    if let Some(cap) = capacity {
        buf.resize(cap.bytes())?;
    }

    let path = out_dir.join(image.file_name());
    fs::write(&path, buf.as_slice()).with_context(|| format!("writing {}", path.display()))?;

    Ok(BuiltImage {
        name: image.name.clone(),
        fs: image.fs,
        path,
        bytes: buf.as_slice().len() as u64,
        entries: entries.len(),
    })
}

pub fn build_all(layout: &Layout, out_dir: &Path, quiet: bool) -> anyhow::Result<Vec<BuiltImage>> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    layout
        .images
        .iter()
        .map(|image| build_one(layout, image, out_dir, quiet))
        .collect()
}
