// SPDX-License-Identifier: MIT

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::{error::LayoutError, image::ImageSpec, size::Size};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(skip)]
    pub base_dir: PathBuf,
    #[serde(rename = "image", default)]
    pub images: Vec<ImageSpec>,
}

impl Layout {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .canonicalize()?;
        Self::parse(&content, base_dir).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str, base_dir: PathBuf) -> anyhow::Result<Self> {
        let mut layout: Layout = toml::from_str(content)?;
        layout.base_dir = base_dir;
        layout.assign_uuids();
        Ok(layout)
    }

    /// Partitions without a UUID get a random one; initrds carry none.
    pub fn assign_uuids(&mut self) {
        for image in &mut self.images {
            if image.uuid.is_none() && image.size != Size::Initrd {
                image.uuid = Some(uuid::Uuid::new_v4());
                tracing::debug!(image = %image.name, uuid = ?image.uuid, "generated uuid");
            }
        }
    }

    /// Host directory feeding `image`, if any.
    pub fn source_dir(&self, image: &ImageSpec) -> Option<PathBuf> {
        image.source.as_ref().map(|s| self.base_dir.join(s))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.images.is_empty() {
            anyhow::bail!(LayoutError::InvalidConfig("layout has no [[image]] table"));
        }

        let mut seen = HashSet::new();
        for image in &self.images {
            if !seen.insert(image.name.as_str()) {
                anyhow::bail!(LayoutError::DuplicateName(image.name.clone()));
            }
            image.validate().with_context(|| format!("image '{}'", image.name))?;
            if let Some(dir) = self.source_dir(image)
                && !dir.is_dir()
            {
                anyhow::bail!("Image '{}' source {} is not a directory", image.name, dir.display());
            }
        }

        Ok(())
    }
}

impl core::fmt::Display for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(
            f,
            "\n  ┌────┬──────────────────────────────┬────────┬────────────┬──────────────────────┐"
        )?;
        writeln!(
            f,
            "  | Id | Name                         | FS     | Size       | Source               |"
        )?;
        writeln!(
            f,
            "  ├────┼──────────────────────────────┼────────┼────────────┼──────────────────────┤"
        )?;
        for (i, image) in self.images.iter().enumerate() {
            let source = image
                .source
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| "-".into());
            writeln!(
                f,
                "  | {i:<2} | {n:<28} | {fs:<6} | {s:>10} | {src:<20} |",
                n = crate::utils::truncate(&image.name, 28),
                fs = image.fs.to_string(),
                s = image.size.to_string(),
                src = crate::utils::truncate(&source, 20),
            )?;
        }
        writeln!(
            f,
            "  └────┴──────────────────────────────┴────────┴────────────┴──────────────────────┘"
        )
    }
}
