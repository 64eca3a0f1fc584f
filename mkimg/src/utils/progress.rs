// SPDX-License-Identifier: MIT

use indicatif::{ProgressBar, ProgressStyle};

/// Bar counting entries added to one image; hidden when `quiet`.
pub fn entries_bar(total: u64, message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.white}] {pos}/{len} entries {msg}")
    {
        pb.set_style(style.progress_chars("█░░"));
    }
    pb.set_message(message.to_string());
    pb
}
