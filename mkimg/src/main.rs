// SPDX-License-Identifier: MIT

mod build;
mod layout;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use imgfs::{FsKind, SECTOR_SIZE};
use std::path::PathBuf;

use crate::layout::Layout;
use crate::utils::{LogLevel, init_logging, pretty_bytes};

#[derive(Parser)]
#[command(name = "mkimg", version, about = "Filesystem and initrd image builder", long_about = None)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Print driver debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every image listed in layout.toml
    Build {
        /// Layout path
        #[arg(short, long, default_value = "layout.toml")]
        layout: PathBuf,
        /// Directory receiving one `<name>.img` per image
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,

        /// Only print what would be done, don't write any image
        #[arg(long)]
        dry_run: bool,
    },
    /// List supported formats and their minimum sizes
    Formats,
}

fn print_formats() {
    println!("  {:<8} {:<10} {:<10} {:>12}", "FS", "initrd", "partition", "minimum");
    for kind in FsKind::ALL {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let min = kind
            .min_sectors()
            .map(|s| pretty_bytes(s * SECTOR_SIZE))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<8} {:<10} {:<10} {:>12}",
            kind.to_string(),
            yes_no(kind.supports_initrd()),
            yes_no(kind.supports_partition()),
            min
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = LogLevel::from_flags(cli.quiet, cli.verbose);
    init_logging(level);

    match cli.command {
        Commands::Build {
            layout,
            output_dir,
            dry_run,
        } => {
            let layout = Layout::from_file(&layout)?;
            layout.validate()?;
            if level != LogLevel::Quiet {
                println!("{layout}");
            }
            if dry_run {
                tracing::info!("dry run: no image will be written");
                return Ok(());
            }

            let built = build::build_all(&layout, &output_dir, level == LogLevel::Quiet)?;
            if level != LogLevel::Quiet {
                for image in &built {
                    println!(
                        "{} {} -> {} ({}, {} entries, {})",
                        "✔".green().bold(),
                        image.name.bold(),
                        image.path.display(),
                        image.fs,
                        image.entries,
                        pretty_bytes(image.bytes),
                    );
                }
            }
        }
        Commands::Formats => print_formats(),
    }

    Ok(())
}
