mod batch;
mod cli;
mod finalize;
mod metadata;
mod naming;
mod scanner;
mod state;
mod transfer;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything `--json` prints: the batch report plus the directory counts and
/// where the folder ended up (`null` when the final rename failed).
#[derive(Debug, Serialize)]
struct Summary {
    #[serde(flatten)]
    report: batch::BatchReport,
    source_dir: PathBuf,
    source_count: usize,
    staging_dir: PathBuf,
    staged_count: usize,
    final_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    setup_logging(args.verbose);

    // Validate paths
    if !args.input.exists() {
        anyhow::bail!("Input directory does not exist: {}", args.input.display());
    }
    if !args.input.is_dir() {
        anyhow::bail!("Input path is not a directory: {}", args.input.display());
    }

    let staging = args.staging_dir();
    prepare_staging(&staging)?;

    if !args.json {
        println!("Scanning {}...", args.input.display());
    }
    let candidates = scanner::scan_files(&args.input, args.extensions());
    let options = batch::BatchOptions {
        policy: args.on_error,
        jobs: args.jobs,
        show_progress: !args.no_progress && !args.json,
    };
    let report = batch::run_batch(candidates, &staging, &options)?;

    // Sanity check: source and staging entry counts
    let source_count = count_entries(&args.input)?;
    let staged_count = count_entries(&staging)?;

    if !args.json {
        println!(
            "Copied {} of {} file(s), {} with a timestamp",
            report.copied.len(),
            report.considered,
            report.timestamped
        );
        for failure in &report.failures {
            println!("  failed: {} ({})", failure.source.display(), failure.error);
        }
        println!("Number of files in {}: {}", args.input.display(), source_count);
        println!("Number of files in {}: {}", staging.display(), staged_count);
        println!("Folder name: {}", report.folder_name);
    }

    let finalized = finalize::finalize(
        &staging,
        &report.folder_name,
        args.title.as_deref(),
        &args.separator,
    )
    .with_context(|| format!("Files are left in {}", staging.display()));

    if args.json {
        let summary = Summary {
            final_path: finalized.as_ref().ok().cloned(),
            source_dir: args.input.clone(),
            source_count,
            staging_dir: staging.clone(),
            staged_count,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let target = finalized?;
    if !args.json {
        println!("New path: {}", target.display());
    }

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Remove any leftover staging directory and recreate it empty.
fn prepare_staging(staging: &Path) -> Result<()> {
    if staging.exists() {
        info!("Removing previous {}", staging.display());
        fs::remove_dir_all(staging)
            .with_context(|| format!("Error removing {}", staging.display()))?;
    }
    fs::create_dir_all(staging)
        .with_context(|| format!("Error making pathway {}", staging.display()))?;
    Ok(())
}

fn count_entries(dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Could not count files in {}", dir.display()))?;
    Ok(entries.count())
}
