use crate::metadata::{self, TimestampSource};
use crate::scanner::CandidateFile;
use crate::state::BatchState;
use crate::transfer::{self, FailurePolicy};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub policy: FailurePolicy,
    /// Copy workers; `None` uses one per CPU.
    pub jobs: Option<usize>,
    pub show_progress: bool,
}

#[derive(Debug, Serialize)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bytes: u64,
    pub sequence: Option<u64>,
    pub timestamp_source: Option<TimestampSource>,
}

#[derive(Debug, Serialize)]
pub struct CopyFailure {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub folder_name: String,
    pub policy: FailurePolicy,
    pub considered: usize,
    pub timestamped: usize,
    pub copied: Vec<CopiedFile>,
    pub failures: Vec<CopyFailure>,
}

enum Outcome {
    Copied(CopiedFile),
    Failed(CopyFailure),
}

/// Copy every candidate into `dest_dir` under its synthesized name and return
/// the batch's folder name.
///
/// Timestamps are resolved and names assigned on the calling thread, in
/// traversal order; only the byte copies run on the worker pool. The call
/// returns once every dispatched copy has finished.
pub fn run_batch<I>(candidates: I, dest_dir: &Path, options: &BatchOptions) -> Result<BatchReport>
where
    I: IntoIterator<Item = CandidateFile>,
{
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = options.jobs {
        builder = builder.num_threads(jobs.max(1));
    }
    let pool = builder.build().context("Cannot start copy workers")?;

    let pb = progress_bar(options.show_progress)?;
    let aborted = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, Outcome)>();
    let mut state = BatchState::new();
    let mut considered = 0usize;

    pool.in_place_scope(|scope| {
        let aborted = &aborted;
        for (index, candidate) in candidates.into_iter().enumerate() {
            if aborted.load(Ordering::SeqCst) {
                warn!("Aborting batch, no further files will be copied");
                break;
            }
            considered += 1;

            let file = match File::open(&candidate.path) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Cannot open file {}: {}", candidate.path.display(), e);
                    if options.policy == FailurePolicy::Abort {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    let failure = CopyFailure {
                        source: candidate.path,
                        destination: None,
                        error: format!("Cannot open file: {}", e),
                    };
                    let _ = tx.send((index, Outcome::Failed(failure)));
                    continue;
                }
            };
            let timestamp = metadata::resolve_timestamp(&file, &candidate.extension, &candidate.path);
            drop(file);

            let plan = match state.assign(&candidate.file_name(), &candidate.extension, timestamp.as_ref()) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!("Not copying {}: {:#}", candidate.path.display(), e);
                    if options.policy == FailurePolicy::Abort {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    let failure = CopyFailure {
                        destination: Some(dest_dir.join(candidate.file_name())),
                        source: candidate.path,
                        error: format!("{:#}", e),
                    };
                    let _ = tx.send((index, Outcome::Failed(failure)));
                    continue;
                }
            };
            let destination = dest_dir.join(&plan.file_name);
            info!(
                "{:?} {} -> {}",
                candidate.kind,
                candidate.relative.display(),
                plan.file_name
            );

            let tx = tx.clone();
            let pb = pb.clone();
            let policy = options.policy;
            let timestamp_source = timestamp.map(|ts| ts.source);
            scope.spawn(move |_| {
                pb.set_message(plan.file_name.clone());
                let outcome = match transfer::copy_file(&candidate.path, &destination) {
                    Ok(bytes) => Outcome::Copied(CopiedFile {
                        source: candidate.path,
                        destination,
                        bytes,
                        sequence: plan.sequence,
                        timestamp_source,
                    }),
                    Err(e) => {
                        warn!("{:#}", e);
                        if policy == FailurePolicy::Abort {
                            aborted.store(true, Ordering::SeqCst);
                        }
                        Outcome::Failed(CopyFailure {
                            source: candidate.path,
                            destination: Some(destination),
                            error: format!("{:#}", e),
                        })
                    }
                };
                pb.inc(1);
                let _ = tx.send((index, outcome));
            });
        }
    });
    drop(tx);
    pb.finish_and_clear();
    info!("Folder name for batch: {}", state.folder_name());

    let mut outcomes: Vec<(usize, Outcome)> = rx.into_iter().collect();
    outcomes.sort_by_key(|(index, _)| *index);

    let mut copied = Vec::new();
    let mut failures = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Outcome::Copied(file) => copied.push(file),
            Outcome::Failed(failure) => failures.push(failure),
        }
    }

    if options.policy == FailurePolicy::Abort {
        if let Some(first) = failures.first() {
            anyhow::bail!(
                "Batch aborted after {} failure(s); first: {}",
                failures.len(),
                first.error
            );
        }
    }

    Ok(BatchReport {
        timestamped: state.timestamped(),
        folder_name: state.into_folder_name(),
        policy: options.policy,
        considered,
        copied,
        failures,
    })
}

fn progress_bar(visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::no_length();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner} Copied {pos} files {wide_msg}")?,
    );
    Ok(pb)
}
