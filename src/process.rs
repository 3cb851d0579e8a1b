//! Batch orchestration.
//!
//! Runs one backend over a list of input files and aggregates the outcome.
//!
//! ## Concurrency
//!
//! Each batch gets its own rayon pool sized from the backend's
//! [`Concurrency`]: `max_threads` workers for parallel backends, a single
//! worker for sequential ones. Files are independent jobs; completion order
//! is not significant because every output path is unique per input.
//!
//! ## Failure isolation
//!
//! Every file yields an outcome. A failed file is recorded with its error and
//! never cancels or affects its siblings. The batch itself only fails when
//! the pool can't be built.
//!
//! ## Progress
//!
//! Workers never print. When a [`Sender`] is supplied, a [`BatchEvent`] is
//! sent per finished file; the caller decides how to display it (see
//! [`output::format_batch_event`](crate::output::format_batch_event)).

use crate::imaging::{BackendError, Concurrency, ProcessingBackend, WrittenVariant};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    BatchStarted {
        backend: String,
        file_count: usize,
        workers: usize,
    },
    FileProcessed {
        /// 1-based position in the input list.
        index: usize,
        source_path: PathBuf,
        variants: Vec<WrittenVariant>,
    },
    FileFailed {
        index: usize,
        source_path: PathBuf,
        reason: String,
    },
}

/// A file that did not make it, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: BackendError,
}

/// Aggregate result of one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub backend: &'static str,
    pub succeeded: usize,
    pub failures: Vec<FileFailure>,
    pub variants_written: usize,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed()
    }
}

/// Number of workers a backend may use given the configured ceiling.
pub fn worker_count(concurrency: Concurrency, max_threads: usize) -> usize {
    match concurrency {
        Concurrency::Parallel => max_threads.max(1),
        Concurrency::Sequential => 1,
    }
}

/// Process every input with `backend`, writing under `output_root`.
pub fn run_batch(
    backend: &impl ProcessingBackend,
    inputs: &[PathBuf],
    output_root: &Path,
    max_threads: usize,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let workers = worker_count(backend.concurrency(), max_threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let emit = |event: BatchEvent| {
        if let Some(tx) = &events {
            // Receiver gone means nobody is listening; keep processing.
            tx.send(event).ok();
        }
    };

    emit(BatchEvent::BatchStarted {
        backend: backend.name().to_string(),
        file_count: inputs.len(),
        workers,
    });

    let started = Instant::now();
    let outcomes: Vec<(&PathBuf, Result<Vec<WrittenVariant>, BackendError>)> = pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map(|(i, input)| {
                let outcome = backend.process(input, output_root);
                match &outcome {
                    Ok(variants) => emit(BatchEvent::FileProcessed {
                        index: i + 1,
                        source_path: input.clone(),
                        variants: variants.clone(),
                    }),
                    Err(e) => emit(BatchEvent::FileFailed {
                        index: i + 1,
                        source_path: input.clone(),
                        reason: e.to_string(),
                    }),
                }
                (input, outcome)
            })
            .collect()
    });
    let elapsed = started.elapsed();

    let mut report = BatchReport {
        backend: backend.name(),
        succeeded: 0,
        failures: Vec::new(),
        variants_written: 0,
        bytes_written: 0,
        elapsed,
    };
    for (path, outcome) in outcomes {
        match outcome {
            Ok(variants) => {
                report.succeeded += 1;
                report.variants_written += variants.len();
                report.bytes_written += variants.iter().map(|v| v.bytes).sum::<u64>();
            }
            Err(error) => report.failures.push(FileFailure {
                path: path.clone(),
                error,
            }),
        }
    }
    Ok(report)
}
