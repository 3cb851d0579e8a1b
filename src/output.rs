//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns lines; the `print_*`
//! wrappers only write them to stdout. Workers never print: progress arrives
//! as [`BatchEvent`]s on a channel and is formatted here by the receiving
//! thread.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Tuned (3 files, 8 workers)
//!     001 dawn.jpg
//!         Source: input/dawn.jpg
//!         thumbnails 200px: 14.2 KB
//!         grid 800px: 88.0 KB
//!     002 broken.jpg FAILED
//!         Source: input/broken.jpg
//!         Error: failed to decode input/broken.jpg: ...
//! Tuned: 2 succeeded, 1 failed in 3.42s (8 variants, 1.3 MB)
//!     Failed: input/broken.jpg
//!         failed to decode input/broken.jpg: ...
//! ```
//!
//! ## Check
//!
//! ```text
//! Inputs: 2 files in input
//! Backends: tuned, kraken-sdk
//! Variants per file: 2
//!     thumbnails 200px q80
//!     grid 800px q82
//! Planned outputs: 8
//!     dawn.jpg
//!         output/Tuned/thumbnails/200/dawn_thumbnails_200.webp
//!         ...
//! ```

use crate::factory::BackendKind;
use crate::layout;
use crate::process::{BatchEvent, BatchReport};
use crate::sizes::SizeConfiguration;
use std::path::{Path, PathBuf};

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Run: progress events
// ============================================================================

/// Format one progress event.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::BatchStarted {
            backend,
            file_count,
            workers,
        } => vec![format!(
            "{} ({}, {})",
            backend,
            plural(*file_count, "file"),
            plural(*workers, "worker")
        )],
        BatchEvent::FileProcessed {
            index,
            source_path,
            variants,
        } => {
            let mut lines = vec![
                format!("    {:03} {}", index, file_label(source_path)),
                format!("        Source: {}", source_path.display()),
            ];
            for v in variants {
                lines.push(format!(
                    "        {} {}px: {}",
                    v.category,
                    v.width,
                    format_bytes(v.bytes)
                ));
            }
            lines
        }
        BatchEvent::FileFailed {
            index,
            source_path,
            reason,
        } => vec![
            format!("    {:03} {} FAILED", index, file_label(source_path)),
            format!("        Source: {}", source_path.display()),
            format!("        Error: {}", reason),
        ],
    }
}

// ============================================================================
// Run: summary
// ============================================================================

/// Format the summary of a finished batch, failures listed last.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} succeeded, {} failed in {:.2}s ({}, {})",
        report.backend,
        report.succeeded,
        report.failed(),
        report.elapsed.as_secs_f64(),
        plural(report.variants_written, "variant"),
        format_bytes(report.bytes_written)
    )];
    for failure in &report.failures {
        lines.push(format!("    Failed: {}", failure.path.display()));
        lines.push(format!("        {}", failure.error));
    }
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check: planned work
// ============================================================================

/// Format the variant matrix a run would produce, without producing it.
pub fn format_plan(
    input_dir: &Path,
    inputs: &[PathBuf],
    kinds: &[BackendKind],
    sizes: &SizeConfiguration,
    output_root: &Path,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Inputs: {} in {}",
            plural(inputs.len(), "file"),
            input_dir.display()
        ),
        format!(
            "Backends: {}",
            kinds.iter().map(|k| k.id()).collect::<Vec<_>>().join(", ")
        ),
        format!("Variants per file: {}", sizes.variant_count()),
    ];
    for v in sizes.variants() {
        lines.push(format!(
            "    {} {}px q{}",
            v.category,
            v.size.width(),
            v.size.quality()
        ));
    }

    lines.push(format!(
        "Planned outputs: {}",
        inputs.len() * kinds.len() * sizes.variant_count()
    ));
    for input in inputs {
        lines.push(format!("    {}", file_label(input)));
        let Some(stem) = layout::input_stem(input) else {
            lines.push("        (skipped: no usable file name)".to_string());
            continue;
        };
        for kind in kinds {
            for v in sizes.variants() {
                let path = layout::variant_path(
                    output_root,
                    kind.dir_name(),
                    v.category,
                    v.size.width(),
                    stem,
                );
                lines.push(format!("        {}", path.display()));
            }
        }
    }
    lines
}

pub fn print_plan(
    input_dir: &Path,
    inputs: &[PathBuf],
    kinds: &[BackendKind],
    sizes: &SizeConfiguration,
    output_root: &Path,
) {
    for line in format_plan(input_dir, inputs, kinds, sizes, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
