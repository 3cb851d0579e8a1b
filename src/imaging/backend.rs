//! Processing backend trait and shared types.
//!
//! The [`ProcessingBackend`] trait is the single capability every backend
//! implements: accept a [`SizeConfiguration`], then turn one input file into
//! every configured WebP variant under an output root.
//!
//! Implementations:
//!
//! | Backend | Where the pixels are produced |
//! |---|---|
//! | [`LocalBackend`](super::local_backend::LocalBackend) | in-process, `image` + libwebp |
//! | [`KrakenBackend`](crate::remote::kraken::KrakenBackend) | remote, one upload per variant |
//! | [`KrakenSdkBackend`](crate::remote::kraken_sdk::KrakenSdkBackend) | remote, one batch upload per file |
//!
//! `process` takes `&self` and backends are `Sync`: the orchestrator calls
//! it from several rayon workers at once. The only state shared between
//! calls is the size configuration (read-only) and, for remote backends, the
//! HTTP client.

use crate::sizes::SizeConfiguration;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("size configuration missing: configure the backend before processing")]
    ConfigurationMissing,
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote optimization failed: {0}")]
    RemoteOptimizationFailed(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl BackendError {
    /// Whether a remote call that failed this way is worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::RemoteOptimizationFailed(_) | BackendError::Transport(_)
        )
    }
}

/// How many files a backend may process at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// All available workers.
    Parallel,
    /// One file at a time.
    Sequential,
}

/// One variant written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenVariant {
    pub category: String,
    pub width: u32,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Trait for processing backends.
pub trait ProcessingBackend: Send + Sync {
    /// Directory name under the output root, e.g. `Tuned` or `KrakenSdk`.
    fn name(&self) -> &'static str;

    /// Concurrency ceiling the orchestrator must respect.
    fn concurrency(&self) -> Concurrency {
        Concurrency::Parallel
    }

    /// Store the size configuration used by subsequent `process` calls.
    fn configure(&mut self, sizes: SizeConfiguration);

    /// Produce every configured variant of `input` under `output_root`.
    ///
    /// Fails with [`BackendError::ConfigurationMissing`] when called before
    /// [`configure`](Self::configure).
    fn process(&self, input: &Path, output_root: &Path)
    -> Result<Vec<WrittenVariant>, BackendError>;
}
