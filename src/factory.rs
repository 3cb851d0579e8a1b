//! Backend selection.
//!
//! The set of backends is closed, so it is modelled as an enum rather than a
//! trait object: [`Backend`] dispatches each [`ProcessingBackend`] call to
//! the variant it holds. [`create_backend`] is a pure mapping from a
//! [`BackendKind`] to a fresh, unconfigured backend.
//!
//! Remote variants take the shared [`RemoteContext`] (HTTP client,
//! credentials, retry policy). Credentials are not checked here; bad ones
//! surface as `RemoteOptimizationFailed` on the first request.

use crate::imaging::{
    BackendError, Concurrency, LocalBackend, ProcessingBackend, WrittenVariant,
};
use crate::remote::RemoteContext;
use crate::remote::kraken::KrakenBackend;
use crate::remote::kraken_sdk::KrakenSdkBackend;
use crate::sizes::SizeConfiguration;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported backend: {0:?} (expected one of: tuned, basic, kraken, kraken-sdk)")]
pub struct UnsupportedBackend(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Tuned,
    Basic,
    Kraken,
    KrakenSdk,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Tuned,
        BackendKind::Basic,
        BackendKind::Kraken,
        BackendKind::KrakenSdk,
    ];

    /// Identifier used in config files and on the command line.
    pub fn id(self) -> &'static str {
        match self {
            BackendKind::Tuned => "tuned",
            BackendKind::Basic => "basic",
            BackendKind::Kraken => "kraken",
            BackendKind::KrakenSdk => "kraken-sdk",
        }
    }

    /// Directory name under the output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            BackendKind::Tuned => "Tuned",
            BackendKind::Basic => "Basic",
            BackendKind::Kraken => "Kraken",
            BackendKind::KrakenSdk => "KrakenSdk",
        }
    }

    pub fn is_remote(self) -> bool {
        matches!(self, BackendKind::Kraken | BackendKind::KrakenSdk)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BackendKind {
    type Err = UnsupportedBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "tuned" => Ok(BackendKind::Tuned),
            "basic" => Ok(BackendKind::Basic),
            "kraken" => Ok(BackendKind::Kraken),
            "kraken-sdk" | "krakensdk" => Ok(BackendKind::KrakenSdk),
            _ => Err(UnsupportedBackend(s.to_string())),
        }
    }
}

/// One of the available backends.
pub enum Backend {
    Local(LocalBackend),
    Kraken(KrakenBackend),
    KrakenSdk(KrakenSdkBackend),
}

impl Backend {
    fn inner(&self) -> &dyn ProcessingBackend {
        match self {
            Backend::Local(b) => b,
            Backend::Kraken(b) => b,
            Backend::KrakenSdk(b) => b,
        }
    }
}

impl ProcessingBackend for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn concurrency(&self) -> Concurrency {
        self.inner().concurrency()
    }

    fn configure(&mut self, sizes: SizeConfiguration) {
        match self {
            Backend::Local(b) => b.configure(sizes),
            Backend::Kraken(b) => b.configure(sizes),
            Backend::KrakenSdk(b) => b.configure(sizes),
        }
    }

    fn process(
        &self,
        input: &Path,
        output_root: &Path,
    ) -> Result<Vec<WrittenVariant>, BackendError> {
        self.inner().process(input, output_root)
    }
}

/// Build an unconfigured backend of the given kind.
pub fn create_backend(kind: BackendKind, remote: &RemoteContext) -> Backend {
    match kind {
        BackendKind::Tuned => Backend::Local(LocalBackend::tuned()),
        BackendKind::Basic => Backend::Local(LocalBackend::basic()),
        BackendKind::Kraken => Backend::Kraken(KrakenBackend::new(remote)),
        BackendKind::KrakenSdk => Backend::KrakenSdk(KrakenSdkBackend::new(remote)),
    }
}

/// [`create_backend`] from a textual identifier.
pub fn create_backend_by_name(
    name: &str,
    remote: &RemoteContext,
) -> Result<Backend, UnsupportedBackend> {
    Ok(create_backend(name.parse()?, remote))
}
