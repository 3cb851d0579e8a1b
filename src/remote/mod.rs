//! Remote optimization backends and their shared plumbing.
//!
//! Both remote backends talk to a Kraken-style optimize-and-wait service:
//! the source bytes go up, the service resizes and re-encodes, and the result
//! is fetched from the returned URL. The bytes that come back are written
//! as-is; nothing here decodes or re-encodes them.
//!
//! One [`RemoteContext`] is built per process and handed to every remote
//! backend. It owns the HTTP client (connection pool, request timeout), the
//! credentials and the retry policy. `reqwest::blocking::Client` is a cheap
//! handle around an `Arc`, so cloning the context shares the pool.

pub mod kraken;
pub mod kraken_sdk;
pub mod sdk;

use crate::imaging::BackendError;
use reqwest::blocking::Client;
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.kraken.io/v1";

/// API key pair sent with every optimize request.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt number `attempt + 1` (attempts count from 1).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

/// Where and how remote calls are made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Base URL of the API, without trailing slash (`.../v1`).
    pub endpoint: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl RemoteSettings {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Everything a remote backend needs, built once and shared.
#[derive(Debug, Clone)]
pub struct RemoteContext {
    pub client: Client,
    pub credentials: Credentials,
    pub settings: RemoteSettings,
}

impl RemoteContext {
    pub fn new(credentials: Credentials, settings: RemoteSettings) -> Result<Self, BackendError> {
        let client = build_transport(&settings)?;
        Ok(Self {
            client,
            credentials,
            settings,
        })
    }
}

/// Build the shared HTTP client.
pub fn build_transport(settings: &RemoteSettings) -> Result<Client, BackendError> {
    let client = Client::builder()
        .timeout(settings.timeout)
        .user_agent(concat!("webp-variants/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fetch the bytes behind a result URL.
pub fn download(client: &Client, url: &str) -> Result<Vec<u8>, BackendError> {
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    Ok(bytes.to_vec())
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. The last error is returned.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> Result<T, BackendError>,
) -> Result<T, BackendError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                thread::sleep(policy.delay_after(attempt));
                attempt += 1;
            }
            result => return result,
        }
    }
}
