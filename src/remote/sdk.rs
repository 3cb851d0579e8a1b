//! Typed client for the batch optimize-and-wait call.
//!
//! A single upload carries any number of named resize sets; the service
//! answers once all of them are done, keyed by set name:
//!
//! ```text
//! → data: {"auth":{..},"wait":true,"lossy":true,"webp":true,"auto_orient":true,
//!          "resize":[{"id":"thumbnails_400","width":400,"strategy":"none","lossy":true}, ..]}
//! ← {"success":true,"results":{"thumbnails_400":{"kraked_url":".."}, ..}}
//! ```

use super::{Credentials, RemoteContext, RemoteSettings};
use crate::imaging::BackendError;
use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Set name for a (category, width) pair.
pub fn set_name(category: &str, width: u32) -> String {
    format!("{category}_{width}")
}

/// Recover (category, width) from a set name.
///
/// Splits at the last underscore so categories may contain underscores.
pub fn parse_set_name(name: &str) -> Option<(&str, u32)> {
    let (category, width) = name.rsplit_once('_')?;
    if category.is_empty() {
        return None;
    }
    let width = width.parse().ok().filter(|w| *w > 0)?;
    Some((category, width))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeSet {
    pub id: String,
    pub width: u32,
    pub strategy: &'static str,
    pub lossy: bool,
}

impl ResizeSet {
    /// Proportional resize to `width`, lossy.
    pub fn proportional(category: &str, width: u32) -> Self {
        Self {
            id: set_name(category, width),
            width,
            strategy: "none",
            lossy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeSetRequest {
    pub wait: bool,
    pub lossy: bool,
    pub webp: bool,
    pub auto_orient: bool,
    pub resize: Vec<ResizeSet>,
}

impl Default for OptimizeSetRequest {
    fn default() -> Self {
        Self {
            wait: true,
            lossy: true,
            webp: true,
            auto_orient: true,
            resize: Vec::new(),
        }
    }
}

impl OptimizeSetRequest {
    pub fn add_set(&mut self, set: ResizeSet) {
        self.resize.push(set);
    }

    pub fn is_empty(&self) -> bool {
        self.resize.is_empty()
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    auth: &'a Credentials,
    #[serde(flatten)]
    request: &'a OptimizeSetRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetResult {
    pub kraked_url: String,
    #[serde(default)]
    pub kraked_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizeSetBody {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: BTreeMap<String, SetResult>,
}

/// HTTP status of the call plus the parsed body, when it parsed.
#[derive(Debug)]
pub struct OptimizeSetResponse {
    pub status: StatusCode,
    pub body: Option<OptimizeSetBody>,
}

#[derive(Debug, Clone)]
pub struct SdkClient {
    http: Client,
    credentials: Credentials,
    settings: RemoteSettings,
}

impl SdkClient {
    pub fn new(context: &RemoteContext) -> Self {
        Self {
            http: context.client.clone(),
            credentials: context.credentials.clone(),
            settings: context.settings.clone(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Upload `path` with every set in `request` and wait for the results.
    pub fn optimize_wait(
        &self,
        path: &Path,
        request: &OptimizeSetRequest,
    ) -> Result<OptimizeSetResponse, BackendError> {
        let payload = Payload {
            auth: &self.credentials,
            request,
        };
        let json = serde_json::to_string(&payload)
            .map_err(|e| BackendError::RemoteOptimizationFailed(format!("request body: {e}")))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = fs::read(path)?;

        let form = multipart::Form::new()
            .part("data", multipart::Part::text(json).mime_str("application/json")?)
            .part("file", multipart::Part::bytes(source).file_name(file_name));

        let response = self
            .http
            .post(self.settings.url("upload"))
            .multipart(form)
            .send()?;
        let status = response.status();
        let text = response.text()?;
        Ok(OptimizeSetResponse {
            status,
            body: serde_json::from_str(&text).ok(),
        })
    }
}
