//! Direct-HTTP remote backend.
//!
//! One multipart `POST {endpoint}/upload` per variant:
//!
//! ```text
//! data: {"auth":{"api_key":..,"api_secret":..},"wait":true,"lossy":true,
//!        "webp":true,"resize":{"width":W,"strategy":"none"},"quality":Q}
//! file: <source bytes>
//! ```
//!
//! The response carries `success` and, on success, `kraked_url`; the result
//! is then fetched with a plain GET and written unchanged.

use super::{Credentials, RemoteContext, RetryPolicy, RemoteSettings, download, with_retry};
use crate::imaging::{BackendError, ProcessingBackend, WrittenVariant};
use crate::layout;
use crate::sizes::SizeConfiguration;
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct UploadData<'a> {
    auth: &'a Credentials,
    wait: bool,
    lossy: bool,
    webp: bool,
    resize: Resize,
    quality: u8,
}

#[derive(Serialize)]
struct Resize {
    width: u32,
    strategy: &'static str,
}

#[derive(Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    kraked_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct KrakenBackend {
    client: Client,
    credentials: Credentials,
    settings: RemoteSettings,
    sizes: Option<SizeConfiguration>,
}

impl KrakenBackend {
    pub fn new(context: &RemoteContext) -> Self {
        Self {
            client: context.client.clone(),
            credentials: context.credentials.clone(),
            settings: context.settings.clone(),
            sizes: None,
        }
    }

    fn retry(&self) -> &RetryPolicy {
        &self.settings.retry
    }

    /// Upload once and return the URL of the optimized result.
    fn optimize(
        &self,
        source: &[u8],
        file_name: &str,
        width: u32,
        quality: u8,
    ) -> Result<String, BackendError> {
        let data = UploadData {
            auth: &self.credentials,
            wait: true,
            lossy: true,
            webp: true,
            resize: Resize {
                width,
                strategy: "none",
            },
            quality,
        };
        let json = serde_json::to_string(&data)
            .map_err(|e| BackendError::RemoteOptimizationFailed(format!("request body: {e}")))?;

        let form = multipart::Form::new()
            .part("data", multipart::Part::text(json).mime_str("application/json")?)
            .part(
                "file",
                multipart::Part::bytes(source.to_vec()).file_name(file_name.to_string()),
            );

        let response = self
            .client
            .post(self.settings.url("upload"))
            .multipart(form)
            .send()?;
        let status = response.status();
        let body = response.text()?;

        parse_upload_response(status, &body)
    }
}

fn parse_upload_response(status: reqwest::StatusCode, body: &str) -> Result<String, BackendError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|e| {
        BackendError::RemoteOptimizationFailed(format!("unexpected response (HTTP {status}): {e}"))
    })?;
    if !parsed.success {
        let reason = parsed
            .message
            .unwrap_or_else(|| "service reported success: false".to_string());
        return Err(BackendError::RemoteOptimizationFailed(reason));
    }
    parsed.kraked_url.ok_or_else(|| {
        BackendError::RemoteOptimizationFailed("success response without kraked_url".to_string())
    })
}

impl ProcessingBackend for KrakenBackend {
    fn name(&self) -> &'static str {
        "Kraken"
    }

    fn configure(&mut self, sizes: SizeConfiguration) {
        self.sizes = Some(sizes);
    }

    fn process(
        &self,
        input: &Path,
        output_root: &Path,
    ) -> Result<Vec<WrittenVariant>, BackendError> {
        let sizes = self
            .sizes
            .as_ref()
            .ok_or(BackendError::ConfigurationMissing)?;
        let stem = layout::input_stem(input).ok_or_else(|| BackendError::Decode {
            path: input.to_path_buf(),
            message: "file name has no usable stem".to_string(),
        })?;
        if sizes.is_empty() {
            return Ok(Vec::new());
        }

        let source = fs::read(input)?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.to_string());

        let mut written = Vec::with_capacity(sizes.variant_count());
        for variant in sizes.variants() {
            let width = variant.size.width();
            let url = with_retry(self.retry(), || {
                self.optimize(&source, &file_name, width, variant.size.quality())
            })?;
            let bytes = with_retry(self.retry(), || download(&self.client, &url))?;

            let path = layout::variant_path(output_root, self.name(), variant.category, width, stem);
            layout::write_variant(&path, &bytes)?;
            written.push(WrittenVariant {
                category: variant.category.to_string(),
                width,
                path,
                bytes: bytes.len() as u64,
            });
        }
        Ok(written)
    }
}
