//! SDK-mediated remote backend: one batch request per input file.
//!
//! Every configured (category, width) becomes a named resize set in a single
//! [`OptimizeSetRequest`]. The service enforces a tighter per-account
//! ceiling for batch calls, so this backend asks the orchestrator for
//! [`Concurrency::Sequential`].

use super::sdk::{OptimizeSetBody, OptimizeSetRequest, ResizeSet, SdkClient, parse_set_name};
use super::{RemoteContext, download, with_retry};
use crate::imaging::{BackendError, Concurrency, ProcessingBackend, WrittenVariant};
use crate::layout;
use crate::sizes::SizeConfiguration;
use reqwest::StatusCode;
use std::path::Path;

pub struct KrakenSdkBackend {
    client: SdkClient,
    sizes: Option<SizeConfiguration>,
}

impl KrakenSdkBackend {
    pub fn new(context: &RemoteContext) -> Self {
        Self {
            client: SdkClient::new(context),
            sizes: None,
        }
    }
}

fn build_request(sizes: &SizeConfiguration) -> OptimizeSetRequest {
    let mut request = OptimizeSetRequest::default();
    for variant in sizes.variants() {
        request.add_set(ResizeSet::proportional(variant.category, variant.size.width()));
    }
    request
}

/// Turn a raw response into a body that is known to hold every requested set.
fn accept_response(
    status: StatusCode,
    body: Option<OptimizeSetBody>,
    request: &OptimizeSetRequest,
) -> Result<OptimizeSetBody, BackendError> {
    if status != StatusCode::OK {
        let detail = body
            .and_then(|b| b.message)
            .unwrap_or_else(|| "no message".to_string());
        return Err(BackendError::RemoteOptimizationFailed(format!(
            "HTTP {status}: {detail}"
        )));
    }
    let body = body.ok_or_else(|| {
        BackendError::RemoteOptimizationFailed("unexpected response shape".to_string())
    })?;
    if !body.success {
        let reason = body
            .message
            .unwrap_or_else(|| "service reported success: false".to_string());
        return Err(BackendError::RemoteOptimizationFailed(reason));
    }
    if let Some(missing) = request
        .resize
        .iter()
        .find(|set| !body.results.contains_key(&set.id))
    {
        return Err(BackendError::RemoteOptimizationFailed(format!(
            "response has no result for set {}",
            missing.id
        )));
    }
    Ok(body)
}

impl ProcessingBackend for KrakenSdkBackend {
    fn name(&self) -> &'static str {
        "KrakenSdk"
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Sequential
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

        let request = build_request(sizes);
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let retry = &self.client.settings().retry;
        let body = with_retry(retry, || {
            let response = self.client.optimize_wait(input, &request)?;
            accept_response(response.status, response.body, &request)
        })?;

        // Resolve every name before downloading so a bad one leaves no partial output.
        // Paths come from the configured variant; results nobody asked for are skipped.
        let targets = body
            .results
            .iter()
            .filter_map(|(name, result)| {
                let Some((category, width)) = parse_set_name(name) else {
                    return Some(Err(BackendError::RemoteOptimizationFailed(format!(
                        "unexpected set name {name:?}"
                    ))));
                };
                sizes
                    .variants()
                    .find(|v| v.category == category && v.size.width() == width)
                    .map(|v| Ok((v.category, width, result.kraked_url.as_str())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut written = Vec::with_capacity(targets.len());
        for (category, width, url) in targets {
            let bytes = with_retry(retry, || download(self.client.http(), url))?;
            let path = layout::variant_path(output_root, self.name(), category, width, stem);
            layout::write_variant(&path, &bytes)?;
            written.push(WrittenVariant {
                category: category.to_string(),
                width,
                path,
                bytes: bytes.len() as u64,
            });
        }
        Ok(written)
    }
}
