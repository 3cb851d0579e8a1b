//! End-to-end batches through the public API: config → scan → factory →
//! orchestrator → files on disk.

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;
use webp_variants::config::{self, VariantsConfig};
use webp_variants::factory::{BackendKind, create_backend};
use webp_variants::imaging::{BackendError, ProcessingBackend};
use webp_variants::process::run_batch;
use webp_variants::remote::{Credentials, RemoteContext, RemoteSettings, RetryPolicy};
use webp_variants::scan::discover_inputs;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let file = fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

fn write_png_with_alpha(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| image::Rgba([40, 120, 200, (x % 256) as u8]));
    img.save(path).unwrap();
}

fn webp_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|x| x == "webp"))
        .collect();
    files.sort();
    files
}

fn small_config(input: &Path, output: &Path) -> VariantsConfig {
    let overlay: toml::Value = toml::from_str(&format!(
        r#"
input_dir = "{}"
output_dir = "{}"
backends = ["tuned", "basic"]

[sizes]
thumbnails = [{{ width = 64, quality = 75 }}, {{ width = 128, quality = 80 }}]
grid = [{{ width = 256, quality = 90 }}]
fullpage = []
"#,
        input.display().to_string().replace('\\', "/"),
        output.display().to_string().replace('\\', "/"),
    ))
    .unwrap();
    config::resolve_config(config::stock_defaults_value().unwrap(), Some(overlay)).unwrap()
}

fn offline_remote() -> RemoteContext {
    RemoteContext::new(Credentials::default(), RemoteSettings::default()).unwrap()
}

// =============================================================================
// Local backends
// =============================================================================

#[test]
fn local_batch_survives_corrupt_input() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    write_jpeg(&input.join("wide.jpg"), 600, 300);
    write_jpeg(&input.join("tall.jpg"), 200, 400);
    write_png_with_alpha(&input.join("logo.png"), 100, 50);
    fs::write(input.join("corrupt.jpg"), b"not really a jpeg").unwrap();

    let config = small_config(&input, &output);
    let sizes = config.size_configuration().unwrap();
    let inputs = discover_inputs(&config.input_dir).unwrap();
    assert_eq!(inputs.len(), 4);

    let mut backend = create_backend(BackendKind::Tuned, &offline_remote());
    backend.configure(sizes.clone());
    let report = run_batch(&backend, &inputs, &config.output_dir, 4, None).unwrap();

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].path.ends_with("corrupt.jpg"));
    assert!(matches!(
        report.failures[0].error,
        BackendError::Decode { .. }
    ));

    let written = webp_files(&output);
    assert_eq!(written.len(), 3 * sizes.variant_count());
    assert_eq!(report.variants_written, written.len());
    assert!(output
        .join("Tuned/thumbnails/64/wide_thumbnails_64.webp")
        .exists());
    assert!(output.join("Tuned/grid/256/logo_grid_256.webp").exists());
    assert!(!output.join("Tuned/fullpage").exists());
}

#[test]
fn widths_never_exceed_target_or_source() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    write_jpeg(&input.join("big.jpg"), 500, 250);
    write_jpeg(&input.join("small.jpg"), 100, 80);

    let config = small_config(&input, &output);
    let sizes = config.size_configuration().unwrap();
    let inputs = discover_inputs(&input).unwrap();

    for kind in [BackendKind::Tuned, BackendKind::Basic] {
        let mut backend = create_backend(kind, &offline_remote());
        backend.configure(sizes.clone());
        let report = run_batch(&backend, &inputs, &output, 2, None).unwrap();
        assert_eq!(report.failed(), 0, "{kind} had failures");
    }

    for path in webp_files(&output) {
        let target: u32 = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse().ok())
            .unwrap();
        let (w, _) = image::image_dimensions(&path).unwrap();
        assert!(w <= target, "{} is {w}px wide", path.display());
        let source_width = if path.to_string_lossy().contains("small_") {
            100
        } else {
            500
        };
        assert!(w <= source_width);
    }
}

#[test]
fn rerun_overwrites_instead_of_duplicating() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    write_jpeg(&input.join("photo.jpg"), 300, 200);

    let config = small_config(&input, &output);
    let inputs = discover_inputs(&input).unwrap();
    let mut backend = create_backend(BackendKind::Basic, &offline_remote());
    backend.configure(config.size_configuration().unwrap());

    run_batch(&backend, &inputs, &output, 2, None).unwrap();
    let first = webp_files(&output);
    run_batch(&backend, &inputs, &output, 2, None).unwrap();
    let second = webp_files(&output);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

// =============================================================================
// Remote backend through the factory
// =============================================================================

#[test]
fn remote_failure_is_recorded_per_file() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/v1/upload")
        .with_status(200)
        .with_body(r#"{"success":false,"message":"Unknown API Key"}"#)
        .create();

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    fs::create_dir_all(&input).unwrap();
    write_jpeg(&input.join("a.jpg"), 64, 64);
    write_jpeg(&input.join("b.jpg"), 64, 64);

    let remote = RemoteContext::new(
        Credentials::new("bad", "bad"),
        RemoteSettings {
            endpoint: format!("{}/v1", server.url()),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        },
    )
    .unwrap();
    let config = small_config(&input, &output);

    for kind in [BackendKind::Kraken, BackendKind::KrakenSdk] {
        let mut backend = create_backend(kind, &remote);
        backend.configure(config.size_configuration().unwrap());
        let report = run_batch(&backend, &discover_inputs(&input).unwrap(), &output, 4, None)
            .unwrap();

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, BackendError::RemoteOptimizationFailed(_))));
    }
    assert!(webp_files(&output).is_empty());
}
