//! Local-codec backend: every pixel is produced in-process.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders |
//! | Auto-orient | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Resize | `DynamicImage::resize_exact`, filter from the profile |
//! | Sharpen, modulate | [`operations`](super::operations) |
//! | Contrast | [`operations::contrast`](super::operations::contrast) |
//! | Encode → WebP | `webp` (libwebp) with an explicit `WebPConfig` |
//!
//! ## Metadata
//!
//! Decoding into a `DynamicImage` keeps pixels only: EXIF, ICC and GPS
//! blocks of the source never reach the variants, and the encoder is fed raw
//! pixel buffers so it has nothing to write back. Orientation is read from
//! EXIF *before* it is dropped and baked into the pixels.

use super::backend::{BackendError, ProcessingBackend, WrittenVariant};
use super::calculations::{
    is_lossless, output_dimensions, select_filter, sharpening_for, should_resize,
};
use super::operations::{adjust_color, unsharp_mask};
use super::params::{EncodeSettings, LocalProfile};
use crate::layout;
use crate::sizes::{ImageSize, SizeConfiguration};
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// In-process backend parameterized by a [`LocalProfile`].
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct LocalBackend {
    name: &'static str,
    profile: LocalProfile,
    sizes: Option<SizeConfiguration>,
}

impl LocalBackend {
    pub fn new(name: &'static str, profile: LocalProfile) -> Self {
        Self {
            name,
            profile,
            sizes: None,
        }
    }

    pub fn tuned() -> Self {
        Self::new("Tuned", LocalProfile::tuned())
    }

    pub fn basic() -> Self {
        Self::new("Basic", LocalProfile::basic())
    }

    pub fn profile(&self) -> &LocalProfile {
        &self.profile
    }
}

/// Decode an image and bake its EXIF orientation into the pixels.
fn load_oriented(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_error = |e: image::ImageError| BackendError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(decode_error)?;
    // Unreadable orientation metadata counts as none.
    let orientation = decoder.orientation().ok();
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }
    Ok(img)
}

/// Run resize → sharpen → color adjust for one target size.
pub fn render_variant(
    source: &DynamicImage,
    target_width: u32,
    profile: &LocalProfile,
) -> DynamicImage {
    let resized = if should_resize(source.width(), target_width) {
        let (w, h) = output_dimensions(source.dimensions(), target_width);
        source.resize_exact(w, h, select_filter(&profile.filters, target_width))
    } else {
        source.clone()
    };

    let sharpened = unsharp_mask(&resized, sharpening_for(&profile.sharpening, target_width));
    adjust_color(sharpened, &profile.color)
}

/// Encode to WebP, lossless when the quality reaches the profile threshold.
pub fn encode_webp(
    img: &DynamicImage,
    quality: u8,
    settings: &EncodeSettings,
    keep_alpha: bool,
) -> Result<Vec<u8>, BackendError> {
    // libwebp only takes 8-bit RGB or RGBA
    let pixels = if keep_alpha {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&pixels)
        .map_err(|e| BackendError::Encode(format!("unsupported pixel layout: {e}")))?;

    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::Encode("libwebp config init failed".to_string()))?;
    config.lossless = is_lossless(settings.lossless_threshold, quality) as i32;
    config.quality = quality as f32;
    config.method = settings.method as i32;
    config.alpha_quality = settings.alpha_quality as i32;

    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::Encode(format!("libwebp: {e:?}")))?;
    Ok(encoded.to_vec())
}

impl LocalBackend {
    fn write_size(
        &self,
        source: &DynamicImage,
        keep_alpha: bool,
        category: &str,
        size: ImageSize,
        stem: &str,
        output_root: &Path,
    ) -> Result<WrittenVariant, BackendError> {
        let rendered = render_variant(source, size.width(), &self.profile);
        let bytes = encode_webp(&rendered, size.quality(), &self.profile.encode, keep_alpha)?;
        let path = layout::variant_path(output_root, self.name, category, size.width(), stem);
        layout::write_variant(&path, &bytes)?;
        Ok(WrittenVariant {
            category: category.to_string(),
            width: size.width(),
            path,
            bytes: bytes.len() as u64,
        })
    }
}

impl ProcessingBackend for LocalBackend {
    fn name(&self) -> &'static str {
        self.name
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

        let source = load_oriented(input)?;
        let keep_alpha = source.color().has_alpha();

        sizes
            .variants()
            .map(|v| self.write_size(&source, keep_alpha, v.category, v.size, stem, output_root))
            .collect()
    }
}
