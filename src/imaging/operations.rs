//! Pixel operations used by the local pipeline.
//!
//! The `image` crate covers resampling and blur; the unsharp mask with an
//! *amount*, the saturation/brightness modulation and contrast are done here
//! on RGBA8 buffers. Alpha is never modified.

use super::params::{ColorAdjust, UnsharpMask};
use image::{DynamicImage, RgbaImage};

/// Classic unsharp mask: `out = in + amount * (in - blur(in))`, skipping
/// channels whose difference is below `threshold` (fraction of 255).
pub fn unsharp_mask(img: &DynamicImage, mask: UnsharpMask) -> DynamicImage {
    if mask.amount <= 0.0 || mask.sigma <= 0.0 {
        return img.clone();
    }
    let original = img.to_rgba8();
    let blurred = img.blur(mask.sigma).to_rgba8();
    let threshold = mask.threshold * 255.0;

    let mut out = original.clone();
    for (dst, (src, soft)) in out
        .pixels_mut()
        .zip(original.pixels().zip(blurred.pixels()))
    {
        for c in 0..3 {
            let value = src.0[c] as f32;
            let diff = value - soft.0[c] as f32;
            if diff.abs() >= threshold {
                dst.0[c] = clamp_channel(value + mask.amount * diff);
            }
        }
    }
    DynamicImage::ImageRgba8(out)
}

/// Scale saturation around Rec.601 luma, then scale brightness.
pub fn modulate(img: &mut RgbaImage, saturation: f32, brightness: f32) {
    for pixel in img.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        for (c, value) in [r, g, b].into_iter().enumerate() {
            let saturated = luma + (value - luma) * saturation;
            pixel.0[c] = clamp_channel(saturated * brightness);
        }
    }
}

/// Stretch color channels around mid-gray. `contrast` is a percentage with
/// the same scale as `DynamicImage::adjust_contrast`.
pub fn contrast(img: &mut RgbaImage, contrast: f32) {
    let factor = ((100.0 + contrast) / 100.0).powi(2);
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            pixel.0[c] = clamp_channel(((value - 0.5) * factor + 0.5) * 255.0);
        }
    }
}

/// Apply the full color adjustment of a profile.
pub fn adjust_color(img: DynamicImage, color: &ColorAdjust) -> DynamicImage {
    let mut rgba = img.into_rgba8();
    modulate(&mut rgba, color.saturation, color.brightness);
    if let Some(amount) = color.contrast.filter(|c| *c != 0.0) {
        contrast(&mut rgba, amount);
    }
    DynamicImage::ImageRgba8(rgba)
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
