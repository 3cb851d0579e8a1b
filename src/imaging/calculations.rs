//! Pure decision functions for the local pipeline.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{FilterChoice, SharpeningPolicy, UnsharpMask};
use image::imageops::FilterType;

/// Whether a source of `source_width` should be resampled to `target_width`.
///
/// Only downsizes: a source narrower than or equal to the target is left at
/// its own size.
pub fn should_resize(source_width: u32, target_width: u32) -> bool {
    source_width > target_width
}

/// Output dimensions for a proportional resize to `target_width`.
///
/// Returns the source dimensions untouched when no resize applies.
///
/// # Examples
/// ```
/// # use webp_variants::imaging::calculations::output_dimensions;
/// assert_eq!(output_dimensions((2000, 1500), 400), (400, 300));
/// assert_eq!(output_dimensions((300, 200), 400), (300, 200));
/// ```
pub fn output_dimensions(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if !should_resize(src_w, target_width) {
        return source;
    }
    let h = (src_h as f64 * target_width as f64 / src_w as f64).round() as u32;
    (target_width, h.max(1))
}

/// Resampling filter for a target width.
pub fn select_filter(choice: &FilterChoice, target_width: u32) -> FilterType {
    if target_width <= choice.small_max_width {
        choice.small
    } else {
        choice.large
    }
}

/// Unsharp mask to apply for a target width.
pub fn sharpening_for(policy: &SharpeningPolicy, target_width: u32) -> UnsharpMask {
    match policy {
        SharpeningPolicy::Fixed(mask) => *mask,
        SharpeningPolicy::Graded {
            sigma,
            threshold,
            steps,
            fallback,
        } => {
            let amount = steps
                .iter()
                .find(|(max_width, _)| target_width <= *max_width)
                .map(|(_, amount)| *amount)
                .unwrap_or(*fallback);
            UnsharpMask {
                sigma: *sigma,
                amount,
                threshold: *threshold,
            }
        }
    }
}

/// Whether `quality` selects lossless encoding.
pub fn is_lossless(lossless_threshold: Option<u8>, quality: u8) -> bool {
    lossless_threshold.is_some_and(|t| quality >= t)
}
