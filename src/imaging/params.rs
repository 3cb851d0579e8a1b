//! Tunable parameters of the local-codec pipeline.
//!
//! Both local backends run the same steps (resize → sharpen → color adjust →
//! encode). A [`LocalProfile`] describes *how strongly* each step acts; the
//! [`local_backend`](super::local_backend) module does the pixel work.
//!
//! ## Profiles
//!
//! - [`LocalProfile::tuned`]: cubic filter for small targets, sharpening
//!   that weakens as the target grows, lossless WebP from quality 85 up.
//! - [`LocalProfile::basic`]: Lanczos everywhere, fixed sharpening, always
//!   lossy.

use image::imageops::FilterType;

/// Resampling filters keyed on target width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChoice {
    /// Targets up to this width (inclusive) use `small`.
    pub small_max_width: u32,
    pub small: FilterType,
    pub large: FilterType,
}

/// Unsharp-mask parameters.
///
/// - `sigma`: radius of the Gaussian blur the mask is built from
/// - `amount`: fraction of the difference added back (0 = no-op)
/// - `threshold`: minimum difference, as a fraction of full scale, to act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub sigma: f32,
    pub amount: f32,
    pub threshold: f32,
}

/// How sharpening strength is chosen for a target width.
#[derive(Debug, Clone, PartialEq)]
pub enum SharpeningPolicy {
    /// Same mask for every width.
    Fixed(UnsharpMask),
    /// Amount taken from the first `(max_width, amount)` step whose
    /// `max_width` is ≥ the target; `fallback` beyond the last step.
    Graded {
        sigma: f32,
        threshold: f32,
        steps: Vec<(u32, f32)>,
        fallback: f32,
    },
}

/// Global color adjustment. Factors are multiplicative, 1.0 = unchanged.
/// Hue is never touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjust {
    pub saturation: f32,
    pub brightness: f32,
    /// Optional contrast pass, as a percentage (see [`contrast`](super::operations::contrast)).
    pub contrast: Option<f32>,
}

/// WebP encoder settings shared by every variant of a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    /// Quality at or above which the encoder switches to lossless.
    pub lossless_threshold: Option<u8>,
    pub alpha_quality: u8,
    /// libwebp effort, 0 (fast) to 6 (slowest, smallest).
    pub method: u8,
}

/// Complete parameter set of a local backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalProfile {
    pub filters: FilterChoice,
    pub sharpening: SharpeningPolicy,
    pub color: ColorAdjust,
    pub encode: EncodeSettings,
}

impl LocalProfile {
    pub fn tuned() -> Self {
        Self {
            filters: FilterChoice {
                small_max_width: 400,
                small: FilterType::CatmullRom,
                large: FilterType::Lanczos3,
            },
            sharpening: SharpeningPolicy::Graded {
                sigma: 0.4,
                threshold: 0.02,
                steps: vec![(400, 0.35), (800, 0.25), (1600, 0.15)],
                fallback: 0.10,
            },
            color: ColorAdjust {
                saturation: 1.02,
                brightness: 0.98,
                contrast: Some(5.0),
            },
            encode: EncodeSettings {
                lossless_threshold: Some(85),
                alpha_quality: 90,
                method: 6,
            },
        }
    }

    pub fn basic() -> Self {
        Self {
            filters: FilterChoice {
                small_max_width: 400,
                small: FilterType::Lanczos3,
                large: FilterType::Lanczos3,
            },
            sharpening: SharpeningPolicy::Fixed(UnsharpMask {
                sigma: 0.5,
                amount: 0.25,
                threshold: 0.0,
            }),
            color: ColorAdjust {
                saturation: 1.05,
                brightness: 0.98,
                contrast: Some(5.0),
            },
            encode: EncodeSettings {
                lossless_threshold: None,
                alpha_quality: 90,
                method: 6,
            },
        }
    }
}
