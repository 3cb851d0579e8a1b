//! Size configuration: which variants to produce for every source image.
//!
//! A [`SizeConfiguration`] is an ordered list of named [`SizeSet`]s
//! (categories such as `thumbnails`, `grid`, `fullpage`), each holding an
//! ordered list of [`ImageSize`] targets. Category names are used verbatim in
//! output paths, so they are validated to be a single path segment.
//!
//! Everything here is read-only once built: widths and qualities pass
//! straight through to the backends, nothing in the pipeline derives or
//! adjusts them.
//!
//! ```text
//! thumbnails → [200@80, 400@80]
//! grid       → [800@82]
//! fullpage   → []            (skipped, not an error)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SizeError {
    #[error("width must be positive")]
    ZeroWidth,
    #[error("quality {0} is out of range (0-100)")]
    QualityOutOfRange(u32),
    #[error("invalid category name {0:?}: must be a non-empty single path segment")]
    InvalidCategory(String),
    #[error("duplicate category {0:?}")]
    DuplicateCategory(String),
    #[error("category {category:?} lists width {width} more than once")]
    DuplicateWidth { category: String, width: u32 },
}

/// One target variant: pixel width and encode quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImageSize", into = "RawImageSize")]
pub struct ImageSize {
    width: u32,
    quality: u8,
}

impl ImageSize {
    pub fn new(width: u32, quality: u32) -> Result<Self, SizeError> {
        if width == 0 {
            return Err(SizeError::ZeroWidth);
        }
        if quality > 100 {
            return Err(SizeError::QualityOutOfRange(quality));
        }
        Ok(Self {
            width,
            quality: quality as u8,
        })
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn quality(self) -> u8 {
        self.quality
    }
}

/// Wire shape of an [`ImageSize`] in `variants.toml`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawImageSize {
    width: u32,
    quality: u32,
}

impl TryFrom<RawImageSize> for ImageSize {
    type Error = SizeError;

    fn try_from(raw: RawImageSize) -> Result<Self, Self::Error> {
        ImageSize::new(raw.width, raw.quality)
    }
}

impl From<ImageSize> for RawImageSize {
    fn from(size: ImageSize) -> Self {
        Self {
            width: size.width,
            quality: size.quality as u32,
        }
    }
}

/// A named category of target sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSet {
    pub name: String,
    pub sizes: Vec<ImageSize>,
}

/// One concrete (category, width, quality) output to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant<'a> {
    pub category: &'a str,
    pub size: ImageSize,
}

/// Ordered collection of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeConfiguration {
    sets: Vec<SizeSet>,
}

impl SizeConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. Empty `sizes` is accepted and later skipped.
    ///
    /// Widths must be unique within the category: each (category, width)
    /// maps to exactly one output path.
    pub fn with_set(mut self, name: &str, sizes: Vec<ImageSize>) -> Result<Self, SizeError> {
        if !is_valid_category(name) {
            return Err(SizeError::InvalidCategory(name.to_string()));
        }
        if self.sets.iter().any(|s| s.name == name) {
            return Err(SizeError::DuplicateCategory(name.to_string()));
        }
        for (i, size) in sizes.iter().enumerate() {
            if sizes[..i].iter().any(|s| s.width == size.width) {
                return Err(SizeError::DuplicateWidth {
                    category: name.to_string(),
                    width: size.width,
                });
            }
        }
        self.sets.push(SizeSet {
            name: name.to_string(),
            sizes,
        });
        Ok(self)
    }

    /// Categories that actually have sizes, in insertion order.
    pub fn active_sets(&self) -> impl Iterator<Item = &SizeSet> {
        self.sets.iter().filter(|s| !s.sizes.is_empty())
    }

    /// Every variant to produce, category by category.
    pub fn variants(&self) -> impl Iterator<Item = Variant<'_>> {
        self.active_sets().flat_map(|set| {
            set.sizes.iter().map(move |&size| Variant {
                category: &set.name,
                size,
            })
        })
    }

    /// Number of output files each input produces per backend.
    pub fn variant_count(&self) -> usize {
        self.active_sets().map(|s| s.sizes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.variant_count() == 0
    }
}

fn is_valid_category(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace)
}
