//! Image decoding, luminance conversion, and color-channel analysis.
//!
//! This is the first step in the pipeline: tagged raw bytes in, a
//! [`SourceImage`] out. Color sources are reduced to a single intensity
//! channel with the standard luminance formula while accumulating
//! per-channel energy sums, which feed the channel-ratio features and
//! the color/monochrome classification.

use image::{GrayImage, Luma, RgbImage};

use crate::types::{FormatTag, PipelineError, SourceImage};

/// Luminance weight for the red channel.
pub const LUMA_RED: f64 = 0.299;
/// Luminance weight for the green channel.
pub const LUMA_GREEN: f64 = 0.587;
/// Luminance weight for the blue channel.
pub const LUMA_BLUE: f64 = 0.114;

/// Channel-fraction spread above which an image counts as color.
///
/// Channel sums are normalized to fractions of the total; when the gap
/// between the largest and smallest fraction stays within this bound,
/// the three channels carry near-identical energy and the image is
/// classified as monochrome.
pub const COLOR_SPREAD_THRESHOLD: f64 = 0.02;

/// Channel statistics gathered during luminance conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    /// R/G/B energy ratios; sum to 1, or 1/3 each when the total
    /// channel energy is zero.
    pub ratios: [f64; 3],
    /// Whether the channel-fraction spread exceeds
    /// [`COLOR_SPREAD_THRESHOLD`].
    pub is_color: bool,
}

impl ColorStats {
    /// Statistics for a source with no color information: uniform
    /// ratios, monochrome flag.
    #[must_use]
    pub const fn grayscale() -> Self {
        Self {
            ratios: [1.0 / 3.0; 3],
            is_color: false,
        }
    }
}

/// Decode tagged image bytes into a [`SourceImage`].
///
/// The tag is dispatched exhaustively: grayscale sources decode to a
/// single channel, color sources to RGB, and the unsupported tag fails
/// before any decoding work.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::UnsupportedFormat`] for [`FormatTag::Unsupported`],
/// and [`PipelineError::ImageDecode`] if the data is corrupt or in a
/// format the decoder does not recognize.
pub fn decode_image(bytes: &[u8], tag: FormatTag) -> Result<SourceImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    match tag {
        FormatTag::Grayscale => {
            let img = image::load_from_memory(bytes)?;
            Ok(SourceImage::Grayscale(img.to_luma8()))
        }
        FormatTag::Color => {
            let img = image::load_from_memory(bytes)?;
            Ok(SourceImage::Color(img.to_rgb8()))
        }
        FormatTag::Unsupported => Err(PipelineError::UnsupportedFormat),
    }
}

/// Convert a color image to grayscale while gathering channel statistics.
///
/// Each output pixel is `0.299*R + 0.587*G + 0.114*B`, rounded and
/// clamped to [0, 255]. Channel sums accumulate over the whole image
/// and become the ratio features; a zero total (all-black image) falls
/// back to uniform 1/3 ratios instead of dividing by zero.
#[must_use = "returns the grayscale image and channel statistics"]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn grayscale_with_stats(rgb: &RgbImage) -> (GrayImage, ColorStats) {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    let (mut r_sum, mut g_sum, mut b_sum) = (0_u64, 0_u64, 0_u64);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        r_sum += u64::from(r);
        g_sum += u64::from(g);
        b_sum += u64::from(b);

        let luma = LUMA_RED * f64::from(r) + LUMA_GREEN * f64::from(g) + LUMA_BLUE * f64::from(b);
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }

    (gray, channel_stats(r_sum, g_sum, b_sum))
}

/// Derive ratios and the color flag from accumulated channel sums.
#[allow(clippy::cast_precision_loss)]
fn channel_stats(r_sum: u64, g_sum: u64, b_sum: u64) -> ColorStats {
    let total = (r_sum + g_sum + b_sum) as f64;
    if total <= 0.0 {
        return ColorStats::grayscale();
    }

    let ratios = [
        r_sum as f64 / total,
        g_sum as f64 / total,
        b_sum as f64 / total,
    ];
    let max = ratios.iter().copied().fold(f64::MIN, f64::max);
    let min = ratios.iter().copied().fold(f64::MAX, f64::min);

    ColorStats {
        ratios,
        is_color: (max - min) > COLOR_SPREAD_THRESHOLD,
    }
}
