//! Shared types for the simile feature-extraction pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference decoded
/// color data without depending on `image` directly.
pub use image::RgbImage;

/// A normalized 256-bin intensity histogram.
///
/// Bins are probability-like: non-negative and summing to 1, except for
/// the degenerate empty-region case where every bin is zero. Constructed
/// through [`Histogram::from_counts`], which performs the normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram([f64; Self::BINS]);

impl Histogram {
    /// Number of intensity bins (one per 8-bit gray level).
    pub const BINS: usize = 256;

    /// The all-zero histogram, used as the fallback for empty regions.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0.0; Self::BINS])
    }

    /// Normalize raw bin counts into a probability-like histogram.
    ///
    /// Returns [`Histogram::zero`] when the counts sum to zero, so an
    /// empty region never divides by zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(counts: &[u64; Self::BINS]) -> Self {
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return Self::zero();
        }
        let mut bins = [0.0; Self::BINS];
        for (bin, &count) in bins.iter_mut().zip(counts) {
            *bin = count as f64 / total as f64;
        }
        Self(bins)
    }

    /// Borrow the bin values.
    #[must_use]
    pub const fn bins(&self) -> &[f64; Self::BINS] {
        &self.0
    }

    /// Sum of all bins: 1 for a populated histogram, 0 for the
    /// degenerate case.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Returns `true` if every bin is zero (empty source region).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::zero()
    }
}

// `[f64; 256]` has no serde impls, so histograms cross serialization
// boundaries as a plain `Vec<f64>` of length 256.
impl Serialize for Histogram {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Histogram {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bins = Vec::<f64>::deserialize(deserializer)?;
        let bins: [f64; Self::BINS] = bins
            .try_into()
            .map_err(|_| serde::de::Error::custom("histogram must have exactly 256 bins"))?;
        Ok(Self(bins))
    }
}

/// Statistical moments of a 256-bin histogram treated as a discrete
/// distribution over intensities 0–255.
///
/// `kurtosis` is excess kurtosis (a normal distribution scores 0);
/// `entropy` is in bits. Skewness and kurtosis are 0 for zero-variance
/// histograms rather than undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistogramMoments {
    /// Mean intensity.
    pub mean: f64,
    /// Variance of intensity.
    pub variance: f64,
    /// Third standardized moment.
    pub skewness: f64,
    /// Fourth standardized moment minus 3 (excess kurtosis).
    pub kurtosis: f64,
    /// Shannon entropy in bits.
    pub entropy: f64,
}

/// Per-image visual descriptor record.
///
/// Produced once by [`extract_features`](crate::extract_features) and
/// immutable thereafter; the scoring layer treats it as shared,
/// read-only data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Source image width in pixels.
    pub width: u32,
    /// Source image height in pixels.
    pub height: u32,
    /// Mean of the normalized gradient magnitude over interior pixels.
    pub gradient_norm_mean: f64,
    /// Accepted-edge pixels divided by interior pixel count.
    pub edge_density: f64,
    /// R/G/B channel energy ratios; sum to 1 (1/3 each when degenerate
    /// or when the source was already grayscale).
    pub color_ratios: [f64; 3],
    /// Whether the channel-fraction spread classifies the image as color.
    pub is_color: bool,
    /// Global normalized intensity histogram.
    pub histogram: Histogram,
    /// Quadrant histograms: top-left, top-right, bottom-left,
    /// bottom-right. Each is independently normalized and the four
    /// regions partition the image exactly.
    pub quadrants: [Histogram; 4],
    /// Moments of the global histogram.
    pub moments: HistogramMoments,
    /// Variance of the normalized gradient magnitude over interior pixels.
    pub gradient_variance: f64,
    /// Mean fraction of edge-pixel neighbors that are also edges, in [0,1].
    pub edge_coherence: f64,
}

/// Configuration for feature extraction.
///
/// All parameters have defaults matching the reference settings; the
/// CLI pulls its flag defaults from the `DEFAULT_*` constants so the
/// two cannot silently diverge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Apply a 3x3 uniform mean filter to the grayscale image before
    /// gradient computation.
    pub smooth: bool,

    /// High hysteresis threshold on the normalized gradient magnitude.
    /// The low threshold is derived from it; see
    /// [`edge::HYSTERESIS_LOW_RATIO`](crate::edge::HYSTERESIS_LOW_RATIO).
    pub edge_threshold: f32,
}

impl ExtractionConfig {
    /// Default for [`smooth`](Self::smooth): off.
    pub const DEFAULT_SMOOTH: bool = false;

    /// Default for [`edge_threshold`](Self::edge_threshold).
    pub const DEFAULT_EDGE_THRESHOLD: f32 = 0.25;
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            smooth: Self::DEFAULT_SMOOTH,
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
        }
    }
}

/// Closed set of supported input formats.
///
/// Callers tag each file before decoding (typically from its
/// extension); the pipeline dispatches on the tag exhaustively, and
/// [`FormatTag::Unsupported`] fails immediately with a typed error
/// rather than partially computing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatTag {
    /// Single-channel intensity input (e.g. PGM).
    Grayscale,
    /// Three-channel color input (e.g. PPM, PNG, JPEG, BMP).
    Color,
    /// Recognized file, unsupported content.
    Unsupported,
}

/// A decoded input image, ready for feature extraction.
///
/// Grayscale sources skip color analysis: their channel ratios default
/// to 1/3 each and the color flag is false.
#[derive(Debug, Clone)]
pub enum SourceImage {
    /// Single-channel intensity image.
    Grayscale(GrayImage),
    /// Three-channel color image.
    Color(RgbImage),
}

impl SourceImage {
    /// Width and height of the underlying raster.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Grayscale(img) => img.dimensions(),
            Self::Color(img) => img.dimensions(),
        }
    }
}

/// Errors that can occur before extraction proper begins.
///
/// Extraction itself is total: degenerate inputs (empty regions,
/// zero-sum channels, zero-variance histograms) substitute defined
/// fallbacks instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The format tag was neither grayscale nor color.
    #[error("unsupported image format")]
    UnsupportedFormat,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Histogram tests ---

    #[test]
    fn histogram_from_counts_normalizes_to_one() {
        let mut counts = [0_u64; Histogram::BINS];
        counts[0] = 3;
        counts[128] = 5;
        counts[255] = 2;
        let hist = Histogram::from_counts(&counts);
        assert!(
            (hist.sum() - 1.0).abs() < 1e-9,
            "expected sum 1.0, got {}",
            hist.sum(),
        );
        assert!((hist.bins()[128] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn histogram_from_zero_counts_is_all_zero() {
        let counts = [0_u64; Histogram::BINS];
        let hist = Histogram::from_counts(&counts);
        assert!(hist.is_zero());
        assert!(hist.sum().abs() < f64::EPSILON);
    }

    #[test]
    fn histogram_default_is_zero() {
        assert!(Histogram::default().is_zero());
    }

    #[test]
    fn histogram_serde_round_trip() {
        let mut counts = [0_u64; Histogram::BINS];
        counts[10] = 1;
        counts[20] = 1;
        let hist = Histogram::from_counts(&counts);
        let json = serde_json::to_string(&hist).unwrap();
        let deserialized: Histogram = serde_json::from_str(&json).unwrap();
        assert_eq!(hist, deserialized);
    }

    #[test]
    fn histogram_deserialize_rejects_wrong_length() {
        let json = serde_json::to_string(&vec![0.0_f64; 255]).unwrap();
        let result: Result<Histogram, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    // --- ExtractionConfig tests ---

    #[test]
    fn config_defaults_match_constants() {
        let config = ExtractionConfig::default();
        assert_eq!(config.smooth, ExtractionConfig::DEFAULT_SMOOTH);
        assert!(
            (config.edge_threshold - ExtractionConfig::DEFAULT_EDGE_THRESHOLD).abs()
                < f32::EPSILON,
        );
    }

    #[test]
    fn config_serde_round_trip() {
        let config = ExtractionConfig {
            smooth: true,
            edge_threshold: 0.4,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- SourceImage tests ---

    #[test]
    fn source_image_dimensions() {
        let gray = SourceImage::Grayscale(GrayImage::new(17, 31));
        assert_eq!(gray.dimensions(), (17, 31));
        let color = SourceImage::Color(RgbImage::new(4, 9));
        assert_eq!(color.dimensions(), (4, 9));
    }

    // --- PipelineError tests ---

    #[test]
    fn error_empty_input_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty",
        );
    }

    #[test]
    fn error_unsupported_format_display() {
        assert_eq!(
            PipelineError::UnsupportedFormat.to_string(),
            "unsupported image format",
        );
    }
}
