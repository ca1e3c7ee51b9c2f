//! simile-pipeline: Pure visual-descriptor extraction (sans-IO).
//!
//! Turns a decoded raster image into one immutable [`FeatureVector`]
//! through: grayscale conversion -> optional smoothing -> Sobel
//! gradients -> edge detection (NMS + hysteresis) -> histograms ->
//! moments -> texture statistics.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and byte slices and returns structured data. File and
//! directory handling live in the `simile` CLI crate.

pub mod edge;
pub mod gradient;
pub mod grayscale;
pub mod histogram;
pub mod moments;
pub mod smooth;
pub mod texture;
pub mod types;

pub use grayscale::{ColorStats, decode_image};
pub use types::{
    ExtractionConfig, FeatureVector, FormatTag, GrayImage, Histogram, HistogramMoments,
    PipelineError, RgbImage, SourceImage,
};

/// Extract the full feature record from a decoded image.
///
/// Total for any decoded input: degenerate cases (empty regions,
/// zero-sum channels, zero-variance histograms) substitute their
/// defined fallbacks instead of failing, so the only fallible boundary
/// is decoding itself.
///
/// # Pipeline steps
///
/// 1. Grayscale conversion with channel statistics (color sources only)
/// 2. Optional 3x3 mean filter
/// 3. Sobel gradients (zeroed borders)
/// 4. Normalized gradient magnitude and its interior mean
/// 5. Non-maximum suppression + hysteresis edge map and density
/// 6. Global histogram and its moments
/// 7. Quadrant histograms
/// 8. Gradient variance and edge coherence
#[must_use = "returns the extracted feature vector"]
pub fn extract_features(source: &SourceImage, config: &ExtractionConfig) -> FeatureVector {
    // 1. Reduce to a single intensity channel.
    let (gray, stats) = match source {
        SourceImage::Grayscale(img) => (img.clone(), ColorStats::grayscale()),
        SourceImage::Color(img) => grayscale::grayscale_with_stats(img),
    };
    let (width, height) = gray.dimensions();

    // 2. Optional smoothing.
    let gray = if config.smooth {
        smooth::mean_filter(&gray)
    } else {
        gray
    };

    // 3 + 4. Gradients and normalized magnitude.
    let field = gradient::sobel(&gray);
    let magnitude = edge::normalized_magnitude(&field);

    // 5. Edge map.
    let edges = edge::detect_edges(&field, &magnitude.plane, config.edge_threshold);

    // 6 + 7. Histograms and moments.
    let hist = histogram::global_histogram(&gray);
    let quadrants = histogram::quadrant_histograms(&gray);
    let moments = moments::histogram_moments(&hist);

    // 8. Texture.
    let gradient_variance = texture::gradient_variance(&magnitude.plane);
    let edge_coherence = texture::edge_coherence(&edges.map);

    FeatureVector {
        width,
        height,
        gradient_norm_mean: magnitude.interior_mean,
        edge_density: edges.density,
        color_ratios: stats.ratios,
        is_color: stats.is_color,
        histogram: hist,
        quadrants,
        moments,
        gradient_variance,
        edge_coherence,
    }
}

/// Decode tagged bytes and extract features in one step.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`],
/// [`PipelineError::UnsupportedFormat`], or
/// [`PipelineError::ImageDecode`] when decoding fails; extraction
/// itself cannot fail.
pub fn extract_from_bytes(
    bytes: &[u8],
    tag: FormatTag,
    config: &ExtractionConfig,
) -> Result<FeatureVector, PipelineError> {
    let source = decode_image(bytes, tag)?;
    Ok(extract_features(&source, config))
}
