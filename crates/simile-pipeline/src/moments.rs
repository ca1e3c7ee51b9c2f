//! Statistical moments of an intensity histogram.
//!
//! Treats a normalized 256-bin histogram as a discrete probability
//! distribution over intensities 0–255 and summarizes its shape:
//! mean, variance, skewness, excess kurtosis, and Shannon entropy in
//! bits. Zero-variance histograms (including the all-zero degenerate
//! case) report zero for the standardized moments instead of NaN.

use crate::types::{Histogram, HistogramMoments};

/// Bins at or below this mass are skipped by the entropy sum, keeping
/// `0 * log2(0)` out of the accumulation.
pub const ENTROPY_EPSILON: f64 = 1e-12;

/// Compute the moments of a histogram.
#[must_use = "returns the histogram moments"]
#[allow(clippy::cast_precision_loss)]
pub fn histogram_moments(hist: &Histogram) -> HistogramMoments {
    let bins = hist.bins();

    let mean: f64 = bins
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h)
        .sum();

    let variance: f64 = bins
        .iter()
        .enumerate()
        .map(|(i, &h)| (i as f64 - mean).powi(2) * h)
        .sum();

    let sigma = variance.sqrt();
    let (skewness, kurtosis) = if sigma > 0.0 {
        let skew: f64 = bins
            .iter()
            .enumerate()
            .map(|(i, &h)| ((i as f64 - mean) / sigma).powi(3) * h)
            .sum();
        let kurt: f64 = bins
            .iter()
            .enumerate()
            .map(|(i, &h)| ((i as f64 - mean) / sigma).powi(4) * h)
            .sum();
        (skew, kurt - 3.0)
    } else {
        (0.0, 0.0)
    };

    let entropy: f64 = bins
        .iter()
        .filter(|&&h| h > ENTROPY_EPSILON)
        .map(|&h| -h * h.log2())
        .sum();

    HistogramMoments {
        mean,
        variance,
        skewness,
        kurtosis,
        entropy,
    }
}
