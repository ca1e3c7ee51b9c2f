//! Weighted similarity scoring between feature vectors.
//!
//! Scores are dissimilarities: lower means more alike, and zero means
//! the weighted channels agree exactly (up to the Bhattacharyya
//! offset). The basic score covers the classic channels; the enhanced
//! score adds quadrant histograms, histogram moments, and texture
//! statistics on top of it.

use serde::{Deserialize, Serialize};
use simile_pipeline::FeatureVector;

use crate::distance::HistogramDistance;
use crate::weights::WeightProfile;

/// Normalizers bringing each moment difference into roughly [0, 1]
/// before averaging. Variance spans [0, ~16k] for 8-bit intensities,
/// entropy spans [0, 8] bits.
pub const MOMENT_VARIANCE_SCALE: f64 = 5000.0;
/// Skewness differences are clamped after dividing by this.
pub const MOMENT_SKEWNESS_SCALE: f64 = 2.0;
/// Kurtosis differences are clamped after dividing by this.
pub const MOMENT_KURTOSIS_SCALE: f64 = 5.0;
/// Entropy differences are divided by the 8-bit maximum.
pub const MOMENT_ENTROPY_SCALE: f64 = 8.0;

/// Scale matching the texture-factor normalization used for profile
/// selection; see [`crate::weights::TEXTURE_FACTOR_SCALE`].
const TEXTURE_DIFF_SCALE: f64 = crate::weights::TEXTURE_FACTOR_SCALE;

/// Weighted dissimilarity over the basic feature channels.
///
/// Sum of: global-histogram distance, absolute channel-ratio
/// differences, gradient-norm difference, edge-density difference, and
/// a flat penalty when exactly one of the two images is color.
#[must_use]
pub fn basic_score(
    a: &FeatureVector,
    b: &FeatureVector,
    distance: HistogramDistance,
    weights: &WeightProfile,
) -> f64 {
    let mismatch = if a.is_color == b.is_color { 0.0 } else { 1.0 };

    weights.hist_global * distance.between(&a.histogram, &b.histogram)
        + weights.red * (a.color_ratios[0] - b.color_ratios[0]).abs()
        + weights.green * (a.color_ratios[1] - b.color_ratios[1]).abs()
        + weights.blue * (a.color_ratios[2] - b.color_ratios[2]).abs()
        + weights.gradient_norm * (a.gradient_norm_mean - b.gradient_norm_mean).abs()
        + weights.contour * (a.edge_density - b.edge_density).abs()
        + weights.color_mismatch * mismatch
}

/// Basic score plus quadrant-histogram, moment, and texture terms.
#[must_use]
pub fn enhanced_score(
    a: &FeatureVector,
    b: &FeatureVector,
    distance: HistogramDistance,
    weights: &WeightProfile,
) -> f64 {
    let local: f64 = a
        .quadrants
        .iter()
        .zip(&b.quadrants)
        .map(|(qa, qb)| distance.between(qa, qb))
        .sum::<f64>()
        / 4.0;

    basic_score(a, b, distance, weights)
        + weights.hist_local * local
        + weights.moments * moment_difference(a, b)
        + weights.texture * texture_difference(a, b)
}

/// Mean of the four normalized moment differences, each clamped to 1.
fn moment_difference(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let terms = [
        ((a.moments.variance - b.moments.variance).abs() / MOMENT_VARIANCE_SCALE).min(1.0),
        ((a.moments.skewness - b.moments.skewness).abs() / MOMENT_SKEWNESS_SCALE).min(1.0),
        ((a.moments.kurtosis - b.moments.kurtosis).abs() / MOMENT_KURTOSIS_SCALE).min(1.0),
        ((a.moments.entropy - b.moments.entropy).abs() / MOMENT_ENTROPY_SCALE).min(1.0),
    ];
    terms.iter().sum::<f64>() / 4.0
}

/// Mean of the normalized gradient-variance difference and the
/// edge-coherence difference (already in [0, 1]).
fn texture_difference(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let variance = ((a.gradient_variance - b.gradient_variance).abs() * TEXTURE_DIFF_SCALE).min(1.0);
    let coherence = (a.edge_coherence - b.edge_coherence).abs();
    (variance + coherence) / 2.0
}

/// One candidate's position in a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndex {
    /// Index into the candidate slice passed to [`rank`].
    pub index: usize,
    /// Dissimilarity to the reference; lower is better.
    pub score: f64,
}

/// Score every candidate against the reference and sort ascending.
///
/// Equal scores keep their input order (the sort is stable), so results
/// are deterministic for a fixed candidate slice.
#[must_use]
pub fn rank(
    reference: &FeatureVector,
    candidates: &[FeatureVector],
    distance: HistogramDistance,
    weights: &WeightProfile,
    enhanced: bool,
) -> Vec<ScoredIndex> {
    let mut scored: Vec<ScoredIndex> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let score = if enhanced {
                enhanced_score(reference, candidate, distance, weights)
            } else {
                basic_score(reference, candidate, distance, weights)
            };
            ScoredIndex { index, score }
        })
        .collect();
    scored.sort_by(|a, b| a.score.total_cmp(&b.score));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use simile_pipeline::{Histogram, HistogramMoments};

    fn features_with_spike(bin: usize) -> FeatureVector {
        let mut counts = [0_u64; Histogram::BINS];
        counts[bin] = 1;
        let histogram = Histogram::from_counts(&counts);
        FeatureVector {
            width: 8,
            height: 8,
            color_ratios: [1.0 / 3.0; 3],
            histogram: histogram.clone(),
            quadrants: [
                histogram.clone(),
                histogram.clone(),
                histogram.clone(),
                histogram,
            ],
            ..FeatureVector::default()
        }
    }

    #[test]
    fn identical_features_score_zero() {
        // Comparing an image's features with themselves.
        let features = features_with_spike(100);
        let weights = WeightProfile::default();
        let basic = basic_score(
            &features,
            &features,
            HistogramDistance::Euclidean,
            &weights,
        );
        let enhanced = enhanced_score(
            &features,
            &features,
            HistogramDistance::Euclidean,
            &weights,
        );
        assert!(basic.abs() < 1e-12, "basic self-score {basic}");
        assert!(enhanced.abs() < 1e-12, "enhanced self-score {enhanced}");
    }

    #[test]
    fn color_mismatch_adds_flat_penalty() {
        let gray = features_with_spike(50);
        let color = FeatureVector {
            is_color: true,
            ..gray.clone()
        };
        let weights = WeightProfile::default();
        let same = basic_score(&gray, &gray, HistogramDistance::Euclidean, &weights);
        let mixed = basic_score(&gray, &color, HistogramDistance::Euclidean, &weights);
        assert!(
            (mixed - same - weights.color_mismatch).abs() < 1e-12,
            "penalty should be exactly the mismatch weight: {mixed} vs {same}",
        );
    }

    #[test]
    fn zero_weights_ignore_channel_differences() {
        let a = features_with_spike(10);
        let mut b = features_with_spike(10);
        b.edge_density = 0.9;
        b.gradient_norm_mean = 0.7;
        let weights = WeightProfile {
            gradient_norm: 0.0,
            contour: 0.0,
            ..WeightProfile::default()
        };
        let score = basic_score(&a, &b, HistogramDistance::Euclidean, &weights);
        assert!(score.abs() < 1e-12, "zeroed channels still scored: {score}");
    }

    #[test]
    fn enhanced_score_sees_quadrant_differences_basic_misses() {
        // Same global histogram, permuted quadrants.
        let a = features_with_spike(10);
        let mut b = a.clone();
        let mut counts = [0_u64; Histogram::BINS];
        counts[200] = 1;
        b.quadrants[0] = Histogram::from_counts(&counts);
        b.quadrants[1] = Histogram::from_counts(&counts);

        let weights = WeightProfile {
            hist_local: 0.5,
            ..WeightProfile::default()
        };
        let basic = basic_score(&a, &b, HistogramDistance::Euclidean, &weights);
        let enhanced = enhanced_score(&a, &b, HistogramDistance::Euclidean, &weights);
        assert!(basic.abs() < 1e-12);
        assert!(enhanced > 0.0, "quadrant permutation went unnoticed");
    }

    #[test]
    fn moment_terms_are_clamped() {
        let a = features_with_spike(10);
        let mut b = a.clone();
        // Absurdly large moment gaps must each cap at 1, so the moment
        // term caps at 1 and the weighted contribution at the weight.
        b.moments = HistogramMoments {
            mean: 0.0,
            variance: 1.0e9,
            skewness: 100.0,
            kurtosis: 500.0,
            entropy: 8.0,
        };
        let weights = WeightProfile {
            moments: 1.0,
            ..WeightProfile::default()
        };
        let enhanced = enhanced_score(&a, &b, HistogramDistance::Euclidean, &weights);
        assert!(
            enhanced <= weights.moments + 1e-9,
            "moment term escaped its clamp: {enhanced}",
        );
    }

    #[test]
    fn rank_orders_by_ascending_score() {
        let reference = features_with_spike(100);
        let candidates = vec![
            features_with_spike(180),
            features_with_spike(100),
            features_with_spike(110),
        ];
        let ranked = rank(
            &reference,
            &candidates,
            HistogramDistance::EarthMover,
            &WeightProfile::default(),
            false,
        );
        let order: Vec<usize> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(ranked[0].score <= ranked[1].score);
        assert!(ranked[1].score <= ranked[2].score);
    }

    #[test]
    fn rank_is_stable_for_equal_scores() {
        let reference = features_with_spike(100);
        let candidates = vec![features_with_spike(42), features_with_spike(42)];
        let ranked = rank(
            &reference,
            &candidates,
            HistogramDistance::Euclidean,
            &WeightProfile::default(),
            true,
        );
        assert_eq!(ranked[0].index, 0);
        assert_eq!(ranked[1].index, 1);
    }
}
