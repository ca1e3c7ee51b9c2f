//! Exhaustive weight-grid search with leave-one-out cross-validation.
//!
//! Every combination of the grid's candidate weight values is scored
//! by leave-one-out accuracy@k over a labeled dataset: each entry in
//! turn becomes the query, the rest are ranked against it with the
//! basic score, and the query counts as a hit when any of its top `k`
//! neighbors shares its category. Combinations are evaluated in
//! parallel; the winner is picked by a deterministic sequential pass
//! (highest accuracy, then lowest mean pairwise score, then earliest
//! grid position).

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::DatasetEntry;
use crate::distance::HistogramDistance;
use crate::score::basic_score;
use crate::weights::WeightProfile;

/// Errors from ranking and optimization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    /// Cross-validation needs at least two labeled entries.
    #[error("dataset must contain at least two entries")]
    EmptyDataset,

    /// Every grid dimension needs at least one candidate value.
    #[error("weight grid has an empty dimension")]
    EmptyGrid,

    /// The observer requested cancellation mid-search.
    #[error("optimization cancelled")]
    Cancelled,
}

/// Candidate values per weight dimension.
///
/// The three color channels draw independently from one shared
/// candidate list, so asymmetric channel weightings are part of the
/// search space; the enhanced-only weights are not searched and stay
/// zero in every combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightGrid {
    /// Candidates for the global-histogram weight.
    pub hist: Vec<f64>,
    /// Candidates for the red, green, and blue weights, each varied
    /// independently.
    pub color_channel: Vec<f64>,
    /// Candidates for the gradient-norm weight.
    pub gradient_norm: Vec<f64>,
    /// Candidates for the edge-density weight.
    pub contour: Vec<f64>,
    /// Candidates for the color-mismatch penalty.
    pub color_mismatch: Vec<f64>,
}

impl Default for WeightGrid {
    fn default() -> Self {
        Self {
            hist: vec![0.5, 1.0, 1.5, 2.0],
            color_channel: vec![0.05, 0.1, 0.2, 0.3],
            gradient_norm: vec![0.1, 0.2, 0.3, 0.4],
            contour: vec![0.1, 0.2, 0.3],
            color_mismatch: vec![0.05, 0.1, 0.2, 0.3],
        }
    }
}

impl WeightGrid {
    /// Number of combinations the grid expands to.
    #[must_use]
    pub fn combination_count(&self) -> usize {
        self.hist.len()
            * self.color_channel.len().pow(3)
            * self.gradient_norm.len()
            * self.contour.len()
            * self.color_mismatch.len()
    }

    /// Expand the grid into concrete weight profiles, in grid order.
    fn combinations(&self) -> Vec<WeightProfile> {
        let mut profiles = Vec::with_capacity(self.combination_count());
        for &hist_global in &self.hist {
            for &red in &self.color_channel {
                for &green in &self.color_channel {
                    for &blue in &self.color_channel {
                        for &gradient_norm in &self.gradient_norm {
                            for &contour in &self.contour {
                                for &color_mismatch in &self.color_mismatch {
                                    profiles.push(WeightProfile {
                                        hist_global,
                                        hist_local: 0.0,
                                        moments: 0.0,
                                        red,
                                        green,
                                        blue,
                                        gradient_norm,
                                        contour,
                                        texture: 0.0,
                                        color_mismatch,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        profiles
    }
}

/// Progress and cancellation hooks for the grid search.
///
/// Callbacks run on rayon worker threads, so implementations must be
/// `Sync`. The defaults do nothing and never cancel.
pub trait SearchObserver: Sync {
    /// Called after each combination finishes, with the running count.
    fn combination_done(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Polled before each combination; returning `true` aborts the
    /// search with [`RankError::Cancelled`].
    fn cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

/// The winning combination and its cross-validation statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Best weight profile found.
    pub profile: WeightProfile,
    /// Leave-one-out accuracy@k of the winner, in [0, 1].
    pub accuracy: f64,
    /// Mean pairwise basic score under the winner (the tiebreaker).
    pub mean_score: f64,
    /// Number of combinations evaluated.
    pub combinations: usize,
}

#[derive(Debug, Clone, Copy)]
struct Evaluation {
    accuracy: f64,
    mean_score: f64,
}

/// Leave-one-out accuracy@k of one weight profile over the dataset.
///
/// Each entry is scored against every other entry; a hit means at
/// least one of the `k` lowest-scoring neighbors shares the query's
/// category.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn leave_one_out_accuracy(
    dataset: &[DatasetEntry],
    k: usize,
    distance: HistogramDistance,
    weights: &WeightProfile,
) -> f64 {
    if dataset.len() < 2 || k == 0 {
        return 0.0;
    }

    let mut hits = 0_usize;
    for (query_index, query) in dataset.iter().enumerate() {
        let mut neighbors: Vec<(usize, f64)> = dataset
            .iter()
            .enumerate()
            .filter(|&(other_index, _)| other_index != query_index)
            .map(|(other_index, other)| {
                (
                    other_index,
                    basic_score(&query.features, &other.features, distance, weights),
                )
            })
            .collect();
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));

        let hit = neighbors
            .iter()
            .take(k)
            .any(|&(other_index, _)| dataset[other_index].category == query.category);
        if hit {
            hits += 1;
        }
    }

    hits as f64 / dataset.len() as f64
}

/// Mean basic score over all unordered pairs of dataset entries.
#[allow(clippy::cast_precision_loss)]
fn mean_pairwise_score(
    dataset: &[DatasetEntry],
    distance: HistogramDistance,
    weights: &WeightProfile,
) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0_usize;
    for (i, a) in dataset.iter().enumerate() {
        for b in &dataset[i + 1..] {
            total += basic_score(&a.features, &b.features, distance, weights);
            pairs += 1;
        }
    }
    if pairs == 0 { 0.0 } else { total / pairs as f64 }
}

/// Search the full weight grid for the combination with the best
/// leave-one-out accuracy@k.
///
/// Ties on accuracy fall to the lower mean pairwise score; exact ties
/// on both keep the earlier grid position, so the outcome is
/// deterministic regardless of evaluation order.
///
/// # Errors
///
/// [`RankError::EmptyDataset`] when the dataset has fewer than two
/// entries, [`RankError::EmptyGrid`] when any grid dimension is empty,
/// and [`RankError::Cancelled`] when the observer requests a stop.
pub fn grid_search(
    dataset: &[DatasetEntry],
    grid: &WeightGrid,
    k: usize,
    distance: HistogramDistance,
    observer: &dyn SearchObserver,
) -> Result<OptimizationOutcome, RankError> {
    if dataset.len() < 2 {
        return Err(RankError::EmptyDataset);
    }
    if grid.combination_count() == 0 {
        return Err(RankError::EmptyGrid);
    }

    let profiles = grid.combinations();
    let total = profiles.len();
    let completed = AtomicUsize::new(0);

    let evaluations: Option<Vec<Evaluation>> = profiles
        .par_iter()
        .map(|profile| {
            if observer.cancelled() {
                return None;
            }
            let evaluation = Evaluation {
                accuracy: leave_one_out_accuracy(dataset, k, distance, profile),
                mean_score: mean_pairwise_score(dataset, distance, profile),
            };
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            observer.combination_done(done, total);
            Some(evaluation)
        })
        .collect();
    let evaluations = evaluations.ok_or(RankError::Cancelled)?;

    // Deterministic winner selection, independent of thread scheduling.
    let mut best_index = 0_usize;
    for (index, evaluation) in evaluations.iter().enumerate().skip(1) {
        let best = &evaluations[best_index];
        let better = match evaluation.accuracy.total_cmp(&best.accuracy) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => evaluation.mean_score < best.mean_score,
            std::cmp::Ordering::Less => false,
        };
        if better {
            best_index = index;
        }
    }

    Ok(OptimizationOutcome {
        profile: profiles[best_index],
        accuracy: evaluations[best_index].accuracy,
        mean_score: evaluations[best_index].mean_score,
        combinations: total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use simile_pipeline::{FeatureVector, Histogram};

    fn entry(name: &str, bin: usize) -> DatasetEntry {
        let mut counts = [0_u64; Histogram::BINS];
        counts[bin] = 1;
        let histogram = Histogram::from_counts(&counts);
        DatasetEntry::new(
            name,
            FeatureVector {
                width: 4,
                height: 4,
                color_ratios: [1.0 / 3.0; 3],
                histogram,
                ..FeatureVector::default()
            },
        )
    }

    fn two_category_dataset() -> Vec<DatasetEntry> {
        vec![
            entry("alpha1.png", 10),
            entry("alpha2.png", 12),
            entry("beta1.png", 200),
            entry("beta2.png", 202),
        ]
    }

    fn tiny_grid() -> WeightGrid {
        WeightGrid {
            hist: vec![0.5, 1.0],
            color_channel: vec![0.05],
            gradient_norm: vec![0.1],
            contour: vec![0.2],
            color_mismatch: vec![0.1],
        }
    }

    #[test]
    fn default_grid_expands_to_all_combinations() {
        // Four candidates per color channel, each varied independently.
        let grid = WeightGrid::default();
        assert_eq!(grid.combination_count(), 4 * 4 * 4 * 4 * 4 * 3 * 4);
        assert_eq!(grid.combinations().len(), grid.combination_count());
    }

    #[test]
    fn channel_weights_vary_independently() {
        let grid = WeightGrid {
            color_channel: vec![0.1, 0.2],
            ..tiny_grid()
        };
        let profiles = grid.combinations();
        assert_eq!(profiles.len(), 2 * 2 * 2 * 2);
        // Every (red, green, blue) assignment appears, including the
        // asymmetric ones.
        assert!(profiles.iter().any(|p| {
            (p.red - 0.1).abs() < 1e-12
                && (p.green - 0.2).abs() < 1e-12
                && (p.blue - 0.1).abs() < 1e-12
        }));
        assert!(
            profiles
                .iter()
                .any(|p| (p.red - p.green).abs() > 1e-12 || (p.green - p.blue).abs() > 1e-12),
            "no combination weighted the channels asymmetrically",
        );
    }

    #[test]
    fn accuracy_counts_category_hits_in_top_k() {
        // alpha1 and alpha2 are each other's nearest neighbors; beta1
        // is equidistant from both alphas (disjoint spikes), so its
        // top-1 neighbor is alpha1 by input order and it misses.
        let dataset = vec![
            entry("alpha1.png", 10),
            entry("alpha2.png", 12),
            entry("beta1.png", 200),
        ];
        let accuracy = leave_one_out_accuracy(
            &dataset,
            1,
            HistogramDistance::Euclidean,
            &WeightProfile::default(),
        );
        assert!(
            (accuracy - 2.0 / 3.0).abs() < 1e-12,
            "expected 2/3, got {accuracy}",
        );
    }

    #[test]
    fn separable_dataset_reaches_full_accuracy() {
        let dataset = two_category_dataset();
        let accuracy = leave_one_out_accuracy(
            &dataset,
            1,
            HistogramDistance::EarthMover,
            &WeightProfile::default(),
        );
        assert!((accuracy - 1.0).abs() < 1e-12, "got {accuracy}");
    }

    #[test]
    fn degenerate_inputs_score_zero_accuracy() {
        let dataset = two_category_dataset();
        let single = vec![entry("only1.png", 50)];
        let weights = WeightProfile::default();
        assert!(
            leave_one_out_accuracy(&single, 1, HistogramDistance::Euclidean, &weights)
                .abs()
                < f64::EPSILON,
        );
        assert!(
            leave_one_out_accuracy(&dataset, 0, HistogramDistance::Euclidean, &weights)
                .abs()
                < f64::EPSILON,
        );
    }

    #[test]
    fn grid_search_breaks_accuracy_ties_by_lower_mean_score() {
        // Both hist candidates separate the categories perfectly, so
        // the tie falls to the combination with the smaller mean
        // pairwise score, which is the smaller hist weight.
        let dataset = two_category_dataset();
        let outcome = grid_search(
            &dataset,
            &tiny_grid(),
            1,
            HistogramDistance::EarthMover,
            &NullObserver,
        )
        .unwrap();
        assert!((outcome.accuracy - 1.0).abs() < 1e-12);
        assert!((outcome.profile.hist_global - 0.5).abs() < 1e-12);
        assert_eq!(outcome.combinations, 2);
    }

    #[test]
    fn grid_search_prefers_higher_accuracy_over_lower_score() {
        // Categories differ only by edge density, so only a positive
        // contour weight separates them. The zero-contour combination
        // has the lower mean score (zero) but must lose on accuracy.
        fn edge_entry(name: &str, density: f64) -> DatasetEntry {
            DatasetEntry::new(
                name,
                FeatureVector {
                    edge_density: density,
                    ..FeatureVector::default()
                },
            )
        }
        let dataset = vec![
            edge_entry("flat1.png", 0.05),
            edge_entry("flat2.png", 0.06),
            edge_entry("busy1.png", 0.80),
            edge_entry("busy2.png", 0.82),
        ];
        let grid = WeightGrid {
            hist: vec![0.0],
            color_channel: vec![0.0],
            gradient_norm: vec![0.0],
            contour: vec![0.0, 0.3],
            color_mismatch: vec![0.0],
        };
        let outcome = grid_search(
            &dataset,
            &grid,
            1,
            HistogramDistance::Euclidean,
            &NullObserver,
        )
        .unwrap();
        assert!((outcome.profile.contour - 0.3).abs() < 1e-12);
        assert!((outcome.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn grid_search_rejects_tiny_datasets() {
        let single = vec![entry("only1.png", 50)];
        let result = grid_search(
            &single,
            &tiny_grid(),
            1,
            HistogramDistance::Euclidean,
            &NullObserver,
        );
        assert_eq!(result.unwrap_err(), RankError::EmptyDataset);
    }

    #[test]
    fn grid_search_rejects_empty_grid_dimensions() {
        let grid = WeightGrid {
            contour: Vec::new(),
            ..tiny_grid()
        };
        let result = grid_search(
            &two_category_dataset(),
            &grid,
            1,
            HistogramDistance::Euclidean,
            &NullObserver,
        );
        assert_eq!(result.unwrap_err(), RankError::EmptyGrid);
    }

    #[test]
    fn cancellation_aborts_the_search() {
        struct AlwaysCancel;
        impl SearchObserver for AlwaysCancel {
            fn cancelled(&self) -> bool {
                true
            }
        }
        let result = grid_search(
            &two_category_dataset(),
            &tiny_grid(),
            1,
            HistogramDistance::Euclidean,
            &AlwaysCancel,
        );
        assert_eq!(result.unwrap_err(), RankError::Cancelled);
    }

    #[test]
    fn observer_sees_every_combination() {
        struct Counter(AtomicUsize);
        impl SearchObserver for Counter {
            fn combination_done(&self, _completed: usize, _total: usize) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
        let counter = Counter(AtomicUsize::new(0));
        let outcome = grid_search(
            &two_category_dataset(),
            &tiny_grid(),
            1,
            HistogramDistance::Euclidean,
            &counter,
        )
        .unwrap();
        assert_eq!(counter.0.load(Ordering::Relaxed), outcome.combinations);
    }
}
