//! simile-rank: similarity scoring, ranking, and weight optimization.
//!
//! Consumes the immutable feature vectors produced by
//! `simile-pipeline` and provides: interchangeable histogram distances,
//! fixed and adaptive weight profiles, basic and enhanced weighted
//! scores, candidate ranking, and an exhaustive cross-validated weight
//! grid search. Like the pipeline crate it performs no I/O; parallelism
//! is confined to the grid search and reported through a pluggable
//! observer.

pub mod dataset;
pub mod distance;
pub mod optimize;
pub mod score;
pub mod weights;

pub use dataset::{DatasetEntry, category_from_filename};
pub use distance::HistogramDistance;
pub use optimize::{
    NullObserver, OptimizationOutcome, RankError, SearchObserver, WeightGrid, grid_search,
    leave_one_out_accuracy,
};
pub use score::{ScoredIndex, basic_score, enhanced_score, rank};
pub use weights::{WeightProfile, WeightProfileKind};
