//! Labeled feature datasets for cross-validated weight search.
//!
//! A dataset is a flat list of entries, each carrying its source
//! filename, a category label derived from that filename, and the
//! extracted features. Categories come from the file stem with any
//! trailing digits removed, so `cat1.png`, `cat2.png`, and `cat17.png`
//! all label as `cat`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use simile_pipeline::FeatureVector;

/// One labeled image in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Source filename, without directory components.
    pub filename: String,
    /// Category label; see [`category_from_filename`].
    pub category: String,
    /// Extracted visual descriptors.
    pub features: FeatureVector,
}

impl DatasetEntry {
    /// Build an entry, deriving the category from the filename.
    #[must_use]
    pub fn new(filename: impl Into<String>, features: FeatureVector) -> Self {
        let filename = filename.into();
        let category = category_from_filename(&filename);
        Self {
            filename,
            category,
            features,
        }
    }
}

/// Derive a category label from a filename.
///
/// Takes the file stem (final extension stripped) and trims trailing
/// ASCII digits. A stem that is all digits labels as the empty string,
/// which still groups such files together.
#[must_use]
pub fn category_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map_or(filename, |stem| stem.to_str().unwrap_or(filename));
    stem.trim_end_matches(|c: char| c.is_ascii_digit()).to_owned()
}
