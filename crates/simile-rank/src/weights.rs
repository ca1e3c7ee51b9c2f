//! Weight profiles for similarity scoring, including adaptive selection.
//!
//! A [`WeightProfile`] assigns one nonnegative coefficient to every
//! scored feature channel. The fixed default mirrors the classic
//! histogram-heavy weighting; [`WeightProfile::adaptive`] instead
//! inspects a reference image's own statistics and picks one of four
//! named profiles, so a strongly textured reference leans on texture
//! channels while a flat low-contrast one leans on histograms.

use serde::{Deserialize, Serialize};
use simile_pipeline::FeatureVector;

/// Multiplier turning raw gradient variance into a [0, 1] texture factor.
pub const TEXTURE_FACTOR_SCALE: f64 = 20.0;
/// Texture factor above which a reference counts as texture-dominant.
pub const TEXTURE_FACTOR_THRESHOLD: f64 = 0.6;
/// Edge density above which a reference counts as contour-dominant.
pub const EDGE_DENSITY_THRESHOLD: f64 = 0.15;
/// Divisor turning histogram variance into a [0, 1] contrast factor.
pub const CONTRAST_FACTOR_SCALE: f64 = 5000.0;
/// Contrast factor below which a reference counts as low-contrast.
pub const CONTRAST_FACTOR_THRESHOLD: f64 = 0.3;

/// Scale applied to the per-channel color weights when the reference is
/// a true color image; grayscale references halve it.
const COLOR_IMPORTANCE_FULL: f64 = 1.0;
const COLOR_IMPORTANCE_HALF: f64 = 0.5;
/// Base per-channel color weight before importance scaling.
const COLOR_CHANNEL_BASE: f64 = 0.2;

/// Per-channel coefficients of the weighted similarity score.
///
/// `hist_local`, `moments`, and `texture` only contribute to the
/// enhanced score; the rest feed the basic score too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    /// Global-histogram distance.
    pub hist_global: f64,
    /// Mean of the four quadrant-histogram distances.
    pub hist_local: f64,
    /// Normalized histogram-moment differences.
    pub moments: f64,
    /// Red channel-ratio difference.
    pub red: f64,
    /// Green channel-ratio difference.
    pub green: f64,
    /// Blue channel-ratio difference.
    pub blue: f64,
    /// Mean-gradient-norm difference.
    pub gradient_norm: f64,
    /// Edge-density difference.
    pub contour: f64,
    /// Texture-statistic differences.
    pub texture: f64,
    /// Flat penalty when one image is color and the other is not.
    pub color_mismatch: f64,
}

impl Default for WeightProfile {
    /// The fixed histogram-heavy weighting used when no adaptation or
    /// optimization is requested.
    fn default() -> Self {
        Self {
            hist_global: 0.5,
            hist_local: 0.0,
            moments: 0.0,
            red: 0.05,
            green: 0.05,
            blue: 0.05,
            gradient_norm: 0.1,
            contour: 0.2,
            texture: 0.0,
            color_mismatch: 0.1,
        }
    }
}

/// The four named adaptive profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightProfileKind {
    /// High gradient variance: emphasize texture statistics.
    TextureDominant,
    /// Many edges: emphasize edge density and gradient energy.
    ContourDominant,
    /// Flat, low-contrast content: emphasize histograms.
    HistogramDominant,
    /// Everything else.
    Balanced,
}

impl WeightProfileKind {
    /// Classify a reference image from its own feature statistics.
    ///
    /// Checks run in priority order: texture, then contour, then
    /// low-contrast, falling through to balanced.
    #[must_use]
    pub fn classify(reference: &FeatureVector) -> Self {
        let texture_factor = (reference.gradient_variance * TEXTURE_FACTOR_SCALE).min(1.0);
        if texture_factor > TEXTURE_FACTOR_THRESHOLD {
            return Self::TextureDominant;
        }
        if reference.edge_density > EDGE_DENSITY_THRESHOLD {
            return Self::ContourDominant;
        }
        let contrast_factor = (reference.moments.variance / CONTRAST_FACTOR_SCALE).min(1.0);
        if contrast_factor < CONTRAST_FACTOR_THRESHOLD {
            return Self::HistogramDominant;
        }
        Self::Balanced
    }
}

impl WeightProfile {
    /// Build the adaptive profile for a reference image.
    ///
    /// The named profile fixes the structural weights; the color
    /// weights are scaled by whether the reference actually carries
    /// color information.
    #[must_use]
    pub fn adaptive(reference: &FeatureVector) -> Self {
        let kind = WeightProfileKind::classify(reference);
        Self::for_kind(kind, reference.is_color)
    }

    /// The named profile's weights, with color channels scaled for a
    /// color or grayscale reference.
    #[must_use]
    pub fn for_kind(kind: WeightProfileKind, is_color: bool) -> Self {
        let importance = if is_color {
            COLOR_IMPORTANCE_FULL
        } else {
            COLOR_IMPORTANCE_HALF
        };
        let channel = COLOR_CHANNEL_BASE * importance;
        let color_mismatch = if is_color { 0.5 } else { 0.25 };

        let (hist_global, hist_local, moments, gradient_norm, contour, texture) = match kind {
            WeightProfileKind::TextureDominant => (0.8, 0.6, 0.4, 0.3, 0.3, 1.0),
            WeightProfileKind::ContourDominant => (0.6, 0.4, 0.3, 0.6, 1.0, 0.4),
            WeightProfileKind::HistogramDominant => (1.2, 0.8, 0.6, 0.2, 0.2, 0.2),
            WeightProfileKind::Balanced => (0.8, 0.5, 0.4, 0.3, 0.3, 0.3),
        };

        Self {
            hist_global,
            hist_local,
            moments,
            red: channel,
            green: channel,
            blue: channel,
            gradient_norm,
            contour,
            texture,
            color_mismatch,
        }
    }
}
