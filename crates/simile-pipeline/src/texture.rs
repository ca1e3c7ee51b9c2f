//! Texture statistics: gradient-magnitude variance and edge coherence.
//!
//! Gradient variance measures how unevenly gradient energy is spread
//! over the interior (`E[m^2] - E[m]^2` on normalized magnitudes).
//! Edge coherence measures how line-like the accepted edges are: for
//! every edge pixel, the fraction of its 8 neighbors that are also
//! edges, averaged over all edge pixels. Contiguous contours score
//! high; scattered speckle scores low.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;

use crate::edge::interior_count;

/// Variance of the normalized gradient magnitude over interior pixels.
///
/// Returns 0 when the image has no interior.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gradient_variance(magnitude: &Image<Luma<f32>>) -> f64 {
    let (width, height) = magnitude.dimensions();
    let count = interior_count(width, height);
    if count == 0 {
        return 0.0;
    }

    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let value = f64::from(magnitude.get_pixel(x, y).0[0]);
            sum += value;
            sum_sq += value * value;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    // Non-negative in exact arithmetic; clamp shields the subtraction
    // from tiny negative rounding residue.
    (sum_sq / n - mean * mean).max(0.0)
}

/// Mean fraction of edge-pixel neighbors that are also edges.
///
/// Neighbors outside the image count as non-edges, and the fraction is
/// always out of 8. Returns 0 when the map holds no edge pixels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn edge_coherence(edges: &GrayImage) -> f64 {
    let (width, height) = edges.dimensions();
    let mut edge_pixels = 0_u64;
    let mut coherence_sum = 0.0_f64;

    for y in 0..height {
        for x in 0..width {
            if edges.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            edge_pixels += 1;

            let mut neighbors = 0_u32;
            for dy in -1_i64..=1 {
                for dx in -1_i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = i64::from(x) + dx;
                    let ny = i64::from(y) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    if edges.get_pixel(nx as u32, ny as u32).0[0] > 0 {
                        neighbors += 1;
                    }
                }
            }
            coherence_sum += f64::from(neighbors) / 8.0;
        }
    }

    if edge_pixels == 0 {
        0.0
    } else {
        coherence_sum / edge_pixels as f64
    }
}
