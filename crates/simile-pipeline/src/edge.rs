//! Edge detection: gradient-magnitude normalization, non-maximum
//! suppression, and double-threshold hysteresis.
//!
//! The stages run in order on one image:
//!
//! 1. Per-pixel magnitude `hypot(gx, gy)`, scaled by the theoretical
//!    Sobel maximum into [0, 1]; the interior mean becomes the
//!    gradient-norm summary feature.
//! 2. Non-maximum suppression thins ridges to local maxima along the
//!    quantized gradient direction.
//! 3. Hysteresis seeds the edge map with strong pixels and grows it
//!    through 8-connected weak pixels to a fixed point (breadth-first,
//!    so the last pass propagates nothing).
//!
//! Border pixels are never edges; every count is over the interior.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;

use crate::gradient::GradientField;

/// Theoretical maximum Sobel magnitude used for normalization.
///
/// A single Sobel response is bounded by `4 * 255 = 1020`, so
/// `hypot(gx, gy)` stays below `sqrt(2) * 1020 ≈ 1443`; this rounder
/// bound keeps normalized magnitudes comfortably inside [0, 1].
pub const SOBEL_MAGNITUDE_MAX: f32 = 1500.0;

/// Ratio of the low hysteresis threshold to the high one.
pub const HYSTERESIS_LOW_RATIO: f32 = 0.4;

/// Normalized gradient magnitudes plus their interior mean.
#[derive(Debug, Clone)]
pub struct MagnitudeField {
    /// Per-pixel magnitude in [0, 1]; zero on the border ring.
    pub plane: Image<Luma<f32>>,
    /// Mean magnitude over interior pixels (0 when there is no interior).
    pub interior_mean: f64,
}

/// Binary edge map plus its density summary.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    /// 255 for accepted edge pixels, 0 otherwise.
    pub map: GrayImage,
    /// Accepted-edge count divided by interior pixel count.
    pub density: f64,
}

/// Number of interior pixels, i.e. those the 3x3 kernels fit on.
pub(crate) fn interior_count(width: u32, height: u32) -> u64 {
    if width < 3 || height < 3 {
        return 0;
    }
    u64::from(width - 2) * u64::from(height - 2)
}

/// Compute normalized gradient magnitudes and their interior mean.
#[must_use = "returns the magnitude field"]
pub fn normalized_magnitude(field: &GradientField) -> MagnitudeField {
    let (width, height) = field.dimensions();
    let mut plane = Image::from_pixel(width, height, Luma([0.0_f32]));
    let mut sum = 0.0_f64;

    if width >= 3 && height >= 3 {
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let gx = f32::from(field.gx.get_pixel(x, y).0[0]);
                let gy = f32::from(field.gy.get_pixel(x, y).0[0]);
                let normalized = (gx.hypot(gy) / SOBEL_MAGNITUDE_MAX).clamp(0.0, 1.0);
                plane.put_pixel(x, y, Luma([normalized]));
                sum += f64::from(normalized);
            }
        }
    }

    let count = interior_count(width, height);
    #[allow(clippy::cast_precision_loss)]
    let interior_mean = if count > 0 { sum / count as f64 } else { 0.0 };

    MagnitudeField {
        plane,
        interior_mean,
    }
}

/// Run non-maximum suppression and hysteresis on a magnitude field.
///
/// `high_threshold` applies to normalized magnitudes; the low threshold
/// is [`HYSTERESIS_LOW_RATIO`] times it.
#[must_use = "returns the edge map"]
pub fn detect_edges(
    field: &GradientField,
    magnitude: &Image<Luma<f32>>,
    high_threshold: f32,
) -> EdgeMap {
    let thinned = non_maximum_suppression(magnitude, field);
    let map = hysteresis(
        &thinned,
        high_threshold * HYSTERESIS_LOW_RATIO,
        high_threshold,
    );

    let edge_pixels: u64 = map.pixels().map(|p| u64::from(p.0[0] > 0)).sum();
    let count = interior_count(map.width(), map.height());
    #[allow(clippy::cast_precision_loss)]
    let density = if count > 0 {
        edge_pixels as f64 / count as f64
    } else {
        0.0
    };

    EdgeMap { map, density }
}

/// Suppress pixels that are not local maxima along the gradient direction.
///
/// The direction `atan2(gy, gx)` is folded into [0°, 180°) and
/// quantized into four 45°-wide bands; the pixel survives only if its
/// magnitude is at least that of both neighbors perpendicular to the
/// edge (i.e. along the gradient) in that band.
fn non_maximum_suppression(
    magnitude: &Image<Luma<f32>>,
    field: &GradientField,
) -> Image<Luma<f32>> {
    const RADIANS_TO_DEGREES: f32 = 180.0 / std::f32::consts::PI;

    let (width, height) = magnitude.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0]));
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = f32::from(field.gx.get_pixel(x, y).0[0]);
            let gy = f32::from(field.gy.get_pixel(x, y).0[0]);
            let mut angle = gy.atan2(gx) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            // The two neighbors along the quantized gradient direction.
            let (first, second) = if !(22.5..157.5).contains(&angle) {
                ((x - 1, y), (x + 1, y))
            } else if (22.5..67.5).contains(&angle) {
                ((x + 1, y + 1), (x - 1, y - 1))
            } else if (67.5..112.5).contains(&angle) {
                ((x, y - 1), (x, y + 1))
            } else {
                ((x - 1, y + 1), (x + 1, y - 1))
            };

            let value = magnitude.get_pixel(x, y).0[0];
            let keep = value >= magnitude.get_pixel(first.0, first.1).0[0]
                && value >= magnitude.get_pixel(second.0, second.1).0[0];
            if keep {
                out.put_pixel(x, y, Luma([value]));
            }
        }
    }

    out
}

/// Double-threshold hysteresis over thinned magnitudes.
///
/// Strong pixels (>= `high_thresh`) seed the edge map; a breadth-first
/// search then accepts any 8-connected neighbor at or above
/// `low_thresh`, which reaches the fixed point of the weak-pixel
/// propagation. Neighbor coordinates are bounds-checked, so expansion
/// stops cleanly at the image border.
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (width, height) = input.dimensions();
    let mut out = GrayImage::from_pixel(width, height, Luma([0]));
    if width < 3 || height < 3 {
        return out;
    }

    let mut stack = Vec::with_capacity((width * height / 2) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            if input.get_pixel(x, y).0[0] >= high_thresh && out.get_pixel(x, y).0[0] == 0 {
                out.put_pixel(x, y, Luma([255]));
                stack.push((x, y));

                while let Some((cx, cy)) = stack.pop() {
                    let neighbors = [
                        (cx + 1, cy),
                        (cx + 1, cy + 1),
                        (cx, cy + 1),
                        (cx.wrapping_sub(1), cy + 1),
                        (cx.wrapping_sub(1), cy),
                        (cx.wrapping_sub(1), cy.wrapping_sub(1)),
                        (cx, cy.wrapping_sub(1)),
                        (cx + 1, cy.wrapping_sub(1)),
                    ];

                    for &(nx, ny) in &neighbors {
                        // Propagation never leaves the interior, so the
                        // border ring stays clear even when the low
                        // threshold is 0. wrapping_sub at 0 produces
                        // u32::MAX, which the upper bound rejects too.
                        if nx == 0 || ny == 0 || nx >= width - 1 || ny >= height - 1 {
                            continue;
                        }
                        if input.get_pixel(nx, ny).0[0] >= low_thresh
                            && out.get_pixel(nx, ny).0[0] == 0
                        {
                            out.put_pixel(nx, ny, Luma([255]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }

    out
}
