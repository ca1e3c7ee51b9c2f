//! Global and quadrant-partitioned intensity histograms.
//!
//! The global histogram counts every pixel of the image; the quadrant
//! variant splits the bounds at the midpoint row and column into four
//! non-overlapping regions whose union is the full image, normalizing
//! each region independently. Empty regions produce the all-zero
//! histogram rather than dividing by zero.

use image::GrayImage;
use std::ops::Range;

use crate::types::Histogram;

/// Normalized histogram over the full image.
#[must_use = "returns the normalized histogram"]
pub fn global_histogram(gray: &GrayImage) -> Histogram {
    region_histogram(gray, 0..gray.height(), 0..gray.width())
}

/// Normalized histograms of the four midpoint quadrants.
///
/// Order: top-left, top-right, bottom-left, bottom-right. The split
/// rows/columns are `height / 2` and `width / 2`, so every pixel lands
/// in exactly one quadrant and the four pixel counts sum to the full
/// image's count.
#[must_use = "returns the four quadrant histograms"]
pub fn quadrant_histograms(gray: &GrayImage) -> [Histogram; 4] {
    let (width, height) = gray.dimensions();
    let mid_y = height / 2;
    let mid_x = width / 2;

    [
        region_histogram(gray, 0..mid_y, 0..mid_x),
        region_histogram(gray, 0..mid_y, mid_x..width),
        region_histogram(gray, mid_y..height, 0..mid_x),
        region_histogram(gray, mid_y..height, mid_x..width),
    ]
}

/// Count and normalize intensities over a rectangular region.
fn region_histogram(gray: &GrayImage, rows: Range<u32>, cols: Range<u32>) -> Histogram {
    let mut counts = [0_u64; Histogram::BINS];
    for y in rows {
        for x in cols.clone() {
            counts[usize::from(gray.get_pixel(x, y).0[0])] += 1;
        }
    }
    Histogram::from_counts(&counts)
}
