//! Optional 3x3 uniform mean filter for noise reduction.
//!
//! Applied to the grayscale image before gradient computation when
//! [`ExtractionConfig::smooth`](crate::types::ExtractionConfig::smooth)
//! is set. The kernel only fits on interior pixels; border pixels are
//! copied through unchanged rather than extrapolated.

use image::{GrayImage, Luma};

/// Apply a 3x3 uniform mean filter.
///
/// Each interior pixel becomes the integer mean of its 3x3
/// neighborhood. Border pixels keep their input values. Images with no
/// interior (width or height below 3) are returned unchanged.
#[must_use = "returns the smoothed image"]
pub fn mean_filter(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    // Starting from a copy keeps the border ring identical to the input.
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sum = 0_u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    sum += u32::from(image.get_pixel(x + dx - 1, y + dy - 1).0[0]);
                }
            }
            #[allow(clippy::cast_possible_truncation)]
            out.put_pixel(x, y, Luma([(sum / 9) as u8]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 image with a sharp vertical boundary at x = 5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        let smoothed = mean_filter(&img);
        assert_eq!(smoothed.dimensions(), (17, 31));
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let img = GrayImage::from_pixel(8, 8, Luma([77]));
        assert_eq!(mean_filter(&img), img);
    }

    #[test]
    fn border_pixels_are_copied_unchanged() {
        let img = sharp_edge_image();
        let smoothed = mean_filter(&img);
        for x in 0..10 {
            assert_eq!(smoothed.get_pixel(x, 0), img.get_pixel(x, 0));
            assert_eq!(smoothed.get_pixel(x, 9), img.get_pixel(x, 9));
        }
        for y in 0..10 {
            assert_eq!(smoothed.get_pixel(0, y), img.get_pixel(0, y));
            assert_eq!(smoothed.get_pixel(9, y), img.get_pixel(9, y));
        }
    }

    #[test]
    fn interior_boundary_is_averaged() {
        let img = sharp_edge_image();
        let smoothed = mean_filter(&img);
        // One column left of the step: three of nine neighbors are 255,
        // so the mean is 3 * 255 / 9 = 85.
        assert_eq!(smoothed.get_pixel(4, 5).0[0], 85);
        // First column of the step: six of nine neighbors are 255,
        // so the mean is 6 * 255 / 9 = 170.
        assert_eq!(smoothed.get_pixel(5, 5).0[0], 170);
        // Far from the step the image is untouched.
        assert_eq!(smoothed.get_pixel(2, 5).0[0], 0);
        assert_eq!(smoothed.get_pixel(7, 5).0[0], 255);
    }

    #[test]
    fn tiny_image_returned_unchanged() {
        let img = GrayImage::from_fn(2, 2, |x, y| Luma([u8::try_from(x + y).unwrap_or(0)]));
        assert_eq!(mean_filter(&img), img);
    }
}
