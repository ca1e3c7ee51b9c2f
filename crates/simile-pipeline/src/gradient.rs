//! Sobel gradient computation.
//!
//! Convolves the grayscale image with the standard 3x3 Sobel kernels
//! to produce horizontal and vertical gradient planes. The convolution
//! is only meaningful on interior pixels, so the outermost ring of both
//! planes is forced to zero; every downstream statistic (magnitude,
//! edge map, texture) is interior-only as a consequence.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Signed Sobel responses for one image.
///
/// `gx` responds to horizontal intensity changes (vertical edges),
/// `gy` to vertical changes. Both planes share the source dimensions
/// and carry zeros on the border ring.
#[derive(Debug, Clone)]
pub struct GradientField {
    /// Horizontal Sobel response.
    pub gx: Image<Luma<i16>>,
    /// Vertical Sobel response.
    pub gy: Image<Luma<i16>>,
}

impl GradientField {
    /// Width and height of the gradient planes.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.gx.dimensions()
    }
}

/// Compute Sobel gradients with zeroed borders.
///
/// Uses `imageproc`'s clamped-border convolution for the interior and
/// then overwrites the outermost ring with zeros, so border pixels
/// never contribute gradient energy.
#[must_use = "returns the gradient field"]
pub fn sobel(gray: &GrayImage) -> GradientField {
    let mut gx: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_HORIZONTAL_3X3);
    let mut gy: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_VERTICAL_3X3);
    zero_border(&mut gx);
    zero_border(&mut gy);
    GradientField { gx, gy }
}

/// Overwrite the outermost pixel ring with zeros.
fn zero_border(plane: &mut Image<Luma<i16>>) {
    let (width, height) = plane.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    for x in 0..width {
        plane.put_pixel(x, 0, Luma([0]));
        plane.put_pixel(x, height - 1, Luma([0]));
    }
    for y in 0..height {
        plane.put_pixel(0, y, Luma([0]));
        plane.put_pixel(width - 1, y, Luma([0]));
    }
}
