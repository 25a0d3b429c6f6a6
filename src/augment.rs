use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::Rng;

/// Rotate `img` about its centre by a random whole-degree angle in
/// `[-max_degrees, max_degrees)`. Output keeps the input size; uncovered
/// corners are filled black.
pub fn augment_image<R: Rng>(img: &GrayImage, max_degrees: i32, rng: &mut R) -> GrayImage {
    rotate_degrees(img, random_angle(max_degrees, rng))
}

/// A whole-degree angle in `[-max_degrees, max_degrees)`, or 0 if the range
/// is empty.
pub fn random_angle<R: Rng>(max_degrees: i32, rng: &mut R) -> i32 {
    if max_degrees > 0 {
        rng.random_range(-max_degrees..max_degrees)
    } else {
        0
    }
}

/// Counter-clockwise rotation for positive `degrees`.
pub fn rotate_degrees(img: &GrayImage, degrees: i32) -> GrayImage {
    if degrees == 0 {
        return img.clone();
    }
    // imageproc rotates clockwise for positive theta
    let theta = -(degrees as f32).to_radians();
    rotate_about_center(img, theta, Interpolation::Bilinear, Luma([0u8]))
}
