pub mod model_seeta;

use core::fmt::Debug;

use image::GrayImage;

pub trait FaceDetectionModel {
    /// Detect every face in a grayscale frame.
    fn run(&mut self, image: &GrayImage) -> Vec<FaceBoundingBox>;
}

/// A rectangle around a detected face, in frame pixels.
///
/// Detectors may report boxes that stick out of the frame; use
/// [`FaceBoundingBox::clamp_to`] before cropping.
#[derive(Clone, Copy, PartialEq)]
pub struct FaceBoundingBox {
    /// x coordinate of the top-left corner.
    pub x: i32,
    /// y coordinate of the top-left corner.
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Detector confidence; the scale depends on the model.
    pub score: f64,
}

impl FaceBoundingBox {
    /// Intersect with a `width × height` frame. `None` if nothing is left.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let left = i64::from(self.x).max(0);
        let top = i64::from(self.y).max(0);
        let right = (i64::from(self.x) + i64::from(self.width)).min(i64::from(width));
        let bottom = (i64::from(self.y) + i64::from(self.height)).min(i64::from(height));

        if right <= left || bottom <= top {
            return None;
        }

        // all four values lie within 0..=u32::MAX after clamping
        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

impl Debug for FaceBoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceBoundingBox")
            .field("origin", &(self.x, self.y))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("score", &self.score)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: i32, y: i32, width: u32, height: u32) -> FaceBoundingBox {
        FaceBoundingBox {
            x,
            y,
            width,
            height,
            score: 1.0,
        }
    }

    #[test]
    fn test_clamp_inside_is_unchanged() {
        assert_eq!(bbox(10, 20, 30, 40).clamp_to(100, 100), Some((10, 20, 30, 40)));
    }

    #[test]
    fn test_clamp_cuts_overhang() {
        assert_eq!(bbox(-5, -10, 30, 30).clamp_to(100, 100), Some((0, 0, 25, 20)));
        assert_eq!(bbox(90, 95, 30, 30).clamp_to(100, 100), Some((90, 95, 10, 5)));
    }

    #[test]
    fn test_clamp_outside_is_none() {
        assert_eq!(bbox(200, 0, 10, 10).clamp_to(100, 100), None);
        assert_eq!(bbox(-20, 0, 10, 10).clamp_to(100, 100), None);
    }
}
