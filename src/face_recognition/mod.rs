pub mod model_lbph;

use image::GrayImage;

use crate::error::Result;

/// Nearest-match result of a recognizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Label of the closest training sample (a roster row index).
    pub label: usize,
    /// Distance to that sample; lower means more similar.
    pub confidence: f64,
}

pub trait FaceRecognitionModel: Send {
    /// Replace any previous training with `images`/`labels`.
    fn train(&mut self, images: &[GrayImage], labels: &[usize]) -> Result<()>;

    /// Closest label for `face`, or `None` when nothing has been trained.
    fn predict(&self, face: &GrayImage) -> Option<Prediction>;

    /// Number of samples currently held.
    fn sample_count(&self) -> usize;
}
