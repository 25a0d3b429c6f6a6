use image::{GrayImage, Luma};
use imageproc::local_binary_patterns::local_binary_pattern;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::face_recognition::{FaceRecognitionModel, Prediction};

/// One bin per 8-bit LBP code.
const BINS: usize = 256;

/// Local Binary Patterns Histogram recognizer.
///
/// Each face becomes a radius-1, 8-neighbour LBP image, split into a
/// `grid_x × grid_y` grid. Every cell contributes a 256-bin histogram
/// normalised by the cell area; the concatenation is the face descriptor.
/// Prediction returns the label of the nearest stored descriptor under the
/// alternative chi-square distance.
#[derive(Debug, Clone)]
pub struct LbphFaceRecognizer {
    grid_x: u32,
    grid_y: u32,
    histograms: Vec<Vec<f32>>,
    labels: Vec<usize>,
}

impl Default for LbphFaceRecognizer {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl LbphFaceRecognizer {
    #[must_use]
    pub fn new(grid_x: u32, grid_y: u32) -> Self {
        Self {
            grid_x: grid_x.max(1),
            grid_y: grid_y.max(1),
            histograms: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Add samples without discarding earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `Error::TrainingInput` if the slices differ in length or an
    /// image is too small for the grid.
    pub fn update(&mut self, images: &[GrayImage], labels: &[usize]) -> Result<()> {
        if images.len() != labels.len() {
            return Err(Error::TrainingInput {
                message: format!(
                    "{} images but {} labels",
                    images.len(),
                    labels.len()
                ),
            });
        }

        let histograms = images
            .par_iter()
            .map(|image| self.descriptor(image))
            .collect::<Result<Vec<_>>>()?;

        self.histograms.extend(histograms);
        self.labels.extend_from_slice(labels);
        Ok(())
    }

    /// Spatial LBP histogram of `image`.
    fn descriptor(&self, image: &GrayImage) -> Result<Vec<f32>> {
        let lbp = lbp_image(image).ok_or_else(|| Error::TrainingInput {
            message: format!(
                "image of {}x{} is too small for LBP",
                image.width(),
                image.height()
            ),
        })?;
        spatial_histogram(&lbp, self.grid_x, self.grid_y).ok_or_else(|| Error::TrainingInput {
            message: format!(
                "image of {}x{} is too small for a {}x{} grid",
                image.width(),
                image.height(),
                self.grid_x,
                self.grid_y
            ),
        })
    }
}

impl FaceRecognitionModel for LbphFaceRecognizer {
    fn train(&mut self, images: &[GrayImage], labels: &[usize]) -> Result<()> {
        if images.is_empty() {
            return Err(Error::TrainingInput {
                message: "no training images".to_string(),
            });
        }
        self.histograms.clear();
        self.labels.clear();
        self.update(images, labels)?;
        debug!("LBPH trained on {} samples", self.labels.len());
        Ok(())
    }

    fn predict(&self, face: &GrayImage) -> Option<Prediction> {
        let query = self.descriptor(face).ok()?;

        self.histograms
            .iter()
            .zip(&self.labels)
            .map(|(histogram, &label)| Prediction {
                label,
                confidence: chi_square_alt(histogram, &query),
            })
            .min_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    fn sample_count(&self) -> usize {
        self.labels.len()
    }
}

/// LBP codes for every interior pixel; the result is two pixels smaller in
/// each dimension.
fn lbp_image(image: &GrayImage) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return None;
    }
    Some(GrayImage::from_fn(width - 2, height - 2, |x, y| {
        Luma([local_binary_pattern(image, x + 1, y + 1).unwrap_or(0)])
    }))
}

/// Concatenated per-cell histograms. Pixels beyond the last whole cell are
/// ignored.
fn spatial_histogram(lbp: &GrayImage, grid_x: u32, grid_y: u32) -> Option<Vec<f32>> {
    let cell_width = lbp.width() / grid_x;
    let cell_height = lbp.height() / grid_y;
    if cell_width == 0 || cell_height == 0 {
        return None;
    }

    let area = (cell_width * cell_height) as f32;
    let mut histogram = vec![0f32; (grid_x * grid_y) as usize * BINS];

    for gy in 0..grid_y {
        for gx in 0..grid_x {
            let offset = (gy * grid_x + gx) as usize * BINS;
            let cell = &mut histogram[offset..offset + BINS];
            for y in gy * cell_height..(gy + 1) * cell_height {
                for x in gx * cell_width..(gx + 1) * cell_width {
                    cell[lbp.get_pixel(x, y)[0] as usize] += 1.0;
                }
            }
            for bin in cell.iter_mut() {
                *bin /= area;
            }
        }
    }

    Some(histogram)
}

/// `2 · Σ (a − b)² / (a + b)`, skipping bins where both are empty.
fn chi_square_alt(a: &[f32], b: &[f32]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&a, &b)| {
            let (a, b) = (f64::from(a), f64::from(b));
            let total = a + b;
            if total.abs() > f64::EPSILON {
                (a - b) * (a - b) / total
            } else {
                0.0
            }
        })
        .sum();
    2.0 * sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal_stripes(size: u32, phase: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |_, y| {
            Luma([if ((y + phase) / 2) % 2 == 0 { 255 } else { 0 }])
        })
    }

    fn vertical_stripes(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _| Luma([if (x / 2) % 2 == 0 { 255 } else { 0 }]))
    }

    fn trained() -> LbphFaceRecognizer {
        let mut recognizer = LbphFaceRecognizer::default();
        recognizer
            .train(
                &[horizontal_stripes(200, 0), vertical_stripes(200)],
                &[0, 1],
            )
            .unwrap();
        recognizer
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let recognizer = LbphFaceRecognizer::default();
        assert!(recognizer.predict(&horizontal_stripes(200, 0)).is_none());
    }

    #[test]
    fn test_training_image_matches_itself() {
        let recognizer = trained();

        let prediction = recognizer.predict(&vertical_stripes(200)).unwrap();
        assert_eq!(prediction.label, 1);
        assert!(prediction.confidence.abs() < 1e-9);
    }

    #[test]
    fn test_shifted_texture_keeps_label() {
        let recognizer = trained();

        let prediction = recognizer.predict(&horizontal_stripes(200, 1)).unwrap();
        assert_eq!(prediction.label, 0);
    }

    #[test]
    fn test_other_texture_is_far() {
        let mut recognizer = LbphFaceRecognizer::default();
        recognizer
            .train(&[horizontal_stripes(200, 0)], &[0])
            .unwrap();

        let prediction = recognizer.predict(&vertical_stripes(200)).unwrap();
        assert!(prediction.confidence > 0.1);
    }

    #[test]
    fn test_train_replaces_update_appends() {
        let mut recognizer = trained();
        assert_eq!(recognizer.sample_count(), 2);

        recognizer.update(&[horizontal_stripes(200, 1)], &[0]).unwrap();
        assert_eq!(recognizer.sample_count(), 3);

        recognizer.train(&[vertical_stripes(200)], &[4]).unwrap();
        assert_eq!(recognizer.sample_count(), 1);
        assert_eq!(recognizer.predict(&horizontal_stripes(200, 0)).unwrap().label, 4);
    }

    #[test]
    fn test_mismatched_labels_rejected() {
        let mut recognizer = LbphFaceRecognizer::default();
        let result = recognizer.train(&[vertical_stripes(50)], &[0, 1]);
        assert!(matches!(result, Err(Error::TrainingInput { .. })));
    }

    #[test]
    fn test_tiny_image_rejected() {
        let mut recognizer = LbphFaceRecognizer::default();
        assert!(recognizer.train(&[GrayImage::new(5, 5)], &[0]).is_err());
        assert!(recognizer.train(&[], &[]).is_err());
    }

    #[test]
    fn test_histogram_cells_are_normalised() {
        let lbp = lbp_image(&vertical_stripes(34)).unwrap();
        let histogram = spatial_histogram(&lbp, 4, 4).unwrap();

        assert_eq!(histogram.len(), 16 * BINS);
        for cell in histogram.chunks(BINS) {
            let total: f32 = cell.iter().sum();
            assert!((total - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_codes_use_the_eight_adjacent_pixels() {
        // 3x3 is the smallest input: one code from the centre's 8 neighbours
        let bright_ring = GrayImage::from_fn(3, 3, |x, y| {
            Luma([if (x, y) == (1, 1) { 10 } else { 200 }])
        });
        let lbp = lbp_image(&bright_ring).unwrap();
        assert_eq!(lbp.dimensions(), (1, 1));
        assert_eq!(lbp.get_pixel(0, 0)[0], 0xff);

        let dark_ring = GrayImage::from_fn(3, 3, |x, y| {
            Luma([if (x, y) == (1, 1) { 200 } else { 10 }])
        });
        assert_eq!(lbp_image(&dark_ring).unwrap().get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_chi_square_properties() {
        let a = [0.5, 0.5, 0.0];
        let b = [0.25, 0.25, 0.5];
        assert!(chi_square_alt(&a, &a).abs() < f64::EPSILON);
        assert!((chi_square_alt(&a, &b) - chi_square_alt(&b, &a)).abs() < 1e-12);
        assert!(chi_square_alt(&a, &b) > 0.0);
    }
}
