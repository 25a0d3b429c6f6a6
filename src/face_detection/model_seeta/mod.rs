use std::io;
use std::path::{Path, PathBuf};

use image::GrayImage;
use rustface::{Detector, ImageData};
use tracing::info;

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::face_detection::{FaceBoundingBox, FaceDetectionModel};

/// SeetaFace funnel-structured cascade detector, loaded from a model file.
pub struct SeetaDetector {
    detector: Box<dyn Detector>,
    model_path: PathBuf,
}

impl std::fmt::Debug for SeetaDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeetaDetector")
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl SeetaDetector {
    /// Load the model at `config.model_path` and apply the search settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::DetectorLoad` if the file is missing or malformed.
    pub fn load(config: &DetectorConfig) -> Result<Self> {
        let model_path = config.model_path.clone();
        let path_str = model_path.to_str().ok_or_else(|| Error::DetectorLoad {
            path: model_path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        })?;

        let mut detector =
            rustface::create_detector(path_str).map_err(|source| Error::DetectorLoad {
                path: model_path.clone(),
                source,
            })?;

        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.score_threshold);
        detector.set_pyramid_scale_factor(config.pyramid_scale_factor);
        detector.set_slide_window_step(config.slide_window_step, config.slide_window_step);

        info!("Loaded face detection model from {}", model_path.display());
        Ok(Self {
            detector,
            model_path,
        })
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl FaceDetectionModel for SeetaDetector {
    fn run(&mut self, image: &GrayImage) -> Vec<FaceBoundingBox> {
        let (width, height) = image.dimensions();
        let mut data = ImageData::new(image.as_raw(), width, height);

        self.detector
            .detect(&mut data)
            .into_iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBoundingBox {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                    score: face.score(),
                }
            })
            .collect()
    }
}
