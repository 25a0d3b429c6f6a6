// thin wrapper around nokhwa
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// An open, streaming camera. The stream is stopped when dropped.
pub struct Webcam {
    camera: Camera,
    index: u32,
}

impl std::fmt::Debug for Webcam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webcam").field("index", &self.index).finish_non_exhaustive()
    }
}

impl Webcam {
    /// Open device `index` at its highest frame rate and start streaming.
    ///
    /// # Errors
    ///
    /// Returns `Error::CameraOpen` if the device is missing or busy.
    pub fn open(index: u32) -> Result<Self> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        debug!("Opening camera {} with format {:?}", index, requested);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|source| Error::CameraOpen { index, source })?;
        camera
            .open_stream()
            .map_err(|source| Error::CameraOpen { index, source })?;

        info!(
            "Camera {} streaming at {} ({} fps)",
            index,
            camera.resolution(),
            camera.frame_rate()
        );
        Ok(Self { camera, index })
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.camera.is_stream_open()
    }

    /// Grab and decode the next frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::CameraFrame` if capture or decoding fails.
    pub fn read_frame(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame().map_err(Error::CameraFrame)?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(Error::CameraFrame)
    }
}

impl Drop for Webcam {
    fn drop(&mut self) {
        if self.camera.is_stream_open() {
            if let Err(err) = self.camera.stop_stream() {
                warn!("Failed to stop camera {}: {}", self.index, err);
            }
        }
        debug!("Camera {} released", self.index);
    }
}

/// Human-readable names of the attached cameras. Empty if the query fails.
#[must_use]
pub fn list_devices() -> Vec<String> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(devices) => devices.iter().map(|d| d.human_name()).collect(),
        Err(err) => {
            warn!("Could not query cameras: {}", err);
            Vec::new()
        }
    }
}
