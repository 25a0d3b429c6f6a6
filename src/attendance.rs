//! Recognition session state and the check-in log.

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{Error, Result};
use crate::face_detection::FaceBoundingBox;
use crate::face_recognition::Prediction;

/// Display format for check-in times.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What recognition needs before it may start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub camera_open: bool,
    pub detector_loaded: bool,
    pub training_samples: usize,
}

/// A face found in a frame together with the recognizer's best guess.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub bbox: FaceBoundingBox,
    pub prediction: Option<Prediction>,
}

/// One row of the attendance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub name: String,
    pub time: DateTime<Local>,
}

impl CheckIn {
    #[must_use]
    pub fn formatted_time(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

/// Recognition toggle. A session accepts at most one check-in per start;
/// after a match recognition switches itself off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    is_recognizing: bool,
    has_recognized: bool,
    last_recognized_name: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_recognizing(&self) -> bool {
        self.is_recognizing
    }

    #[must_use]
    pub fn has_recognized(&self) -> bool {
        self.has_recognized
    }

    #[must_use]
    pub fn last_recognized_name(&self) -> Option<&str> {
        self.last_recognized_name.as_deref()
    }

    /// Start or stop recognition. Returns whether recognition is now on.
    ///
    /// # Errors
    ///
    /// Checked in order: `CameraUnavailable`, `DetectorUnavailable`,
    /// `NoTrainingData`. The session is unchanged on error.
    pub fn toggle(&mut self, readiness: &Readiness) -> Result<bool> {
        if !readiness.camera_open {
            return Err(Error::CameraUnavailable);
        }
        if !readiness.detector_loaded {
            return Err(Error::DetectorUnavailable);
        }
        if readiness.training_samples == 0 {
            return Err(Error::NoTrainingData);
        }

        self.is_recognizing = !self.is_recognizing;
        if self.is_recognizing {
            self.has_recognized = false;
            info!("Recognition started");
        } else {
            self.last_recognized_name = None;
            info!("Recognition stopped");
        }
        Ok(self.is_recognizing)
    }

    /// Accept the first candidate whose prediction is below `threshold` and
    /// whose label names a roster row. Later candidates in the same frame are
    /// ignored, as is everything once a match has been made.
    ///
    /// Returns the index of the accepted candidate and its check-in.
    pub fn observe(
        &mut self,
        candidates: &[Candidate],
        names: &[String],
        threshold: f64,
        now: DateTime<Local>,
    ) -> Option<(usize, CheckIn)> {
        if !self.is_recognizing || self.has_recognized {
            return None;
        }

        let (index, name) = candidates.iter().enumerate().find_map(|(i, candidate)| {
            let prediction = candidate.prediction?;
            if prediction.confidence < threshold {
                names.get(prediction.label).map(|name| (i, name.clone()))
            } else {
                None
            }
        })?;

        info!("Recognized {:?}", name);
        self.last_recognized_name = Some(name.clone());
        self.has_recognized = true;
        self.is_recognizing = false;

        Some((index, CheckIn { name, time: now }))
    }
}

/// Check-ins in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct AttendanceLog {
    rows: Vec<CheckIn>,
}

impl AttendanceLog {
    pub fn append(&mut self, check_in: CheckIn) {
        self.rows.push(check_in);
    }

    #[must_use]
    pub fn rows(&self) -> &[CheckIn] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
