use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use image::RgbImage;

use crate::attendance::{AttendanceLog, Readiness, Session};

// make SharedState an alias for a Mutex protected struct State
pub type SharedState = Arc<Mutex<State>>;

/// Frames averaged for the FPS readout.
const FPS_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message the window shows as a modal dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

// data shared between the camera worker and the window
#[derive(Debug, Default)]
pub struct State {
    pub fps: Option<f32>,
    pub fps_vec: Vec<f32>,
    pub last_frame_time: Option<Instant>,
    pub resolution: Option<(u32, u32)>,
    /// Latest frame, annotated when recognition ran on it.
    pub image: Option<RgbImage>,
    /// Bumped whenever `image` changes.
    pub frame_seq: u64,
    pub devices: Option<Vec<String>>,

    pub camera_open: bool,
    pub detector_loaded: bool,
    pub roster_size: usize,
    pub training_samples: usize,

    pub session: Session,
    pub attendance: AttendanceLog,
    pub notices: VecDeque<Notice>,

    pub shutdown: bool,
}

impl State {
    #[must_use]
    pub fn new_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        Readiness {
            camera_open: self.camera_open,
            detector_loaded: self.detector_loaded,
            training_samples: self.training_samples,
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    /// Store a new frame and update the FPS average.
    pub fn publish_frame(&mut self, image: RgbImage, now: Instant) {
        if let Some(last) = self.last_frame_time {
            let delta = now.duration_since(last).as_secs_f32();
            if delta > 0.0 {
                self.fps_vec.push(1.0 / delta);
                if self.fps_vec.len() > FPS_WINDOW {
                    self.fps_vec.remove(0);
                }
                let mean = self.fps_vec.iter().sum::<f32>() / self.fps_vec.len() as f32;
                self.fps = Some(mean.round());
            }
        }
        self.last_frame_time = Some(now);
        self.resolution = Some(image.dimensions());
        self.image = Some(image);
        self.frame_seq = self.frame_seq.wrapping_add(1);
    }
}

/// Lock the shared state, recovering the data if another thread panicked
/// while holding it.
pub fn lock(state: &SharedState) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
