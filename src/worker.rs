//! Camera poller thread.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::config::{CameraConfig, DetectorConfig, RecognitionConfig};
use crate::face_detection::model_seeta::SeetaDetector;
use crate::face_detection::FaceDetectionModel;
use crate::face_recognition::FaceRecognitionModel;
use crate::pipeline::{analyze_frame, resolve_frame};
use crate::utils::{lock, Notice, SharedState};
use crate::webcam::{list_devices, Webcam};

/// Everything the poller needs besides the shared state.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub recognition: RecognitionConfig,
    /// Roster names indexed by label.
    pub names: Vec<String>,
}

/// Start the poller. It runs until `shutdown` is set in the shared state.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the thread.
pub fn spawn<R>(
    shared_state: SharedState,
    settings: WorkerSettings,
    recognizer: R,
) -> io::Result<JoinHandle<()>>
where
    R: FaceRecognitionModel + 'static,
{
    thread::Builder::new()
        .name("camera".to_string())
        .spawn(move || worker_thread(&shared_state, &settings, &recognizer))
}

fn worker_thread<R>(shared_state: &SharedState, settings: &WorkerSettings, recognizer: &R)
where
    R: FaceRecognitionModel + ?Sized,
{
    let devices = list_devices();
    info!("There are {} available cameras", devices.len());
    lock(shared_state).devices = Some(devices);

    let mut webcam = match Webcam::open(settings.camera.index) {
        Ok(webcam) => webcam,
        Err(err) => {
            error!("{}", err);
            let mut state = lock(shared_state);
            state.camera_open = false;
            state.push_notice(Notice::error("Error", "Cannot open the camera"));
            return;
        }
    };
    info!("Camera {} opened", webcam.index());
    lock(shared_state).camera_open = webcam.is_open();

    let mut detector = match SeetaDetector::load(&settings.detector) {
        Ok(detector) => {
            debug!("Detecting faces with {}", detector.model_path().display());
            lock(shared_state).detector_loaded = true;
            Some(detector)
        }
        Err(err) => {
            error!("{}", err);
            lock(shared_state).push_notice(Notice::error(
                "Error",
                format!(
                    "Failed to load the face detection model!\nPath: {}",
                    settings.detector.model_path.display()
                ),
            ));
            None
        }
    };

    poll_frames(
        shared_state,
        settings,
        &mut webcam,
        detector.as_mut().map(|d| d as &mut dyn FaceDetectionModel),
        recognizer,
    );

    lock(shared_state).camera_open = false;
    info!("Camera thread stopped");
}

fn poll_frames<R>(
    shared_state: &SharedState,
    settings: &WorkerSettings,
    webcam: &mut Webcam,
    mut detector: Option<&mut dyn FaceDetectionModel>,
    recognizer: &R,
) where
    R: FaceRecognitionModel + ?Sized,
{
    let interval = settings.camera.frame_interval();
    let mut failing = false;

    loop {
        let tick = Instant::now();

        let recognizing = {
            let state = lock(shared_state);
            if state.shutdown {
                break;
            }
            state.session.is_recognizing()
        };

        match webcam.read_frame() {
            Ok(mut frame) => {
                failing = false;

                let candidates = match detector.as_deref_mut() {
                    Some(detector) if recognizing => analyze_frame(
                        &frame,
                        detector,
                        recognizer,
                        settings.recognition.face_size,
                    ),
                    _ => Vec::new(),
                };

                let mut state = lock(shared_state);
                if !candidates.is_empty() {
                    let check_in = resolve_frame(
                        &mut frame,
                        &candidates,
                        &mut state.session,
                        &settings.names,
                        settings.recognition.confidence_threshold,
                        Local::now(),
                    );
                    if let Some(check_in) = check_in {
                        state.push_notice(Notice::info(
                            "Recognition succeeded",
                            format!("{} checked in", check_in.name),
                        ));
                        state.attendance.append(check_in);
                    }
                }
                state.publish_frame(frame, Instant::now());
            }
            Err(err) => {
                if failing {
                    debug!("{}", err);
                } else {
                    warn!("{}", err);
                    failing = true;
                }
            }
        }

        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            thread::sleep(rest);
        }
    }
}
