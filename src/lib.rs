//! `attendance` - camera-based check-in with LBPH face recognition.
//!
//! The roster of known people lives in a SQLite table. At start-up their
//! photos are turned into a training set for an LBPH recognizer; a camera
//! thread then detects faces, and the first confident match is logged with
//! a timestamp.

pub mod app;
pub mod attendance;
pub mod augment;
pub mod cli;
pub mod config;
pub mod error;
pub mod face_detection;
pub mod face_recognition;
pub mod logging;
pub mod pipeline;
pub mod roster;
pub mod training;
pub mod utils;
pub mod webcam;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
