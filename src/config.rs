//! Configuration management.
//!
//! Values are merged from (later wins):
//! 1. Built-in defaults
//! 2. TOML file at `~/.config/attendance/config.toml` (or `--config`)
//! 3. Environment variables prefixed with `ATTENDANCE_`, nested with `__`
//!    (e.g. `ATTENDANCE_CAMERA__INDEX=1`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "attendance";
const ENV_PREFIX: &str = "ATTENDANCE_";

// rustface panics outside these bounds instead of returning an error
const MIN_PYRAMID_SCALE: f32 = 0.01;
const MAX_PYRAMID_SCALE: f32 = 0.99;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub recognition: RecognitionConfig,
}

/// Roster database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the roster table.
    pub path: PathBuf,
    /// Table with `name` and `picture` columns.
    pub table: String,
    /// Connection attempts before giving up.
    pub connect_attempts: u32,
    /// Pause between failed attempts in milliseconds.
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index.
    pub index: u32,
    /// Poll interval in milliseconds (33 ≈ 30 FPS).
    pub frame_interval_ms: u64,
}

/// Face detector settings. See `rustface::Detector` for their meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the SeetaFace frontal model file.
    pub model_path: PathBuf,
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

/// LBPH recognizer and training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Side length faces are resized to before training and prediction.
    pub face_size: u32,
    /// Predictions at or above this distance are rejected.
    pub confidence_threshold: f64,
    /// Augmented samples are rotated by up to this many degrees either way.
    pub max_rotation_degrees: i32,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("roster.db"),
            table: "user_profile".to_string(),
            connect_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            frame_interval_ms: 33,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("seeta_fd_frontal_v1.0.bin"),
            min_face_size: 40,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            face_size: 200,
            confidence_threshold: 120.0,
            max_rotation_degrees: 15,
            grid_x: 8,
            grid_y: 8,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl CameraConfig {
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Config {
    /// Load configuration, reading the TOML file from `config_path` if given.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;

        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            // field names contain `_`, so sections are separated by `__`
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigValidation` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.database.table) {
            return Err(invalid(format!(
                "database.table '{}' is not a plain SQL identifier",
                self.database.table
            )));
        }
        if self.database.connect_attempts == 0 {
            return Err(invalid("database.connect_attempts must be at least 1"));
        }
        if self.camera.frame_interval_ms == 0 {
            return Err(invalid("camera.frame_interval_ms must be greater than 0"));
        }
        if self.detector.min_face_size < 20 {
            return Err(invalid("detector.min_face_size must be at least 20"));
        }
        if !(MIN_PYRAMID_SCALE..=MAX_PYRAMID_SCALE).contains(&self.detector.pyramid_scale_factor) {
            return Err(invalid(format!(
                "detector.pyramid_scale_factor must lie within [{MIN_PYRAMID_SCALE}, {MAX_PYRAMID_SCALE}]"
            )));
        }
        if !(self.detector.score_threshold > 0.0) {
            return Err(invalid("detector.score_threshold must be positive"));
        }
        if self.detector.slide_window_step == 0 {
            return Err(invalid("detector.slide_window_step must be at least 1"));
        }
        if self.recognition.face_size == 0 {
            return Err(invalid("recognition.face_size must be greater than 0"));
        }
        if self.recognition.confidence_threshold <= 0.0 {
            return Err(invalid(
                "recognition.confidence_threshold must be positive",
            ));
        }
        if self.recognition.max_rotation_degrees < 0 {
            return Err(invalid(
                "recognition.max_rotation_degrees must not be negative",
            ));
        }
        if self.recognition.grid_x == 0 || self.recognition.grid_y == 0 {
            return Err(invalid("recognition grid must be at least 1x1"));
        }
        if self.recognition.face_size < self.recognition.grid_x.max(self.recognition.grid_y) + 2 {
            return Err(invalid(
                "recognition.face_size is too small for the histogram grid",
            ));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

/// Table names are spliced into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is allowed.
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
