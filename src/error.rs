//! Error types for the attendance application.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for attendance operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open the roster database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Every connection attempt failed.
    #[error("could not connect to database at {path} after {attempts} attempts")]
    DatabaseUnavailable {
        /// Path to the database file.
        path: PathBuf,
        /// How many times the connection was tried.
        attempts: u32,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path to the directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Camera Errors ===
    /// The camera device could not be opened.
    #[error("cannot open camera {index}: {source}")]
    CameraOpen {
        /// Device index.
        index: u32,
        /// The underlying error.
        #[source]
        source: nokhwa::NokhwaError,
    },

    /// A frame could not be captured or decoded.
    #[error("failed to read camera frame: {0}")]
    CameraFrame(#[source] nokhwa::NokhwaError),

    // === Vision Errors ===
    /// The face detection model could not be loaded.
    #[error("failed to load face detection model from {path}: {source}")]
    DetectorLoad {
        /// Path to the model file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An image could not be decoded.
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A picture file could not be read.
    #[error("failed to read picture {path}: {source}")]
    PictureRead {
        /// Path to the picture.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Training Errors ===
    /// The roster table holds no rows.
    #[error("the roster is empty")]
    EmptyRoster,

    /// No roster row produced a usable training image.
    #[error("no roster row produced a valid training image")]
    NoValidTrainingImages,

    /// Training input was malformed.
    #[error("invalid training input: {message}")]
    TrainingInput {
        /// Description of the problem.
        message: String,
    },

    // === Recognition Preconditions ===
    /// Recognition was requested without an open camera.
    #[error("camera is not open")]
    CameraUnavailable,

    /// Recognition was requested without a loaded detector.
    #[error("face detector is not loaded")]
    DetectorUnavailable,

    /// Recognition was requested without training data.
    #[error("no valid training data")]
    NoTrainingData,
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
