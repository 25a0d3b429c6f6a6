//! Tracing setup.
//!
//! Lines carry the thread name, so frames handled by the `camera` worker are
//! easy to tell apart from the window's `main` thread.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Window and camera crates that log every frame at debug level.
const CHATTY_DEPENDENCIES: &[&str] = &["eframe", "egui", "egui_glow", "winit", "nokhwa"];

/// How much the `attendance` crate logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    /// Also lifts the cap on the window and camera crates.
    Trace,
}

impl Verbosity {
    /// `-q` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(self) -> String {
        let mut directives = format!("attendance={}", self.level());
        if self != Self::Trace {
            for name in CHATTY_DEPENDENCIES {
                directives.push_str(&format!(",{name}=warn"));
            }
        }
        directives
    }
}

/// Install the global subscriber. `RUST_LOG` replaces the verbosity filter.
///
/// Only the first call installs anything.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .try_init();
}
