//! Configuration module
//!
//! Handles screen geometry, detector tuning, calibration defaults and timings.

pub mod settings;

use std::path::PathBuf;

pub use settings::{
    ActorSettings, CalibrationSettings, ScreenSettings, Settings, TargetSettings, TimingSettings,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}
