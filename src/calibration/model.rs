//! Linear distance-to-duration models

use std::fmt;

use serde::{Deserialize, Serialize};

/// `duration = slope * distance + intercept`, distance in cm, duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearModel {
    pub const fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Raw model output, which may be zero or negative for short distances
    pub fn evaluate(&self, distance_cm: f64) -> f64 {
        self.slope * distance_cm + self.intercept
    }
}

impl fmt::Display for LinearModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time = {:.4} x distance {} {:.4}",
            self.slope,
            if self.intercept < 0.0 { '-' } else { '+' },
            self.intercept.abs()
        )
    }
}

/// Which model drives jumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    /// Operator-set coefficients
    #[default]
    Fixed,
    /// Least-squares fit over recorded samples
    Fitted,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Fixed => f.write_str("fixed"),
            ModelKind::Fitted => f.write_str("fitted"),
        }
    }
}

/// Where a calibration sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSource {
    /// Entered by the operator after measuring a jump
    Measured,
    /// Recorded after a jump driven by on-screen detection
    Detected,
}

/// One observed (distance, press duration) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub distance_cm: f64,
    pub duration_secs: f64,
    pub source: SampleSource,
}

impl CalibrationSample {
    pub fn measured(distance_cm: f64, duration_secs: f64) -> Self {
        Self {
            distance_cm,
            duration_secs,
            source: SampleSource::Measured,
        }
    }

    pub fn detected(distance_cm: f64, duration_secs: f64) -> Self {
        Self {
            distance_cm,
            duration_secs,
            source: SampleSource::Detected,
        }
    }
}
