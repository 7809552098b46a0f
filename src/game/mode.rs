//! Operating modes
//!
//! Each mode decides where the jump distance comes from: typed by the
//! operator, captured with two hotkeys, detected on screen, or a mix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::InvalidInput;

/// Active measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Distance typed in centimetres
    #[default]
    Manual,
    /// Start and end points marked with hotkeys
    CoordinateCapture,
    /// Actor and target both detected on screen
    AutomaticVision,
    /// Actor detected on screen, target marked with a hotkey
    Hybrid,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Manual,
        Mode::CoordinateCapture,
        Mode::AutomaticVision,
        Mode::Hybrid,
    ];

    /// Modes driven by the background automation loop
    pub fn is_automated(&self) -> bool {
        matches!(self, Mode::AutomaticVision | Mode::Hybrid)
    }

    /// Whether the start hotkey records a point in this mode
    pub fn accepts_start_mark(&self) -> bool {
        matches!(self, Mode::CoordinateCapture)
    }

    /// Whether the end hotkey records a point in this mode
    pub fn accepts_end_mark(&self) -> bool {
        matches!(self, Mode::CoordinateCapture | Mode::Hybrid)
    }

    /// Short name used on the console
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Manual => "manual",
            Mode::CoordinateCapture => "capture",
            Mode::AutomaticVision => "auto",
            Mode::Hybrid => "hybrid",
        }
    }

    /// Operator hint shown after switching into the mode
    pub fn hint(&self) -> &'static str {
        match self {
            Mode::Manual => "type a distance in cm and jump",
            Mode::CoordinateCapture => "mark the start point, then the end point to jump",
            Mode::AutomaticVision => "start automation to jump unattended",
            Mode::Hybrid => "actor is detected automatically; mark the end point to jump",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = InvalidInput;

    /// Accepts the console names and the numbers 1-4
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "manual" => Ok(Mode::Manual),
            "2" | "capture" | "coordinate" | "keys" => Ok(Mode::CoordinateCapture),
            "3" | "auto" | "automatic" | "vision" => Ok(Mode::AutomaticVision),
            "4" | "hybrid" | "semi" => Ok(Mode::Hybrid),
            other => Err(InvalidInput::UnknownMode(other.to_string())),
        }
    }
}
