//! Jump Assist - vision-calibrated press timing for distance-based jump games
//!
//! This library locates the actor and the next platform on a live screen
//! image, turns their separation into a physical distance, converts that into
//! a press duration with a calibrated linear model and performs the
//! press-hold-release jump.
//!
//! ## Modes
//!
//! The distance can be typed by hand, measured with two hotkeys, detected
//! entirely on screen, or measured from a detected actor to an operator-marked
//! target. See [`game::Mode`].
//!
//! ## Platform backends
//!
//! Screen capture and input injection are consumed through the
//! [`vision::ScreenSource`] and [`input::InputDevice`] traits. Simulated
//! backends are always available; real desktop backends live behind the
//! `desktop` feature.

pub mod calibration;
pub mod config;
pub mod console;
pub mod controller;
pub mod game;
pub mod input;
pub mod vision;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use controller::{Controller, CycleError, JumpReport};

/// Operator input that cannot be acted on
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("'{0}' is not a valid number")]
    NotANumber(String),
    #[error("{name} must be {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("Region {0} is empty")]
    EmptyRegion(String),
    #[error("Unknown mode '{0}' (use 1-4 or manual/capture/auto/hybrid)")]
    UnknownMode(String),
    #[error("Unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}

/// Parse operator text as a finite number
pub fn parse_number(text: &str) -> Result<f64, InvalidInput> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InvalidInput::NotANumber(trimmed.to_string())),
    }
}

/// Parse operator text as a finite, non-negative number
pub fn parse_non_negative(text: &str, name: &'static str) -> Result<f64, InvalidInput> {
    let value = parse_number(text)?;
    if value < 0.0 {
        return Err(InvalidInput::OutOfRange {
            name,
            expected: "non-negative",
            value: text.trim().to_string(),
        });
    }
    Ok(value)
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Capture(#[from] vision::CaptureError),
    #[error(transparent)]
    Actuation(#[from] input::ActuationError),
    #[error(transparent)]
    Input(#[from] InvalidInput),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 2.976 ").unwrap(), 2.976);
        assert_eq!(parse_number("-0.05").unwrap(), -0.05);
        assert!(matches!(parse_number("abc"), Err(InvalidInput::NotANumber(_))));
        assert!(parse_number("inf").is_err());
        assert!(parse_number("NaN").is_err());
        assert!(parse_number("").is_err());
    }

    #[test]
    fn test_parse_non_negative() {
        assert_eq!(parse_non_negative("0", "distance").unwrap(), 0.0);
        assert!(matches!(
            parse_non_negative("-3", "distance"),
            Err(InvalidInput::OutOfRange { name: "distance", .. })
        ));
    }
}
