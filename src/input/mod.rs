//! Input module
//!
//! Pointer actuation for jumps and the global hotkey channel through which
//! operator triggers reach the controller.

pub mod actuator;
pub mod hotkeys;
pub mod sim;

pub use actuator::{Actuator, InputDevice, Sleeper};
pub use hotkeys::{hotkey_channel, HotkeyEvent, HotkeyPublisher, HotkeyReceiver, KeyBindings};
pub use sim::{EventLog, InputEvent, SimulatedDevice};

/// Input injection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuationError {
    #[error("Input device unavailable: {0}")]
    Unavailable(String),
    #[error("Input device error: {0}")]
    Device(String),
}
