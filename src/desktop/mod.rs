//! Desktop backends
//!
//! Real screen capture (xcap), pointer injection (enigo) and global hotkeys
//! (rdev). Only built with the `desktop` feature.

pub mod hotkeys;
pub mod pointer;
pub mod screen;

pub use hotkeys::spawn_key_listener;
pub use pointer::EnigoPointer;
pub use screen::XcapScreen;
