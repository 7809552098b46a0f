//! Press-hold-release actuation
//!
//! A jump is a single long press. Once the press has gone through, the
//! release must go through too, whatever happens during the hold; a stuck
//! button would corrupt every following interaction with the game.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::ActuationError;
use crate::game::Point;

/// Pointer primitives provided by the platform
pub trait InputDevice: Send {
    /// Current pointer position in screen coordinates
    fn pointer_position(&mut self) -> Result<Point, ActuationError>;
    /// Move the pointer to a screen position
    fn move_to(&mut self, point: Point) -> Result<(), ActuationError>;
    /// Press the primary button
    fn press(&mut self) -> Result<(), ActuationError>;
    /// Release the primary button
    fn release(&mut self) -> Result<(), ActuationError>;
}

/// Blocking wait used for the hold and settle pauses
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Releases the button when dropped unless released explicitly
struct PressGuard<'a> {
    device: &'a mut dyn InputDevice,
    released: bool,
}

impl<'a> PressGuard<'a> {
    /// Press the button; the guard only exists if the press succeeded
    fn press(device: &'a mut dyn InputDevice) -> Result<Self, ActuationError> {
        device.press()?;
        Ok(Self {
            device,
            released: false,
        })
    }

    fn release(mut self) -> Result<(), ActuationError> {
        self.released = true;
        self.device.release()
    }
}

impl Drop for PressGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Hold interrupted, releasing button");
            if let Err(e) = self.device.release() {
                log::error!("Release after interrupted hold failed: {}", e);
            }
        }
    }
}

/// Serializes every actuation through one device
pub struct Actuator {
    /// Platform input device
    device: Mutex<Box<dyn InputDevice>>,
    /// Pause between moving and pressing
    move_settle: Duration,
    /// Blocking wait implementation
    sleeper: Sleeper,
}

impl Actuator {
    /// Create an actuator that waits with `std::thread::sleep`
    pub fn new(device: Box<dyn InputDevice>, move_settle: Duration) -> Self {
        Self::with_sleeper(device, move_settle, Arc::new(std::thread::sleep))
    }

    /// Create an actuator with a custom wait
    pub fn with_sleeper(device: Box<dyn InputDevice>, move_settle: Duration, sleeper: Sleeper) -> Self {
        Self {
            device: Mutex::new(device),
            move_settle,
            sleeper,
        }
    }

    /// Move to `point`, press, hold for `duration`, release.
    ///
    /// Blocks the caller for the whole sequence. Concurrent callers queue up
    /// behind the one in flight. If the move or the press fails no release is
    /// sent; after a successful press the release fires on every exit path.
    pub fn press_and_hold(&self, point: Point, duration: Duration) -> Result<(), ActuationError> {
        // A panic in an earlier hold still released the button, so the
        // device state behind a poisoned lock is consistent.
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);

        device.move_to(point)?;
        if !self.move_settle.is_zero() {
            (self.sleeper)(self.move_settle);
        }

        let guard = PressGuard::press(device.as_mut())?;
        log::info!("Pressing at {} for {:.3}s", point, duration.as_secs_f64());
        (self.sleeper)(duration);
        guard.release()
    }

    /// Read the pointer position (waits for any in-flight actuation)
    pub fn pointer_position(&self) -> Result<Point, ActuationError> {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        device.pointer_position()
    }

    /// Wait using the actuator's sleeper
    pub fn pause(&self, duration: Duration) {
        (self.sleeper)(duration);
    }
}
