//! Simulated input device
//!
//! Records every primitive instead of touching the real pointer. Used for
//! dry runs without a desktop backend and throughout the tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use super::actuator::InputDevice;
use super::ActuationError;
use crate::game::Point;

/// One primitive as seen by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(Point),
    Press,
    Release,
    PressFailed,
    ReleaseFailed,
}

/// Shared, cloneable view of the recorded events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl EventLog {
    fn push(&self, event: InputEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<InputEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `event` was recorded
    pub fn count(&self, event: InputEvent) -> usize {
        self.snapshot().into_iter().filter(|e| *e == event).count()
    }
}

/// Input device that only records
pub struct SimulatedDevice {
    /// Current pointer position
    pointer: Point,
    /// Positions reported by successive `pointer_position` calls
    pointer_script: VecDeque<Point>,
    events: EventLog,
    fail_press: bool,
    fail_release: bool,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            pointer: Point::new(0, 0),
            pointer_script: VecDeque::new(),
            events: EventLog::default(),
            fail_press: false,
            fail_release: false,
        }
    }

    /// Report these positions, in order, before falling back to the
    /// current pointer
    pub fn with_pointer_script(mut self, positions: impl IntoIterator<Item = Point>) -> Self {
        self.pointer_script = positions.into_iter().collect();
        self
    }

    /// Make every press fail
    pub fn failing_press(mut self) -> Self {
        self.fail_press = true;
        self
    }

    /// Make every release fail
    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Handle on the recorded events
    pub fn events(&self) -> EventLog {
        self.events.clone()
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDevice for SimulatedDevice {
    fn pointer_position(&mut self) -> Result<Point, ActuationError> {
        Ok(self.pointer_script.pop_front().unwrap_or(self.pointer))
    }

    fn move_to(&mut self, point: Point) -> Result<(), ActuationError> {
        self.pointer = point;
        self.events.push(InputEvent::Move(point));
        log::debug!("[sim] move to {}", point);
        Ok(())
    }

    fn press(&mut self) -> Result<(), ActuationError> {
        if self.fail_press {
            self.events.push(InputEvent::PressFailed);
            return Err(ActuationError::Device("simulated press failure".into()));
        }
        self.events.push(InputEvent::Press);
        log::debug!("[sim] press");
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        if self.fail_release {
            self.events.push(InputEvent::ReleaseFailed);
            return Err(ActuationError::Device("simulated release failure".into()));
        }
        self.events.push(InputEvent::Release);
        log::debug!("[sim] release");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_primitives() {
        let mut device = SimulatedDevice::new();
        let log = device.events();

        device.move_to(Point::new(3, 4)).unwrap();
        device.press().unwrap();
        device.release().unwrap();

        assert_eq!(device.pointer_position().unwrap(), Point::new(3, 4));
        assert_eq!(log.snapshot().len(), 3);
        assert_eq!(log.count(InputEvent::Press), 1);
    }

    #[test]
    fn test_pointer_script() {
        let mut device =
            SimulatedDevice::new().with_pointer_script([Point::new(1, 2), Point::new(30, 40)]);
        assert_eq!(device.pointer_position().unwrap(), Point::new(1, 2));
        assert_eq!(device.pointer_position().unwrap(), Point::new(30, 40));
        assert_eq!(device.pointer_position().unwrap(), Point::new(0, 0));
    }
}
