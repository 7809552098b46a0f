//! Global hotkey events
//!
//! The platform key hook only translates keys into [`HotkeyEvent`]s and
//! pushes them into a bounded channel; the controller side receives them in
//! order. The hook never blocks: when the channel is full the event is
//! dropped with a warning.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use serde::{Deserialize, Serialize};

use crate::game::{Mode, Point};

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 32;

/// Discrete operator trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Record the jump start at the pointer position
    MarkStart(Point),
    /// Record the jump end at the pointer position
    MarkEnd(Point),
    /// Switch the operating mode
    SwitchMode(Mode),
}

/// Key assignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Marks the start point
    pub start: char,
    /// Marks the end point
    pub end: char,
    /// Keys selecting manual, capture, auto and hybrid mode
    pub mode_keys: Option<[char; 4]>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            start: 'z',
            end: 'x',
            mode_keys: None,
        }
    }
}

impl KeyBindings {
    /// Translate a key press into an event; unbound keys yield `None`
    pub fn translate(&self, key: char, pointer: Point) -> Option<HotkeyEvent> {
        let key = key.to_ascii_lowercase();
        if key == self.start.to_ascii_lowercase() {
            return Some(HotkeyEvent::MarkStart(pointer));
        }
        if key == self.end.to_ascii_lowercase() {
            return Some(HotkeyEvent::MarkEnd(pointer));
        }
        let keys = self.mode_keys?;
        keys.iter()
            .position(|k| k.to_ascii_lowercase() == key)
            .map(|i| HotkeyEvent::SwitchMode(Mode::ALL[i]))
    }
}

/// Create a bounded hotkey channel
pub fn hotkey_channel(capacity: usize) -> (HotkeyPublisher, HotkeyReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (HotkeyPublisher { tx }, HotkeyReceiver { rx })
}

/// Producer side, held by key hooks and the console
#[derive(Debug, Clone)]
pub struct HotkeyPublisher {
    tx: SyncSender<HotkeyEvent>,
}

impl HotkeyPublisher {
    /// Publish without blocking. Returns false if the event was dropped.
    pub fn publish(&self, event: HotkeyEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::warn!("Hotkey queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer side
#[derive(Debug)]
pub struct HotkeyReceiver {
    rx: Receiver<HotkeyEvent>,
}

impl HotkeyReceiver {
    /// Block until the next event; `None` once every publisher is gone
    pub fn recv(&self) -> Option<HotkeyEvent> {
        self.rx.recv().ok()
    }
}
