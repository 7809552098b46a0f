//! Global key listener through rdev
//!
//! rdev reports every key press and pointer move system-wide. Pointer moves
//! are tracked so a key press can be paired with where the pointer was.

use std::thread::JoinHandle;

use rdev::{listen, Event, EventType, Key};

use crate::game::Point;
use crate::input::{HotkeyPublisher, KeyBindings};

fn key_char(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        _ => return None,
    };
    Some(c)
}

/// Listen for bound keys on a background thread and publish them.
///
/// `initial_pointer` is used until the first pointer move is seen.
pub fn spawn_key_listener(
    bindings: KeyBindings,
    publisher: HotkeyPublisher,
    initial_pointer: Point,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("key-listener".into())
        .spawn(move || {
            let mut pointer = initial_pointer;
            let callback = move |event: Event| match event.event_type {
                EventType::MouseMove { x, y } => {
                    pointer = Point::new(x.round() as i32, y.round() as i32);
                }
                EventType::KeyPress(key) => {
                    let Some(c) = key_char(key) else {
                        return;
                    };
                    if let Some(hotkey) = bindings.translate(c, pointer) {
                        log::debug!("Hotkey '{}' -> {:?}", c, hotkey);
                        publisher.publish(hotkey);
                    }
                }
                _ => {}
            };
            if let Err(e) = listen(callback) {
                log::error!("Global key listener failed: {:?}", e);
            }
        })
}
