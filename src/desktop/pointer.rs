//! Pointer injection through enigo
//!
//! The enigo handle is not `Send` on every platform, so it lives on a
//! dedicated thread and [`EnigoPointer`] talks to it over a channel.

use std::sync::mpsc::{self, Receiver, Sender};

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::game::Point;
use crate::input::{ActuationError, InputDevice};

enum Request {
    Position,
    Move(Point),
    Press,
    Release,
}

/// Pointer position for `Position`, nothing for the other requests
type Reply = Result<Option<Point>, ActuationError>;

/// Handle on the pointer thread
pub struct EnigoPointer {
    requests: Sender<(Request, Sender<Reply>)>,
}

impl EnigoPointer {
    /// Start the pointer thread and connect to the platform input system
    pub fn new() -> Result<Self, ActuationError> {
        let (requests, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("pointer".into())
            .spawn(move || {
                let settings = Settings {
                    // Buttons stay down until released explicitly
                    release_keys_when_dropped: false,
                    ..Settings::default()
                };
                match Enigo::new(&settings) {
                    Ok(enigo) => {
                        let _ = ready_tx.send(Ok(()));
                        serve(enigo, inbox);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(ActuationError::Unavailable(e.to_string())));
                    }
                }
            })
            .map_err(|e| ActuationError::Unavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| ActuationError::Unavailable("pointer thread exited".into()))??;
        log::info!("Pointer injection ready");
        Ok(Self { requests })
    }

    fn call(&self, request: Request) -> Reply {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.requests
            .send((request, reply_tx))
            .map_err(|_| ActuationError::Unavailable("pointer thread exited".into()))?;
        reply_rx
            .recv()
            .map_err(|_| ActuationError::Unavailable("pointer thread exited".into()))?
    }
}

fn serve(mut enigo: Enigo, inbox: Receiver<(Request, Sender<Reply>)>) {
    let device = |e: enigo::InputError| ActuationError::Device(e.to_string());
    for (request, reply) in inbox {
        let result = match request {
            Request::Position => enigo
                .location()
                .map(|(x, y)| Some(Point::new(x, y)))
                .map_err(device),
            Request::Move(point) => enigo
                .move_mouse(point.x, point.y, Coordinate::Abs)
                .map(|_| None)
                .map_err(device),
            Request::Press => enigo
                .button(Button::Left, Direction::Press)
                .map(|_| None)
                .map_err(device),
            Request::Release => enigo
                .button(Button::Left, Direction::Release)
                .map(|_| None)
                .map_err(device),
        };
        let _ = reply.send(result);
    }
    log::debug!("Pointer thread exiting");
}

impl InputDevice for EnigoPointer {
    fn pointer_position(&mut self) -> Result<Point, ActuationError> {
        self.call(Request::Position)?
            .ok_or_else(|| ActuationError::Device("no pointer position reported".into()))
    }

    fn move_to(&mut self, point: Point) -> Result<(), ActuationError> {
        self.call(Request::Move(point)).map(|_| ())
    }

    fn press(&mut self) -> Result<(), ActuationError> {
        self.call(Request::Press).map(|_| ())
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        self.call(Request::Release).map(|_| ())
    }
}
