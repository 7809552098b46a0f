//! Background automation loop
//!
//! Runs while automatic or hybrid mode is armed. Misses are retried after a
//! fixed delay forever; only cancellation or leaving the automated modes
//! ends the loop. Cancellation is checked between steps and while sleeping,
//! never during a press.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{millis, Controller, CycleError, CANCEL_POLL};
use crate::game::Mode;
use crate::vision::DetectionMiss;

/// Cooperative stop flag shared with the loop thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless cancelled first.
    /// Returns false if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

/// Owner of a running automation thread
pub struct AutomationHandle {
    token: CancelToken,
    thread: Option<JoinHandle<u64>>,
}

impl AutomationHandle {
    /// Start the loop on its own thread
    pub fn spawn(controller: Arc<Controller>) -> std::io::Result<Self> {
        let token = CancelToken::new();
        let loop_token = token.clone();
        let thread = std::thread::Builder::new()
            .name("automation".into())
            .spawn(move || run(&controller, &loop_token))?;
        Ok(Self {
            token,
            thread: Some(thread),
        })
    }

    /// Whether the loop has exited on its own
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel and wait for the loop; an in-flight jump completes first
    pub fn stop(mut self) {
        self.token.cancel();
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(jumps) => log::debug!("Automation thread exited after {} jumps", jumps),
                Err(_) => log::error!("Automation thread panicked"),
            }
        }
    }
}

impl Drop for AutomationHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Run the loop on the current thread until cancelled.
///
/// Returns the number of jumps performed.
pub fn run(controller: &Controller, token: &CancelToken) -> u64 {
    let jump_interval = millis(controller.timings().jump_interval);
    let retry_delay = millis(controller.timings().retry_delay);
    let mut jumps = 0;

    log::info!("Automation loop running in {} mode", controller.mode());
    while !token.is_cancelled() {
        let mode = controller.mode();
        let outcome = match mode {
            Mode::AutomaticVision => controller.run_vision_cycle(),
            Mode::Hybrid => controller.run_hybrid_cycle(token),
            other => {
                log::info!("Automation loop idle in {} mode, exiting", other);
                break;
            }
        };

        let pause = match outcome {
            Ok(_) => {
                jumps += 1;
                // Hybrid goes straight back to confirming the actor; the
                // debounce absorbs the landing
                if mode == Mode::AutomaticVision {
                    jump_interval
                } else {
                    Duration::ZERO
                }
            }
            Err(CycleError::Cancelled) => break,
            Err(e) => {
                report_miss(controller, &e);
                retry_delay
            }
        };

        if !token.sleep(pause) {
            break;
        }
    }
    log::info!("Automation loop stopped after {} jumps", jumps);
    jumps
}

fn report_miss(controller: &Controller, error: &CycleError) {
    match error {
        CycleError::Detection(DetectionMiss::ActorUnsettled { .. }) => {
            log::debug!("{}", error);
        }
        e if e.is_recoverable() => {
            controller.report(log::Level::Warn, format!("{}, retrying", e));
        }
        e => {
            controller.report(log::Level::Error, format!("{}, retrying", e));
        }
    }
}
