//! Jump controller
//!
//! One [`Controller`] is shared behind an `Arc` by the console, the hotkey
//! dispatcher and the automation loop. Each cluster of state sits behind its
//! own mutex; the actuator serializes jumps on its own, so at most one
//! press is ever in flight.

pub mod automation;

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub use automation::{AutomationHandle, CancelToken};

use crate::calibration::{
    Calibration, CalibrationError, CalibrationSample, FitReport, LinearModel, ModelKind,
};
use crate::config::{Settings, TimingSettings};
use crate::game::{Mode, PixelScale, Point, Region};
use crate::input::{ActuationError, Actuator, HotkeyEvent, HotkeyReceiver, InputDevice};
use crate::vision::{
    overlay, CaptureError, DetectionMiss, DetectionState, Frame, ScreenSampler, ScreenSource,
    StationarityPhase, VisionSystem,
};
use crate::{parse_non_negative, parse_number, InvalidInput};

/// Longest stretch a blocking wait goes without checking for cancellation
const CANCEL_POLL: Duration = Duration::from_millis(50);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

/// Points marked with the start and end hotkeys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedPoints {
    pub start: Option<Point>,
    pub end: Option<Point>,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    /// Game area searched by the detectors
    region: Region,
    /// Where the pointer presses
    press_point: Point,
}

/// Outcome of one completed jump
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpReport {
    pub distance_px: f64,
    pub distance_cm: f64,
    pub duration_secs: f64,
    pub model: ModelKind,
    pub press_point: Point,
}

impl fmt::Display for JumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} cm ({:.1} px), held {:.3}s at {} with the {} model",
            self.distance_cm, self.distance_px, self.duration_secs, self.press_point, self.model
        )
    }
}

/// Errors from a single jump attempt or loop iteration
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Detection(#[from] DetectionMiss),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Actuation(#[from] ActuationError),
    #[error(transparent)]
    Input(#[from] InvalidInput),
    #[error("No end point marked within {0:?}")]
    NoEndPoint(Duration),
    #[error("{0} mode has no automation loop")]
    NotAutomated(Mode),
    #[error("Automation cancelled")]
    Cancelled,
    #[error("Failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl CycleError {
    /// Whether simply trying again later can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            CycleError::Capture(_)
            | CycleError::Detection(_)
            | CycleError::NoEndPoint(_)
            | CycleError::Cancelled => true,
            // A detected distance too short for the model goes away once
            // the scene changes
            CycleError::Calibration(e) => matches!(e, CalibrationError::NonPositiveDuration { .. }),
            _ => false,
        }
    }
}

/// Point-in-time view of the controller for the console
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub mode: Mode,
    pub armed: bool,
    pub region: Region,
    pub press_point: Point,
    pub points: CapturedPoints,
    pub detection: StationarityPhase,
    pub active_model: ModelKind,
    pub fixed_model: LinearModel,
    pub fit: Option<FitReport>,
    pub sample_count: usize,
    pub message: String,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let point = |p: Option<Point>| p.map_or_else(|| "-".to_string(), |p| p.to_string());
        writeln!(
            f,
            "mode: {} ({})",
            self.mode,
            if self.armed { "armed" } else { "idle" }
        )?;
        writeln!(f, "region: {}", self.region)?;
        writeln!(f, "press point: {}", self.press_point)?;
        writeln!(
            f,
            "start: {}  end: {}  actor: {:?}",
            point(self.points.start),
            point(self.points.end),
            self.detection
        )?;
        writeln!(f, "fixed model: {}", self.fixed_model)?;
        match &self.fit {
            Some(fit) => writeln!(
                f,
                "fitted model: {} (rms {:.4}s over {} samples)",
                fit.model, fit.rms_residual, fit.sample_count
            )?,
            None => writeln!(f, "fitted model: none ({} samples)", self.sample_count)?,
        }
        writeln!(f, "active model: {}", self.active_model)?;
        write!(f, "status: {}", self.message)
    }
}

/// Shared state and operations of the assistant
pub struct Controller {
    mode: Mutex<Mode>,
    points: Mutex<CapturedPoints>,
    /// Signalled when an end point is marked while the hybrid loop waits
    end_marked: Condvar,
    detection: Mutex<DetectionState>,
    calibration: Mutex<Calibration>,
    layout: Mutex<Layout>,
    status: Mutex<String>,
    sampler: Mutex<ScreenSampler>,
    automation: Mutex<Option<AutomationHandle>>,
    actuator: Actuator,
    vision: VisionSystem,
    scale: PixelScale,
    timings: TimingSettings,
    record_detections: bool,
    debug_dir: Option<PathBuf>,
}

impl Controller {
    /// Create a controller over a sampler and an actuator
    pub fn new(settings: &Settings, sampler: ScreenSampler, actuator: Actuator) -> Self {
        Self {
            mode: Mutex::new(Mode::default()),
            points: Mutex::new(CapturedPoints::default()),
            end_marked: Condvar::new(),
            detection: Mutex::new(DetectionState::new(
                settings.actor.jitter_threshold,
                settings.actor.stationary_frames,
            )),
            calibration: Mutex::new(Calibration::new(
                settings.calibration.fixed_model(),
                settings.calibration.active,
            )),
            layout: Mutex::new(Layout {
                region: settings.capture_region(),
                press_point: settings.press_point,
            }),
            status: Mutex::new(String::from("Ready")),
            sampler: Mutex::new(sampler),
            automation: Mutex::new(None),
            actuator,
            vision: VisionSystem::new(settings),
            scale: settings.pixel_scale(),
            timings: settings.timings.clone(),
            record_detections: settings.calibration.record_detections,
            debug_dir: settings.debug_dir.clone(),
        }
    }

    /// Create a controller from raw platform backends
    pub fn from_backends(
        settings: &Settings,
        source: Box<dyn ScreenSource>,
        device: Box<dyn InputDevice>,
    ) -> Self {
        let sampler = ScreenSampler::new(source, millis(settings.timings.capture_interval));
        let actuator = Actuator::new(device, millis(settings.timings.move_settle));
        Self::new(settings, sampler, actuator)
    }

    pub fn mode(&self) -> Mode {
        *lock(&self.mode)
    }

    pub fn points(&self) -> CapturedPoints {
        *lock(&self.points)
    }

    pub fn detection_phase(&self) -> StationarityPhase {
        lock(&self.detection).phase()
    }

    pub fn region(&self) -> Region {
        lock(&self.layout).region
    }

    pub fn press_point(&self) -> Point {
        lock(&self.layout).press_point
    }

    pub fn timings(&self) -> &TimingSettings {
        &self.timings
    }

    pub fn scale(&self) -> PixelScale {
        self.scale
    }

    pub fn samples(&self) -> Vec<CalibrationSample> {
        lock(&self.calibration).samples().to_vec()
    }

    pub fn fit_report(&self) -> Option<FitReport> {
        lock(&self.calibration).fitted().copied()
    }

    /// Latest status line
    pub fn status(&self) -> String {
        lock(&self.status).clone()
    }

    /// Replace the status line and mirror it to the log
    pub fn set_status(&self, text: impl Into<String>) {
        self.report(log::Level::Info, text);
    }

    fn report(&self, level: log::Level, text: impl Into<String>) {
        let text = text.into();
        log::log!(level, "{}", text);
        *lock(&self.status) = text;
    }

    /// Snapshot of everything the console shows
    pub fn snapshot(&self) -> StatusReport {
        let (active_model, fixed_model, fit, sample_count) = {
            let calibration = lock(&self.calibration);
            (
                calibration.active(),
                calibration.fixed(),
                calibration.fitted().copied(),
                calibration.samples().len(),
            )
        };
        let layout = *lock(&self.layout);
        StatusReport {
            mode: self.mode(),
            armed: self.is_armed(),
            region: layout.region,
            press_point: layout.press_point,
            points: self.points(),
            detection: self.detection_phase(),
            active_model,
            fixed_model,
            fit,
            sample_count,
            message: self.status(),
        }
    }

    // Mode transitions

    /// Switch mode. Disarms automation (an in-flight jump still completes)
    /// and forgets captured points and detector state.
    pub fn set_mode(&self, mode: Mode) {
        self.disarm();
        *lock(&self.mode) = mode;
        *lock(&self.points) = CapturedPoints::default();
        lock(&self.detection).reset();
        self.set_status(format!("Mode {}: {}", mode, mode.hint()));
    }

    /// Dispatch one hotkey event
    pub fn handle_hotkey(&self, event: HotkeyEvent) -> Result<Option<JumpReport>, CycleError> {
        match event {
            HotkeyEvent::MarkStart(point) => {
                self.mark_start(point);
                Ok(None)
            }
            HotkeyEvent::MarkEnd(point) => self.mark_end(point),
            HotkeyEvent::SwitchMode(mode) => {
                self.set_mode(mode);
                Ok(None)
            }
        }
    }

    // Jumps

    /// Jump a typed distance in centimetres
    pub fn manual_jump(&self, text: &str) -> Result<JumpReport, CycleError> {
        let distance_cm = parse_non_negative(text, "distance")?;
        let distance_px = self.scale.cm_to_px(distance_cm);
        self.set_status(format!(
            "Manual distance {:.2} cm ({:.2} px)",
            distance_cm, distance_px
        ));
        self.jump(distance_cm, distance_px)
    }

    /// Record the jump start (coordinate capture only)
    pub fn mark_start(&self, point: Point) {
        let mode = self.mode();
        if !mode.accepts_start_mark() {
            log::debug!("Start mark at {} ignored in {} mode", point, mode);
            return;
        }
        lock(&self.points).start = Some(point);
        self.set_status(format!("Start recorded at {}, mark the end point", point));
    }

    /// Record the jump end.
    ///
    /// In coordinate capture this jumps and clears both points. In hybrid
    /// mode it hands the point to the waiting loop, or jumps straight from
    /// the detected actor when the loop is not armed.
    pub fn mark_end(&self, point: Point) -> Result<Option<JumpReport>, CycleError> {
        let mode = self.mode();
        if !mode.accepts_end_mark() {
            log::debug!("End mark at {} ignored in {} mode", point, mode);
            return Ok(None);
        }

        if mode == Mode::CoordinateCapture {
            let start = {
                let mut points = lock(&self.points);
                let start = points.start;
                if start.is_some() {
                    *points = CapturedPoints::default();
                }
                start
            };
            let Some(start) = start else {
                self.set_status("Mark the start point first");
                return Ok(None);
            };
            self.set_status(format!("End recorded at {}", point));
            return self.jump_between(start, point).map(Some);
        }

        // Hybrid
        if self.is_armed() {
            lock(&self.points).end = Some(point);
            self.end_marked.notify_all();
            self.set_status(format!("End recorded at {}", point));
            return Ok(None);
        }
        let actor = self.confirm_actor_now()?;
        let report = self.jump_between(actor, point)?;
        lock(&self.detection).reset();
        Ok(Some(report))
    }

    fn jump_between(&self, start: Point, end: Point) -> Result<JumpReport, CycleError> {
        let distance_px = start.distance_to(end);
        let distance_cm = self.scale.distance_cm(start, end);
        log::info!(
            "Distance {} -> {}: {:.2} px ({:.2} cm)",
            start,
            end,
            distance_px,
            distance_cm
        );
        self.jump(distance_cm, distance_px)
    }

    fn jump(&self, distance_cm: f64, distance_px: f64) -> Result<JumpReport, CycleError> {
        let (duration_secs, model) = {
            let calibration = lock(&self.calibration);
            (
                calibration.compute_duration(distance_cm)?,
                calibration.active(),
            )
        };
        let hold = Duration::try_from_secs_f64(duration_secs).map_err(|_| InvalidInput::OutOfRange {
            name: "press duration",
            expected: "a representable time",
            value: format!("{}s", duration_secs),
        })?;
        let press_point = self.press_point();

        self.set_status(format!("Holding for {:.3}s", duration_secs));
        if let Err(e) = self.actuator.press_and_hold(press_point, hold) {
            self.report(log::Level::Error, format!("Jump failed: {}", e));
            return Err(e.into());
        }

        let report = JumpReport {
            distance_px,
            distance_cm,
            duration_secs,
            model,
            press_point,
        };
        self.set_status(format!("Jumped {}", report));
        Ok(report)
    }

    // Vision

    fn capture(&self, region: &Region) -> Result<(Frame, u64), CaptureError> {
        let mut sampler = lock(&self.sampler);
        let frame = sampler.capture(region)?;
        Ok((frame, sampler.frame_count()))
    }

    fn confirm_actor(&self, frame: &Frame) -> Result<Point, DetectionMiss> {
        let mut detection = lock(&self.detection);
        self.vision.confirm_actor(frame, &mut detection)
    }

    /// Confirmed actor, sampling up to the debounce length if there is none yet
    fn confirm_actor_now(&self) -> Result<Point, CycleError> {
        let (confirmed, required) = {
            let detection = lock(&self.detection);
            (detection.confirmed(), detection.required_frames())
        };
        if let Some(actor) = confirmed {
            return Ok(actor);
        }

        let region = self.region();
        let mut last_miss = DetectionMiss::ActorNotFound;
        for _ in 0..required {
            let (frame, _) = self.capture(&region)?;
            match self.confirm_actor(&frame) {
                Ok(actor) => {
                    lock(&self.points).start = Some(actor);
                    return Ok(actor);
                }
                Err(miss) => last_miss = miss,
            }
        }
        Err(last_miss.into())
    }

    /// One automatic iteration: sample, confirm the actor, find the target
    /// in the same frame, jump.
    pub fn run_vision_cycle(&self) -> Result<JumpReport, CycleError> {
        let region = self.region();
        let (frame, frame_number) = self.capture(&region)?;
        let actor = self.confirm_actor(&frame)?;

        let target = match self.vision.find_target(&frame, actor) {
            Ok(target) => target,
            Err(miss) => {
                self.save_overlay(frame_number, &frame, Some(actor), None);
                return Err(miss.into());
            }
        };
        self.save_overlay(frame_number, &frame, Some(actor), Some(target));
        log::info!("Actor at {}, target at {}", actor, target);

        let report = self.jump_between(actor, target)?;
        lock(&self.detection).reset();

        if self.record_detections {
            let sample = CalibrationSample::detected(report.distance_cm, report.duration_secs);
            if let Err(e) = lock(&self.calibration).record(sample) {
                log::warn!("Detected sample not recorded: {}", e);
            }
        }
        Ok(report)
    }

    /// One hybrid iteration: confirm the actor, wait for the operator's end
    /// point, jump. Only the end point is consumed.
    pub fn run_hybrid_cycle(&self, token: &CancelToken) -> Result<JumpReport, CycleError> {
        let region = self.region();
        let (frame, _) = self.capture(&region)?;
        let actor = self.confirm_actor(&frame)?;
        lock(&self.points).start = Some(actor);
        self.set_status(format!("Actor at {}, mark the end point", actor));

        let end = self.wait_for_end(token)?;
        let report = self.jump_between(actor, end)?;
        lock(&self.detection).reset();
        Ok(report)
    }

    fn wait_for_end(&self, token: &CancelToken) -> Result<Point, CycleError> {
        let timeout = millis(self.timings.target_wait);
        let deadline = Instant::now() + timeout;
        let mut points = lock(&self.points);
        loop {
            if let Some(end) = points.end.take() {
                return Ok(end);
            }
            if token.is_cancelled() {
                return Err(CycleError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CycleError::NoEndPoint(timeout));
            }
            let slice = (deadline - now).min(CANCEL_POLL);
            points = self
                .end_marked
                .wait_timeout(points, slice)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn save_overlay(&self, frame_number: u64, frame: &Frame, actor: Option<Point>, target: Option<Point>) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let result = overlay::save_annotated(
            dir,
            frame_number,
            &frame.image,
            actor.map(|p| frame.to_local(p)),
            target.map(|p| frame.to_local(p)),
        );
        if let Err(e) = result {
            log::warn!("Failed to save debug frame: {}", e);
        }
    }

    // Automation

    /// Arm the background loop for the current automated mode
    pub fn start_automation(self: &Arc<Self>) -> Result<(), CycleError> {
        let mode = self.mode();
        if !mode.is_automated() {
            return Err(CycleError::NotAutomated(mode));
        }

        let mut automation = lock(&self.automation);
        if automation.as_ref().is_some_and(|handle| !handle.is_finished()) {
            drop(automation);
            self.set_status("Automation already running");
            return Ok(());
        }
        lock(&self.detection).reset();
        *automation = Some(AutomationHandle::spawn(Arc::clone(self))?);
        drop(automation);

        self.set_status(format!("Automation started in {} mode", mode));
        Ok(())
    }

    /// Disarm the loop. Returns false if it was not running.
    pub fn stop_automation(&self) -> bool {
        let stopped = self.disarm();
        if stopped {
            self.set_status("Automation stopped");
        }
        stopped
    }

    fn disarm(&self) -> bool {
        let handle = lock(&self.automation).take();
        match handle {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.automation)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // Calibration

    /// Replace the fixed model's coefficients
    pub fn set_fixed_model(&self, slope: &str, intercept: &str) -> Result<LinearModel, CycleError> {
        let model = LinearModel::new(parse_number(slope)?, parse_number(intercept)?);
        lock(&self.calibration).set_fixed(model);
        self.set_status(format!("Fixed model: {}", model));
        Ok(model)
    }

    /// Choose which model drives jumps; the fitted one must exist
    pub fn select_model(&self, kind: ModelKind) -> Result<LinearModel, CycleError> {
        let model = {
            let mut calibration = lock(&self.calibration);
            let model = calibration.model(kind)?;
            calibration.select(kind);
            model
        };
        self.set_status(format!("Using the {} model: {}", kind, model));
        Ok(model)
    }

    /// Add a measured (distance, duration) sample and refit
    pub fn record_sample(&self, distance: &str, duration: &str) -> Result<Option<FitReport>, CycleError> {
        let distance_cm = parse_non_negative(distance, "distance")?;
        let duration_secs = parse_number(duration)?;
        if duration_secs <= 0.0 {
            return Err(InvalidInput::OutOfRange {
                name: "duration",
                expected: "positive",
                value: duration.trim().to_string(),
            }
            .into());
        }

        let (fit, count) = {
            let mut calibration = lock(&self.calibration);
            let fit = calibration
                .record(CalibrationSample::measured(distance_cm, duration_secs))?
                .copied();
            (fit, calibration.samples().len())
        };
        match &fit {
            Some(fit) => self.set_status(format!(
                "Recorded sample #{}: fitted {} (rms {:.4}s)",
                count, fit.model, fit.rms_residual
            )),
            None => self.set_status(format!("Recorded sample #{}", count)),
        }
        Ok(fit)
    }

    /// Forget every sample and the fitted model
    pub fn clear_samples(&self) {
        let mut calibration = lock(&self.calibration);
        calibration.clear_samples();
        if calibration.active() == ModelKind::Fitted {
            calibration.select(ModelKind::Fixed);
        }
        drop(calibration);
        self.set_status("Samples cleared, using the fixed model");
    }

    // Layout

    /// Set the detection region explicitly
    pub fn set_region(&self, region: Region) {
        lock(&self.layout).region = region;
        lock(&self.detection).reset();
        self.set_status(format!("Game region set to {}", region));
    }

    /// Read the region from the pointer: top-left corner, then bottom-right,
    /// each after the configured delay
    pub fn calibrate_region(&self) -> Result<Region, CycleError> {
        let delay = millis(self.timings.region_corner_delay);

        self.set_status(format!(
            "Move the pointer to the top-left corner of the game ({:.1}s)",
            delay.as_secs_f64()
        ));
        self.actuator.pause(delay);
        let first = self.actuator.pointer_position()?;

        self.set_status(format!(
            "Top-left recorded at {}, move to the bottom-right corner ({:.1}s)",
            first,
            delay.as_secs_f64()
        ));
        self.actuator.pause(delay);
        let second = self.actuator.pointer_position()?;

        let region = Region::from_corners(first, second)?;
        self.set_region(region);
        Ok(region)
    }

    /// Set where the pointer presses to jump
    pub fn set_press_point(&self, point: Point) {
        lock(&self.layout).press_point = point;
        self.set_status(format!("Press point set to {}", point));
    }

    /// Current pointer position
    pub fn pointer_position(&self) -> Result<Point, CycleError> {
        Ok(self.actuator.pointer_position()?)
    }
}

/// Drain hotkey events on a dedicated thread until every publisher is gone
pub fn spawn_hotkey_dispatcher(
    controller: Arc<Controller>,
    receiver: HotkeyReceiver,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("hotkeys".into())
        .spawn(move || {
            while let Some(event) = receiver.recv() {
                if let Err(e) = controller.handle_hotkey(event) {
                    controller.report(log::Level::Warn, format!("{:?} failed: {}", event, e));
                }
            }
            log::debug!("Hotkey channel closed");
        })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::calibration::SampleSource;
    use crate::input::{InputEvent, SimulatedDevice};
    use image::RgbaImage;

    fn jump_events(press_point: Point) -> Vec<InputEvent> {
        vec![InputEvent::Move(press_point), InputEvent::Press, InputEvent::Release]
    }

    #[test]
    fn test_coordinate_capture_jump() {
        let (controller, log) = controller(game_screen());
        controller.set_mode(Mode::CoordinateCapture);

        controller.mark_start(Point::new(100, 100));
        let report = controller.mark_end(Point::new(100, 220)).unwrap().unwrap();

        assert!((report.distance_px - 120.0).abs() < 1e-9);
        assert!((report.distance_cm - 2.976).abs() < 1e-9);
        assert!((report.duration_secs - 0.21784).abs() < 1e-9);
        assert_eq!(log.snapshot(), jump_events(Point::new(1500, 800)));
        assert_eq!(controller.points(), CapturedPoints::default());
    }

    #[test]
    fn test_end_without_start_is_ignored() {
        let (controller, log) = controller(game_screen());
        controller.set_mode(Mode::CoordinateCapture);

        assert!(controller.mark_end(Point::new(100, 220)).unwrap().is_none());
        assert!(log.snapshot().is_empty());
        assert!(controller.status().contains("start point first"));
    }

    #[test]
    fn test_marks_ignored_in_manual_mode() {
        let (controller, log) = controller(game_screen());
        controller.mark_start(Point::new(1, 1));
        assert!(controller.mark_end(Point::new(5, 5)).unwrap().is_none());
        assert_eq!(controller.points(), CapturedPoints::default());

        controller.set_mode(Mode::AutomaticVision);
        assert!(controller.mark_end(Point::new(5, 5)).unwrap().is_none());
        assert_eq!(controller.points(), CapturedPoints::default());
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_manual_jump() {
        let (controller, log) = controller(game_screen());

        let report = controller.manual_jump("10").unwrap();
        assert!((report.duration_secs - 0.85).abs() < 1e-12);
        assert!((report.distance_px - 10.0 / 0.0248).abs() < 1e-9);
        assert_eq!(report.model, ModelKind::Fixed);
        assert_eq!(log.count(InputEvent::Release), 1);
    }

    #[test]
    fn test_manual_jump_rejects_bad_input() {
        let (controller, log) = controller(game_screen());

        assert!(matches!(
            controller.manual_jump("abc"),
            Err(CycleError::Input(InvalidInput::NotANumber(_)))
        ));
        assert!(matches!(
            controller.manual_jump("-2"),
            Err(CycleError::Input(InvalidInput::OutOfRange { .. }))
        ));
        // 0.09 * 0.3 - 0.05 < 0
        assert!(matches!(
            controller.manual_jump("0.3"),
            Err(CycleError::Calibration(CalibrationError::NonPositiveDuration { .. }))
        ));
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_mode_switch_resets_points() {
        let (controller, _) = controller(game_screen());
        controller.set_mode(Mode::CoordinateCapture);
        controller.mark_start(Point::new(10, 10));
        assert!(controller.points().start.is_some());

        controller.set_mode(Mode::CoordinateCapture);
        assert_eq!(controller.points(), CapturedPoints::default());
    }

    #[test]
    fn test_mode_switch_restarts_debounce() {
        let (controller, log) = controller(game_screen());
        controller.set_mode(Mode::AutomaticVision);

        // Two of the three stable frames
        for _ in 0..2 {
            assert!(controller.run_vision_cycle().is_err());
        }
        assert_eq!(controller.detection_phase(), StationarityPhase::Tracking);

        controller.set_mode(Mode::AutomaticVision);
        assert_eq!(controller.detection_phase(), StationarityPhase::Unknown);

        // Without the reset this frame would have confirmed and jumped
        assert!(matches!(
            controller.run_vision_cycle(),
            Err(CycleError::Detection(DetectionMiss::ActorUnsettled {
                stable_frames: 1,
                required: 3
            }))
        ));
        assert!(log.snapshot().is_empty());

        controller.set_mode(Mode::Hybrid);
        assert_eq!(controller.detection_phase(), StationarityPhase::Unknown);
    }

    #[test]
    fn test_mode_switch_during_jump_keeps_release() {
        let (controller, log) = controller_with(
            &settings(),
            game_screen(),
            SimulatedDevice::new(),
            Arc::new(std::thread::sleep),
        );
        let controller = Arc::new(controller);

        let jumping = Arc::clone(&controller);
        // 0.09 * 5 - 0.05 = 0.4s hold
        let jump = std::thread::spawn(move || jumping.manual_jump("5"));
        std::thread::sleep(Duration::from_millis(100));
        controller.set_mode(Mode::CoordinateCapture);

        assert!(jump.join().unwrap().is_ok());
        assert_eq!(controller.mode(), Mode::CoordinateCapture);
        assert_eq!(log.count(InputEvent::Press), 1);
        assert_eq!(log.count(InputEvent::Release), 1);
    }

    #[test]
    fn test_vision_cycle_debounces_then_jumps() {
        let (controller, log) = controller(game_screen());
        controller.set_mode(Mode::AutomaticVision);

        for _ in 0..2 {
            assert!(matches!(
                controller.run_vision_cycle(),
                Err(CycleError::Detection(DetectionMiss::ActorUnsettled { .. }))
            ));
        }
        let report = controller.run_vision_cycle().unwrap();

        // Actor (99, 270) to the platform's top edge around (160, 210)
        assert!(report.distance_px > 70.0 && report.distance_px < 100.0);
        assert_eq!(log.snapshot(), jump_events(Point::new(1500, 800)));
        assert_eq!(controller.detection_phase(), StationarityPhase::Unknown);
        assert!(controller.samples().is_empty());
    }

    #[test]
    fn test_vision_cycle_records_detected_sample_when_enabled() {
        let mut settings = settings();
        settings.calibration.record_detections = true;
        let (controller, _) = controller_with(
            &settings,
            game_screen(),
            SimulatedDevice::new(),
            Arc::new(|_| {}),
        );
        controller.set_mode(Mode::AutomaticVision);

        let _ = controller.run_vision_cycle();
        let _ = controller.run_vision_cycle();
        let report = controller.run_vision_cycle().unwrap();

        let samples = controller.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].source, SampleSource::Detected);
        assert_eq!(samples[0].distance_cm, report.distance_cm);
    }

    #[test]
    fn test_vision_cycle_without_target_does_not_jump() {
        let (controller, log) = controller(actor_only_screen());
        controller.set_mode(Mode::AutomaticVision);

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(controller.run_vision_cycle());
        }
        assert!(matches!(
            outcomes.last(),
            Some(Err(CycleError::Detection(DetectionMiss::TargetNotFound)))
        ));
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_debug_overlay_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings();
        settings.debug_dir = Some(dir.path().to_path_buf());
        let (controller, _) =
            controller_with(&settings, game_screen(), SimulatedDevice::new(), Arc::new(|_| {}));
        controller.set_mode(Mode::AutomaticVision);

        for _ in 0..3 {
            let _ = controller.run_vision_cycle();
        }
        assert!(dir.path().join("frame_000003.png").exists());
    }

    #[test]
    fn test_hybrid_end_without_loop_jumps_from_actor() {
        let (controller, log) = controller(game_screen());
        controller.set_mode(Mode::Hybrid);

        let report = controller.mark_end(Point::new(160, 100)).unwrap().unwrap();
        // (99, 270) -> (160, 100)
        assert!((report.distance_px - 32621f64.sqrt()).abs() < 1e-9);
        assert_eq!(log.count(InputEvent::Press), 1);
        assert_eq!(controller.detection_phase(), StationarityPhase::Unknown);
    }

    #[test]
    fn test_hybrid_end_without_actor_fails() {
        let (controller, log) = controller(RgbaImage::from_pixel(200, 320, BACKGROUND));
        controller.set_mode(Mode::Hybrid);

        assert!(matches!(
            controller.mark_end(Point::new(160, 100)),
            Err(CycleError::Detection(DetectionMiss::ActorNotFound))
        ));
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_automation_requires_automated_mode() {
        let (controller, _) = controller(game_screen());
        let controller = Arc::new(controller);
        assert!(matches!(
            controller.start_automation(),
            Err(CycleError::NotAutomated(Mode::Manual))
        ));
        assert!(!controller.is_armed());
    }

    #[test]
    fn test_select_fitted_model_needs_samples() {
        let (controller, _) = controller(game_screen());

        assert!(matches!(
            controller.select_model(ModelKind::Fitted),
            Err(CycleError::Calibration(CalibrationError::NotEnoughSamples { have: 0 }))
        ));
        assert!(controller.record_sample("2", "0.3").unwrap().is_none());
        let fit = controller.record_sample("6", "0.7").unwrap().unwrap();
        assert!((fit.model.slope - 0.1).abs() < 1e-12);

        controller.select_model(ModelKind::Fitted).unwrap();
        let report = controller.manual_jump("5").unwrap();
        assert_eq!(report.model, ModelKind::Fitted);
        assert!((report.duration_secs - 0.6).abs() < 1e-12);

        controller.clear_samples();
        assert!(controller.fit_report().is_none());
        assert_eq!(controller.snapshot().active_model, ModelKind::Fixed);
    }

    #[test]
    fn test_record_sample_rejects_bad_duration() {
        let (controller, _) = controller(game_screen());
        assert!(controller.record_sample("3", "0").is_err());
        assert!(controller.record_sample("3", "x").is_err());
        assert!(controller.samples().is_empty());
    }

    #[test]
    fn test_set_fixed_model() {
        let (controller, _) = controller(game_screen());
        controller.set_fixed_model("0.1", "0.02").unwrap();
        let report = controller.manual_jump("3").unwrap();
        assert!((report.duration_secs - 0.32).abs() < 1e-12);
        assert!(controller.set_fixed_model("fast", "0").is_err());
    }

    #[test]
    fn test_calibrate_region_from_pointer() {
        let device =
            SimulatedDevice::new().with_pointer_script([Point::new(300, 400), Point::new(10, 20)]);
        let (controller, _) = controller_with(&settings(), game_screen(), device, Arc::new(|_| {}));

        let region = controller.calibrate_region().unwrap();
        assert_eq!(region, Region::new(10, 20, 300, 400).unwrap());
        assert_eq!(controller.region(), region);
    }

    #[test]
    fn test_calibrate_region_rejects_single_point() {
        let device =
            SimulatedDevice::new().with_pointer_script([Point::new(10, 20), Point::new(10, 20)]);
        let (controller, _) = controller_with(&settings(), game_screen(), device, Arc::new(|_| {}));

        assert!(matches!(
            controller.calibrate_region(),
            Err(CycleError::Input(InvalidInput::EmptyRegion(_)))
        ));
        assert_eq!(controller.region(), Region::full_screen(200, 320));
    }

    #[test]
    fn test_press_point_used_for_jumps() {
        let (controller, log) = controller(game_screen());
        controller.set_press_point(Point::new(40, 50));
        controller.manual_jump("4").unwrap();
        assert_eq!(log.snapshot(), jump_events(Point::new(40, 50)));
    }

    #[test]
    fn test_failed_press_reported() {
        let (controller, log) = controller_with(
            &settings(),
            game_screen(),
            SimulatedDevice::new().failing_press(),
            Arc::new(|_| {}),
        );
        let result = controller.manual_jump("4");
        assert!(matches!(result, Err(CycleError::Actuation(_))));
        assert!(!result.unwrap_err().is_recoverable());
        assert_eq!(log.count(InputEvent::Release), 0);
        assert!(controller.status().starts_with("Jump failed"));
    }

    #[test]
    fn test_hotkey_dispatch() {
        let (controller, log) = controller(game_screen());

        controller
            .handle_hotkey(HotkeyEvent::SwitchMode(Mode::CoordinateCapture))
            .unwrap();
        controller
            .handle_hotkey(HotkeyEvent::MarkStart(Point::new(100, 100)))
            .unwrap();
        let report = controller
            .handle_hotkey(HotkeyEvent::MarkEnd(Point::new(100, 220)))
            .unwrap();

        assert!(report.is_some());
        assert_eq!(log.count(InputEvent::Press), 1);
    }

    #[test]
    fn test_status_snapshot() {
        let (controller, _) = controller(game_screen());
        controller.set_mode(Mode::Hybrid);
        let text = controller.snapshot().to_string();

        assert!(text.contains("mode: hybrid (idle)"));
        assert!(text.contains("fixed model: time = 0.0900 x distance - 0.0500"));
        assert!(text.contains("fitted model: none (0 samples)"));
    }
}
