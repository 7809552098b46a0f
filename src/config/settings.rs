//! Runtime settings
//!
//! Every tunable the assistant uses: screen geometry, calibration defaults,
//! detector thresholds, timings and hotkeys. Loaded from JSON; any field
//! left out keeps its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::calibration::{LinearModel, ModelKind};
use crate::game::{PixelScale, Point, Region};
use crate::input::KeyBindings;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Physical screen description
    pub screen: ScreenSettings,
    /// Game area to capture (full screen when unset)
    pub region: Option<Region>,
    /// Where the pointer presses to jump
    pub press_point: Point,
    /// Distance to duration model
    pub calibration: CalibrationSettings,
    /// Actor detection parameters
    pub actor: ActorSettings,
    /// Target detection parameters
    pub target: TargetSettings,
    /// Loop and actuation timings
    pub timings: TimingSettings,
    /// Global hotkeys
    pub hotkeys: KeyBindings,
    /// Directory for annotated detection frames
    pub debug_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::full_hd()
    }
}

impl Settings {
    /// Defaults for a 47.6 x 29.9 cm panel at 1920x1080
    pub fn full_hd() -> Self {
        Self::for_screen(47.6, 29.9, 1920, 1080)
    }

    /// Defaults for an arbitrary panel
    pub fn for_screen(width_cm: f64, height_cm: f64, width_px: u32, height_px: u32) -> Self {
        Self {
            screen: ScreenSettings {
                width_cm,
                height_cm,
                width_px,
                height_px,
                cm_per_px: None,
            },
            region: None,
            press_point: Point::new(1500, 800),
            calibration: CalibrationSettings::default(),
            actor: ActorSettings::default(),
            target: TargetSettings::default(),
            timings: TimingSettings::default(),
            hotkeys: KeyBindings::default(),
            debug_dir: None,
        }
    }

    /// Load settings from a JSON file and validate them
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let screen = &self.screen;
        if screen.width_px == 0 || screen.height_px == 0 {
            return Err(ConfigError::Invalid("screen resolution must be non-zero".into()));
        }
        if let Some(ratio) = screen.cm_per_px {
            if !(ratio.is_finite() && ratio > 0.0) {
                return Err(ConfigError::Invalid("cm_per_px must be positive".into()));
            }
        } else if !(screen.width_cm > 0.0 && screen.height_cm > 0.0) {
            return Err(ConfigError::Invalid("physical screen size must be positive".into()));
        }
        if let Some(region) = self.region {
            Region::new(region.left, region.top, region.right, region.bottom)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        let actor = &self.actor;
        if actor.stationary_frames == 0 {
            return Err(ConfigError::Invalid("stationary_frames must be at least 1".into()));
        }
        if actor.min_area > actor.max_area {
            return Err(ConfigError::Invalid("actor min_area exceeds max_area".into()));
        }
        if !(0.0..=1.0).contains(&actor.contact_fraction) {
            return Err(ConfigError::Invalid("contact_fraction must be within 0..=1".into()));
        }
        if actor.hsv_lower.iter().zip(&actor.hsv_upper).any(|(lo, hi)| lo > hi) {
            return Err(ConfigError::Invalid("hsv_lower must not exceed hsv_upper".into()));
        }

        let target = &self.target;
        if !(0.0..=1.0).contains(&target.scan_start_fraction) {
            return Err(ConfigError::Invalid("scan_start_fraction must be within 0..=1".into()));
        }
        if !(target.blur_sigma > 0.0) {
            return Err(ConfigError::Invalid("blur_sigma must be positive".into()));
        }
        if target.canny_low > target.canny_high {
            return Err(ConfigError::Invalid("canny_low exceeds canny_high".into()));
        }

        if self.hotkeys.start == self.hotkeys.end {
            return Err(ConfigError::Invalid("start and end hotkeys must differ".into()));
        }
        Ok(())
    }

    /// Pixel to centimetre conversion for this screen
    pub fn pixel_scale(&self) -> PixelScale {
        match self.screen.cm_per_px {
            Some(ratio) => PixelScale::uniform(ratio),
            None => PixelScale::from_screen(
                self.screen.width_cm,
                self.screen.height_cm,
                self.screen.width_px,
                self.screen.height_px,
            ),
        }
    }

    /// Configured capture region, or the whole screen
    pub fn capture_region(&self) -> Region {
        self.region
            .unwrap_or_else(|| Region::full_screen(self.screen.width_px, self.screen.height_px))
    }
}

/// Physical screen description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSettings {
    /// Visible width in centimetres
    pub width_cm: f64,
    /// Visible height in centimetres
    pub height_cm: f64,
    /// Horizontal resolution
    pub width_px: u32,
    /// Vertical resolution
    pub height_px: u32,
    /// Measured ratio overriding the size-derived one
    pub cm_per_px: Option<f64>,
}

/// Calibration defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Seconds per centimetre
    pub slope: f64,
    /// Constant offset in seconds
    pub intercept: f64,
    /// Model used for jumps at startup
    pub active: ModelKind,
    /// Record every detected jump as a calibration sample. The sample's
    /// duration comes from the active model, so it only echoes that model.
    pub record_detections: bool,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            slope: 0.09,
            intercept: -0.05,
            active: ModelKind::Fixed,
            record_detections: false,
        }
    }
}

impl CalibrationSettings {
    pub fn fixed_model(&self) -> LinearModel {
        LinearModel::new(self.slope, self.intercept)
    }
}

/// Actor segmentation and debounce parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSettings {
    /// Lower HSV bound (H 0-179, S and V 0-255)
    pub hsv_lower: [u8; 3],
    /// Upper HSV bound
    pub hsv_upper: [u8; 3],
    /// Smallest plausible actor area in pixels
    pub min_area: u32,
    /// Largest plausible actor area in pixels
    pub max_area: u32,
    /// How far down the bounding box the contact point sits (0 = top, 1 = bottom)
    pub contact_fraction: f64,
    /// L1 displacement (px) below which two frames count as stable
    pub jitter_threshold: u32,
    /// Consecutive stable frames needed to confirm the actor
    pub stationary_frames: u32,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            hsv_lower: [120, 50, 50],
            hsv_upper: [160, 255, 255],
            min_area: 100,
            max_area: 60_000,
            contact_fraction: 0.75,
            jitter_threshold: 5,
            stationary_frames: 3,
        }
    }
}

/// Edge-scan parameters for the target platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    /// Gaussian blur sigma before edge detection
    pub blur_sigma: f32,
    /// Canny low threshold
    pub canny_low: f32,
    /// Canny high threshold
    pub canny_high: f32,
    /// Radius of the masked disc around the actor, as a fraction of frame height
    pub exclusion_fraction: f64,
    /// First scanned row, as a fraction of the actor's row
    pub scan_start_fraction: f64,
    /// Summed edge intensity a row must exceed
    pub row_threshold: u64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            exclusion_fraction: 0.15,
            scan_start_fraction: 0.7,
            row_threshold: 1000,
        }
    }
}

/// Timing settings for the loop and actuation (all in ms)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Pause after a jump so the game can settle
    pub jump_interval: u32,
    /// Pause after a missed detection
    pub retry_delay: u32,
    /// Minimum time between two screen captures
    pub capture_interval: u32,
    /// Pause between moving the pointer and pressing
    pub move_settle: u32,
    /// How long the hybrid loop waits for the end point
    pub target_wait: u32,
    /// Delay before each corner is read during region calibration
    pub region_corner_delay: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            jump_interval: 1500,
            retry_delay: 500,
            capture_interval: 500,
            move_settle: 200,
            target_wait: 10_000,
            region_corner_delay: 3000,
        }
    }
}
