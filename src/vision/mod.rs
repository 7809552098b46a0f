//! Vision and image processing module
//!
//! Screen sampling, actor and target localization, and the debounce that
//! decides when a detected actor position can be trusted.

pub mod actor;
pub mod capture;
pub mod overlay;
pub mod stationarity;
pub mod target;

pub use actor::ActorLocator;
pub use capture::{Frame, ScreenSampler, ScreenSource, StillImageSource};
pub use stationarity::{DetectionState, StationarityPhase};
pub use target::TargetLocator;

use crate::config::Settings;
use crate::game::{Point, Region};

/// Coordinates all on-screen recognition
pub struct VisionSystem {
    /// Actor locator
    actor: ActorLocator,
    /// Target locator
    target: TargetLocator,
}

impl VisionSystem {
    /// Create a vision system from the detector settings
    pub fn new(settings: &Settings) -> Self {
        Self {
            actor: ActorLocator::new(&settings.actor),
            target: TargetLocator::new(&settings.target),
        }
    }

    /// Run the actor locator on a frame and feed the debounce.
    ///
    /// Returns the confirmed contact point in screen coordinates.
    pub fn confirm_actor(
        &self,
        frame: &Frame,
        state: &mut DetectionState,
    ) -> Result<Point, DetectionMiss> {
        let observed = self.actor.locate(&frame.image).map(|p| frame.to_screen(p));
        match state.observe(observed) {
            Some(point) => Ok(point),
            None if observed.is_none() => Err(DetectionMiss::ActorNotFound),
            None => Err(DetectionMiss::ActorUnsettled {
                stable_frames: state.stationary_frames(),
                required: state.required_frames(),
            }),
        }
    }

    /// Run the target locator on the same frame the actor was confirmed in
    pub fn find_target(&self, frame: &Frame, actor: Point) -> Result<Point, DetectionMiss> {
        self.target
            .locate(&frame.image, frame.to_local(actor))
            .map(|p| frame.to_screen(p))
            .ok_or(DetectionMiss::TargetNotFound)
    }
}

/// Screen capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Screen capture unavailable: {0}")]
    Unavailable(String),
    #[error("Capture region is empty")]
    EmptyRegion,
    #[error("Region {region} lies outside the {width}x{height} screen")]
    OutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },
    #[error("Captured {actual:?} pixels, expected {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// A frame in which the pipeline could not produce a trustworthy position
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DetectionMiss {
    #[error("Actor not found")]
    ActorNotFound,
    #[error("Actor still settling ({stable_frames}/{required} stable frames)")]
    ActorUnsettled { stable_frames: u32, required: u32 },
    #[error("Target not found")]
    TargetNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn frame_with_actor(region: Region) -> Frame {
        let mut image = RgbaImage::from_pixel(region.width(), region.height(), Rgba([235, 235, 235, 255]));
        draw_filled_rect_mut(&mut image, Rect::at(90, 240).of_size(20, 40), Rgba([128, 0, 255, 255]));
        draw_filled_rect_mut(&mut image, Rect::at(130, 210).of_size(60, 30), Rgba([60, 60, 60, 255]));
        Frame { image, region }
    }

    #[test]
    fn test_actor_needs_debounce() {
        let settings = Settings::default();
        let vision = VisionSystem::new(&settings);
        let mut state = DetectionState::new(5, 3);
        let frame = frame_with_actor(Region::new(1000, 500, 1200, 820).unwrap());

        assert_eq!(
            vision.confirm_actor(&frame, &mut state),
            Err(DetectionMiss::ActorUnsettled {
                stable_frames: 1,
                required: 3
            })
        );
        assert!(vision.confirm_actor(&frame, &mut state).is_err());
        let actor = vision.confirm_actor(&frame, &mut state).unwrap();
        // Local (99, 270) shifted by the region origin
        assert_eq!(actor, Point::new(1099, 770));
    }

    #[test]
    fn test_missing_actor_is_reported() {
        let settings = Settings::default();
        let vision = VisionSystem::new(&settings);
        let mut state = DetectionState::new(5, 3);
        let region = Region::full_screen(100, 100);
        let frame = Frame {
            image: RgbaImage::from_pixel(100, 100, Rgba([235, 235, 235, 255])),
            region,
        };
        assert_eq!(
            vision.confirm_actor(&frame, &mut state),
            Err(DetectionMiss::ActorNotFound)
        );
    }

    #[test]
    fn test_target_in_screen_coordinates() {
        let settings = Settings::default();
        let vision = VisionSystem::new(&settings);
        let frame = frame_with_actor(Region::new(1000, 500, 1200, 820).unwrap());

        let target = vision.find_target(&frame, Point::new(1100, 780)).unwrap();
        assert!((target.y - 710).abs() <= 2);
        assert!(target.x >= 1140 && target.x <= 1180);
    }
}
