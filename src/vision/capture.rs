//! Screen sampling
//!
//! Pulls region snapshots from a platform [`ScreenSource`] at a bounded rate.

use std::path::Path;
use std::time::{Duration, Instant};

use image::RgbaImage;

use super::CaptureError;
use crate::game::{Point, Region};

/// Anything that can produce the pixels of a screen region
pub trait ScreenSource: Send {
    /// Grab the pixels inside `region` (screen coordinates)
    fn grab(&mut self, region: &Region) -> Result<RgbaImage, CaptureError>;
}

/// A captured region together with where it sits on screen
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub region: Region,
}

impl Frame {
    /// Convert a frame-local pixel into screen coordinates
    pub fn to_screen(&self, local: Point) -> Point {
        self.region.to_screen(local)
    }

    /// Convert a screen point into frame-local coordinates
    pub fn to_local(&self, screen: Point) -> Point {
        self.region.to_local(screen)
    }
}

/// Rate-limited screen sampler
pub struct ScreenSampler {
    /// Platform capture backend
    source: Box<dyn ScreenSource>,
    /// Minimum time between two captures
    min_interval: Duration,
    /// When the last capture started
    last_capture: Option<Instant>,
    /// Frame counter
    frame_count: u64,
}

impl ScreenSampler {
    /// Create a sampler over a capture backend
    pub fn new(source: Box<dyn ScreenSource>, min_interval: Duration) -> Self {
        Self {
            source,
            min_interval,
            last_capture: None,
            frame_count: 0,
        }
    }

    /// Capture a region, waiting out the rest of the capture interval first
    pub fn capture(&mut self, region: &Region) -> Result<Frame, CaptureError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(CaptureError::EmptyRegion);
        }

        if let Some(last) = self.last_capture {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_capture = Some(Instant::now());

        let image = self.source.grab(region)?;
        if image.dimensions() != (region.width(), region.height()) {
            return Err(CaptureError::SizeMismatch {
                expected: (region.width(), region.height()),
                actual: image.dimensions(),
            });
        }

        self.frame_count += 1;
        log::debug!("Captured frame #{} of {}", self.frame_count, region);
        Ok(Frame {
            image,
            region: *region,
        })
    }

    /// Get the frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Serves regions of a fixed screenshot; used for dry runs and tests
pub struct StillImageSource {
    /// Full-screen image
    screen: RgbaImage,
}

impl StillImageSource {
    pub fn new(screen: RgbaImage) -> Self {
        Self { screen }
    }

    /// Load a screenshot from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(image.to_rgba8()))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.screen.dimensions()
    }
}

impl ScreenSource for StillImageSource {
    fn grab(&mut self, region: &Region) -> Result<RgbaImage, CaptureError> {
        crop_region(&self.screen, Point::new(0, 0), region)
    }
}

/// Crop `region` out of an image whose top-left pixel sits at `origin` on screen
pub fn crop_region(
    screen: &RgbaImage,
    origin: Point,
    region: &Region,
) -> Result<RgbaImage, CaptureError> {
    let (width, height) = screen.dimensions();
    let out_of_bounds = || CaptureError::OutOfBounds {
        region: *region,
        width,
        height,
    };
    let x = u32::try_from(i64::from(region.left) - i64::from(origin.x))
        .map_err(|_| out_of_bounds())?;
    let y = u32::try_from(i64::from(region.top) - i64::from(origin.y))
        .map_err(|_| out_of_bounds())?;
    let fits = u64::from(x) + u64::from(region.width()) <= u64::from(width)
        && u64::from(y) + u64::from(region.height()) <= u64::from(height);
    if !fits {
        return Err(out_of_bounds());
    }

    let sub_image = image::imageops::crop_imm(screen, x, y, region.width(), region.height());
    Ok(sub_image.to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct FailingSource;

    impl ScreenSource for FailingSource {
        fn grab(&mut self, _region: &Region) -> Result<RgbaImage, CaptureError> {
            Err(CaptureError::Unavailable("no display".into()))
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_capture_crops_region() {
        let source = StillImageSource::new(gradient(100, 80));
        let mut sampler = ScreenSampler::new(Box::new(source), Duration::ZERO);

        let region = Region::new(10, 20, 40, 60).unwrap();
        let frame = sampler.capture(&region).unwrap();

        assert_eq!(frame.image.dimensions(), (30, 40));
        assert_eq!(*frame.image.get_pixel(0, 0), Rgba([10, 20, 0, 255]));
        assert_eq!(frame.to_screen(Point::new(5, 5)), Point::new(15, 25));
        assert_eq!(sampler.frame_count(), 1);
    }

    #[test]
    fn test_region_outside_screen_fails() {
        let source = StillImageSource::new(gradient(100, 80));
        let mut sampler = ScreenSampler::new(Box::new(source), Duration::ZERO);

        let region = Region::new(90, 0, 120, 10).unwrap();
        assert!(matches!(
            sampler.capture(&region),
            Err(CaptureError::OutOfBounds { .. })
        ));
        assert_eq!(sampler.frame_count(), 0);
    }

    #[test]
    fn test_capture_failure_is_reported() {
        let mut sampler = ScreenSampler::new(Box::new(FailingSource), Duration::ZERO);
        let region = Region::full_screen(10, 10);
        assert!(matches!(
            sampler.capture(&region),
            Err(CaptureError::Unavailable(_))
        ));
    }

    #[test]
    fn test_capture_rate_is_bounded() {
        let source = StillImageSource::new(gradient(20, 20));
        let mut sampler = ScreenSampler::new(Box::new(source), Duration::from_millis(40));
        let region = Region::full_screen(20, 20);

        let started = Instant::now();
        sampler.capture(&region).unwrap();
        sampler.capture(&region).unwrap();
        sampler.capture(&region).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_region_left_of_origin_fails() {
        let screen = gradient(50, 50);
        let region = Region::new(-2_000_000_000, 0, 10, 10).unwrap();
        assert!(matches!(
            crop_region(&screen, Point::new(100, 0), &region),
            Err(CaptureError::OutOfBounds { .. })
        ));
        let region = Region::new(90, 0, 110, 10).unwrap();
        assert!(matches!(
            crop_region(&screen, Point::new(100, 0), &region),
            Err(CaptureError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_crop_with_offset_origin() {
        let screen = gradient(50, 50);
        let region = Region::new(110, 210, 120, 220).unwrap();
        let crop = crop_region(&screen, Point::new(100, 200), &region).unwrap();
        assert_eq!(*crop.get_pixel(0, 0), Rgba([10, 10, 0, 255]));
    }
}
