//! Monitor capture through xcap

use image::RgbaImage;
use xcap::Monitor;

use crate::game::{Point, Region};
use crate::vision::capture::crop_region;
use crate::vision::{CaptureError, ScreenSource};

/// Captures the monitor containing the region's top-left corner
#[derive(Debug, Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }
}

fn monitor_for(region: &Region) -> Result<Monitor, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::Unavailable(e.to_string()))?;
    let origin = region.origin();
    let contains = |m: &Monitor| {
        Region::new(
            m.x(),
            m.y(),
            m.x() + m.width() as i32,
            m.y() + m.height() as i32,
        )
        .is_ok_and(|bounds| bounds.contains(origin))
    };

    let mut fallback = None;
    for monitor in monitors {
        if contains(&monitor) {
            return Ok(monitor);
        }
        if monitor.is_primary() || fallback.is_none() {
            fallback = Some(monitor);
        }
    }
    fallback.ok_or_else(|| CaptureError::Unavailable("no monitor found".into()))
}

impl ScreenSource for XcapScreen {
    fn grab(&mut self, region: &Region) -> Result<RgbaImage, CaptureError> {
        let monitor = monitor_for(region)?;
        let screen = monitor
            .capture_image()
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        crop_region(&screen, Point::new(monitor.x(), monitor.y()), region)
    }
}
