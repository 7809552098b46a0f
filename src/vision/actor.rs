//! Actor localization
//!
//! Segments the frame by the actor's colour signature, picks the largest
//! plausible blob and reports the point where the actor touches the platform.

use std::collections::HashMap;

use image::{GrayImage, Luma, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::ActorSettings;
use crate::game::Point;

/// Inclusive HSV range in OpenCV units (H 0-179, S and V 0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Convert an RGB pixel to HSV with the 8-bit OpenCV conventions
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
    let mut hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        ((hue / 2.0).round() as u16 % 180) as u8,
        saturation.round() as u8,
        max as u8,
    ]
}

/// Bounding statistics of one connected blob
#[derive(Debug, Clone, Copy)]
struct Blob {
    area: u32,
    sum_x: u64,
    min_x: u32,
    min_y: u32,
    max_y: u32,
}

impl Blob {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            sum_x: 0,
            min_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.sum_x += u64::from(x);
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Colour-segmentation actor locator
pub struct ActorLocator {
    range: HsvRange,
    min_area: u32,
    max_area: u32,
    contact_fraction: f64,
}

impl ActorLocator {
    pub fn new(settings: &ActorSettings) -> Self {
        Self {
            range: HsvRange {
                lower: settings.hsv_lower,
                upper: settings.hsv_upper,
            },
            min_area: settings.min_area,
            max_area: settings.max_area,
            contact_fraction: settings.contact_fraction,
        }
    }

    /// Binary mask of pixels inside the actor's colour range
    pub fn segment(&self, image: &RgbaImage) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let p = image.get_pixel(x, y);
            if self.range.contains(rgb_to_hsv(p[0], p[1], p[2])) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Locate the actor's contact point in frame-local coordinates
    pub fn locate(&self, image: &RgbaImage) -> Option<Point> {
        let mask = self.segment(image);
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let mut blobs: HashMap<u32, Blob> = HashMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let id = label[0];
            if id == 0 {
                continue;
            }
            blobs.entry(id).or_insert_with(|| Blob::new(x, y)).add(x, y);
        }

        let blob = blobs
            .into_iter()
            .filter(|(_, b)| b.area >= self.min_area && b.area <= self.max_area)
            .max_by(|(ia, a), (ib, b)| a.area.cmp(&b.area).then(ib.cmp(ia)))
            .map(|(_, b)| b)?;

        let x = (blob.sum_x / u64::from(blob.area)) as i32;
        let drop = (f64::from(blob.height()) * self.contact_fraction).floor() as u32;
        let y = (blob.min_y + drop.min(blob.height() - 1)) as i32;
        log::debug!(
            "Actor blob area={} left={} top={} height={} -> contact ({}, {})",
            blob.area,
            blob.min_x,
            blob.min_y,
            blob.height(),
            x,
            y
        );
        Some(Point::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    const ACTOR: Rgba<u8> = Rgba([128, 0, 255, 255]);
    const FLOOR: Rgba<u8> = Rgba([230, 230, 220, 255]);

    fn background(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, FLOOR)
    }

    fn locator() -> ActorLocator {
        ActorLocator::new(&ActorSettings::default())
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(128, 0, 255), [135, 255, 255]);
        assert_eq!(rgb_to_hsv(40, 40, 40), [0, 0, 40]);
    }

    #[test]
    fn test_locates_contact_point() {
        let mut image = background(200, 200);
        draw_filled_rect_mut(&mut image, Rect::at(40, 100).of_size(20, 40), ACTOR);

        let point = locator().locate(&image).unwrap();
        assert_eq!(point, Point::new(49, 130));
    }

    #[test]
    fn test_no_actor_colour() {
        let image = background(100, 100);
        assert_eq!(locator().locate(&image), None);
    }

    #[test]
    fn test_picks_largest_blob() {
        let mut image = background(300, 200);
        draw_filled_rect_mut(&mut image, Rect::at(10, 10).of_size(12, 12), ACTOR);
        draw_filled_rect_mut(&mut image, Rect::at(200, 50).of_size(30, 60), ACTOR);

        let point = locator().locate(&image).unwrap();
        assert_eq!(point.x, 214);
        assert_eq!(point.y, 95);
    }

    #[test]
    fn test_blobs_outside_area_band_ignored() {
        let mut image = background(100, 100);
        // 8x8 = 64 px, below the default minimum of 100
        draw_filled_rect_mut(&mut image, Rect::at(20, 20).of_size(8, 8), ACTOR);
        assert_eq!(locator().locate(&image), None);
    }
}
