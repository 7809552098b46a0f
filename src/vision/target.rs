//! Target localization
//!
//! Finds the leading edge of the next platform by scanning an edge map in
//! the band of rows just above the actor.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::config::TargetSettings;
use crate::game::Point;

/// Edge-scan target locator
pub struct TargetLocator {
    settings: TargetSettings,
}

impl TargetLocator {
    pub fn new(settings: &TargetSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Edge map of the frame with the actor's surroundings masked out
    pub fn edge_map(&self, image: &RgbaImage, actor: Point) -> GrayImage {
        let gray = image::imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, self.settings.blur_sigma);
        let mut edges = canny(&blurred, self.settings.canny_low, self.settings.canny_high);

        let radius = (f64::from(image.height()) * self.settings.exclusion_fraction) as i32;
        if radius > 0 {
            draw_filled_circle_mut(&mut edges, (actor.x, actor.y), radius, Luma([0u8]));
        }
        edges
    }

    /// Locate the target in frame-local coordinates given the actor's
    /// frame-local contact point
    pub fn locate(&self, image: &RgbaImage, actor: Point) -> Option<Point> {
        let (width, height) = image.dimensions();
        if actor.y <= 0 || width == 0 {
            return None;
        }

        let edges = self.edge_map(image, actor);
        let end_row = (actor.y as u32).min(height);
        let start_row =
            ((f64::from(actor.y) * self.settings.scan_start_fraction).floor() as u32).min(end_row);

        let row = (start_row..end_row).find(|&y| row_sum(&edges, y) > self.settings.row_threshold);
        let Some(row) = row else {
            log::debug!("No edge row above threshold in rows {}..{}", start_row, end_row);
            return None;
        };

        let column = peak_column(&edges, row)?;
        Some(Point::new(column as i32, row as i32))
    }
}

fn row_sum(edges: &GrayImage, y: u32) -> u64 {
    (0..edges.width())
        .map(|x| u64::from(edges.get_pixel(x, y)[0]))
        .sum()
}

/// Column of peak intensity; a flat peak resolves to the midpoint of its
/// first and last columns.
///
/// Canny output is binary, so on the leading-edge row this is the centre of
/// the platform's top edge rather than its left corner. Two unrelated edges
/// sharing the row resolve to a column between them.
fn peak_column(edges: &GrayImage, y: u32) -> Option<u32> {
    let peak = (0..edges.width()).map(|x| edges.get_pixel(x, y)[0]).max()?;
    let mut peaks = (0..edges.width()).filter(|&x| edges.get_pixel(x, y)[0] == peak);
    let first = peaks.next()?;
    let last = peaks.last().unwrap_or(first);
    Some((first + last) / 2)
}
