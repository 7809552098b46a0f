//! Annotated detection frames for debugging

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::game::Point;

const ACTOR_COLOUR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const TARGET_COLOUR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const LINK_COLOUR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const MARKER_RADIUS: i32 = 10;

/// Copy of the frame with actor, target and the jump line drawn on it
/// (frame-local coordinates)
pub fn annotate(image: &RgbaImage, actor: Option<Point>, target: Option<Point>) -> RgbaImage {
    let mut canvas = image.clone();
    if let Some(a) = actor {
        draw_hollow_circle_mut(&mut canvas, (a.x, a.y), MARKER_RADIUS, ACTOR_COLOUR);
    }
    if let Some(t) = target {
        draw_hollow_circle_mut(&mut canvas, (t.x, t.y), MARKER_RADIUS, TARGET_COLOUR);
    }
    if let (Some(a), Some(t)) = (actor, target) {
        draw_line_segment_mut(
            &mut canvas,
            (a.x as f32, a.y as f32),
            (t.x as f32, t.y as f32),
            LINK_COLOUR,
        );
    }
    canvas
}

/// Write an annotated frame into `dir`, named by frame number
pub fn save_annotated(
    dir: &Path,
    frame_number: u64,
    image: &RgbaImage,
    actor: Option<Point>,
    target: Option<Point>,
) -> Result<(), image::ImageError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("frame_{:06}.png", frame_number));
    annotate(image, actor, target).save(&path)?;
    log::debug!("Saved annotated frame {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_draws_markers() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let out = annotate(&image, Some(Point::new(30, 70)), Some(Point::new(70, 30)));

        // Circle outline passes through (center.x + radius, center.y)
        assert_eq!(*out.get_pixel(40, 70), ACTOR_COLOUR);
        assert_eq!(*out.get_pixel(80, 30), TARGET_COLOUR);
        assert_eq!(*out.get_pixel(50, 50), LINK_COLOUR);
        assert_eq!(*image.get_pixel(50, 50), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_save_annotated_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        save_annotated(dir.path(), 3, &image, Some(Point::new(5, 5)), None).unwrap();
        assert!(dir.path().join("frame_000003.png").exists());
    }
}
