//! Foot length and width from a binary mask.

use crate::aggregate::round_to;
use crate::error::ImageError;
use footmeasure_core::{min_area_rect, oriented_area};
use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Size of one foot in one image, rounded to 0.1 cm. `length_cm >= width_cm`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub length_cm: f64,
    pub width_cm: f64,
}

/// Measure the largest foreground region of `mask` with a minimum-area
/// rotated rectangle.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask), fields(w = mask.width(), h = mask.height()))
)]
pub fn measure_foot(mask: &GrayImage, pixels_per_cm: f64) -> Result<Measurement, ImageError> {
    if !pixels_per_cm.is_finite() || pixels_per_cm <= 0.0 {
        return Err(ImageError::InvalidScale(pixels_per_cm));
    }

    // contour tracing only starts outer borders away from column 0
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);

    let contours = find_contours::<i32>(&padded);
    let foot = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| (c, enclosed_area(c)))
        .fold(None::<(&Contour<i32>, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(c, _)| c)
        .ok_or(ImageError::NoFootContour)?;

    // every border pixel contributes its four corners (undo the padding)
    let footprint: Vec<Point2<f64>> = foot
        .points
        .iter()
        .flat_map(|p| {
            let (x, y) = ((p.x - 1) as f64, (p.y - 1) as f64);
            [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]
                .map(|(dx, dy)| Point2::new(x + dx, y + dy))
        })
        .collect();
    let rect = min_area_rect(&footprint).ok_or(ImageError::NoFootContour)?;

    log::debug!(
        "foot contour: {} points, rect {:.1}x{:.1} px at {:.1} deg",
        foot.points.len(),
        rect.long_side(),
        rect.short_side(),
        rect.angle_deg
    );

    Ok(Measurement {
        length_cm: round_to(rect.long_side() / pixels_per_cm, 1),
        width_cm: round_to(rect.short_side() / pixels_per_cm, 1),
    })
}

fn enclosed_area(c: &Contour<i32>) -> f64 {
    let pts: Vec<Point2<f64>> = c
        .points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();
    oriented_area(&pts).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn rect_mask(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let inside = (x0..x0 + rw).contains(&x) && (y0..y0 + rh).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn rectangle_measures_its_pixel_extent() {
        let mask = rect_mask(600, 300, 100, 50, 400, 200);
        let m = measure_foot(&mask, 10.0).expect("measure");
        assert_eq!(m, Measurement { length_cm: 40.0, width_cm: 20.0 });
    }

    #[test]
    fn square_has_equal_sides() {
        let mask = rect_mask(500, 500, 50, 50, 400, 400);
        let m = measure_foot(&mask, 10.0).expect("measure");
        assert_eq!(m, Measurement { length_cm: 40.0, width_cm: 40.0 });
    }

    #[test]
    fn portrait_rectangle_reports_long_side_as_length() {
        let mask = rect_mask(300, 600, 50, 100, 200, 400);
        let m = measure_foot(&mask, 10.0).expect("measure");
        assert_eq!(m, Measurement { length_cm: 40.0, width_cm: 20.0 });
    }

    #[test]
    fn region_touching_the_border_is_measured() {
        let mask = rect_mask(400, 300, 0, 0, 400, 200);
        let m = measure_foot(&mask, 10.0).expect("measure");
        assert_eq!(m, Measurement { length_cm: 40.0, width_cm: 20.0 });
    }

    #[test]
    fn largest_region_wins() {
        let mut mask = rect_mask(600, 400, 300, 100, 250, 120);
        for y in 10..60 {
            for x in 10..90 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let m = measure_foot(&mask, 10.0).expect("measure");
        assert_eq!(m, Measurement { length_cm: 25.0, width_cm: 12.0 });
    }

    #[test]
    fn empty_mask_has_no_contour() {
        let mask = GrayImage::new(200, 100);
        assert!(matches!(measure_foot(&mask, 10.0), Err(ImageError::NoFootContour)));
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mask = rect_mask(100, 100, 10, 10, 20, 20);
        for ppcm in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(measure_foot(&mask, ppcm), Err(ImageError::InvalidScale(_))));
        }
    }
}
