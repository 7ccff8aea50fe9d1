//! Image-to-canvas perspective transform from the two reference markers.

use crate::error::ImageError;
use crate::params::RectifyParams;
use footmeasure_aruco::MarkerDetection;
use footmeasure_core::{homography_from_4pt, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mapping from one input image to the metric canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Input pixel coordinates to canvas pixel coordinates.
    pub homography: Homography,
    pub pixels_per_cm: f64,
    /// Direction from the first to the second marker center, in the input image.
    ///
    /// Not applied to the warp yet; reported for callers that want to
    /// reject strongly rotated captures.
    pub orientation_rad: f64,
}

/// Build the canvas transform from the first two detections.
///
/// The detector returns markers sorted by id, so the reference pair is the
/// two lowest ids present. Corners 0 and 2 of each marker are used, which
/// assumes the markers are mounted in a fixed orientation.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(markers, params), fields(markers = markers.len()))
)]
pub fn compute_transform(
    markers: &[MarkerDetection],
    params: &RectifyParams,
) -> Result<Transform, ImageError> {
    let [m0, m1, ..] = markers else {
        return Err(ImageError::InsufficientMarkers {
            found: markers.len(),
        });
    };
    check_params(params)?;

    let c0 = center(m0);
    let c1 = center(m1);
    let orientation_rad = (c1.y - c0.y).atan2(c1.x - c0.x);

    let ppcm = params.pixels_per_cm();
    let w = params.ideal_width_pixels;
    let m = params.margin_frac * w;
    let h = params.reference_height_cm * ppcm;

    let src = [m0.corners[0], m0.corners[2], m1.corners[0], m1.corners[2]];
    let dst = [(m, m), (m, m + h), (m + w, m), (m + w, m + h)]
        .map(|(x, y)| Point2::new(x as f32, y as f32));

    let homography = homography_from_4pt(&src, &dst).ok_or(ImageError::DegenerateMarkers)?;
    log::debug!(
        "markers {} and {}: {:.2} px/cm, orientation {:.1} deg",
        m0.id,
        m1.id,
        ppcm,
        orientation_rad.to_degrees()
    );

    Ok(Transform {
        homography,
        pixels_per_cm: ppcm,
        orientation_rad,
    })
}

fn center(m: &MarkerDetection) -> Point2<f64> {
    let (sx, sy) = m
        .corners
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    Point2::new(sx / 4.0, sy / 4.0)
}

fn check_params(p: &RectifyParams) -> Result<(), ImageError> {
    let ok = |v: f64| v.is_finite() && v > 0.0;
    if !ok(p.known_width_cm) || !ok(p.ideal_width_pixels) || !ok(p.reference_height_cm) {
        return Err(ImageError::InvalidParams(format!(
            "rectify widths must be positive: known_width_cm={}, ideal_width_pixels={}, reference_height_cm={}",
            p.known_width_cm, p.ideal_width_pixels, p.reference_height_cm
        )));
    }
    if !p.margin_frac.is_finite() || p.margin_frac < 0.0 {
        return Err(ImageError::InvalidParams(format!(
            "margin_frac must be >= 0, got {}",
            p.margin_frac
        )));
    }
    Ok(())
}
