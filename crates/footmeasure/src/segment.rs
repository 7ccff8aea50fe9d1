//! Warp into the metric canvas and separate the foot from the background.

use crate::params::{ForegroundPolarity, SegmentParams, WarpInterpolation};
use crate::rectify::Transform;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    contrast::{otsu_level, threshold, ThresholdType},
    distance_transform::Norm,
    filter::separable_filter_equal,
    geometric_transformations::{warp_into, Interpolation, Projection},
    map::map_colors,
    morphology,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Warp `image` into a `canvas_scale`× sized canvas through `transform`.
///
/// Canvas pixels whose pre-image falls outside the input take `border_fill`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(w = image.width(), h = image.height()))
)]
pub fn warp_to_canvas(image: &RgbImage, transform: &Transform, params: &SegmentParams) -> RgbImage {
    let fill = Rgb(params.border_fill);
    let scale = params.canvas_scale.max(1);
    let mut canvas = RgbImage::from_pixel(image.width() * scale, image.height() * scale, fill);

    let Some(projection) = Projection::from_matrix(transform.homography.to_row_major_f32()) else {
        // only reachable with an f32-singular matrix
        log::warn!("transform is not invertible in f32, canvas left blank");
        return canvas;
    };
    let interpolation = match params.interpolation {
        WarpInterpolation::Nearest => Interpolation::Nearest,
        WarpInterpolation::Bilinear => Interpolation::Bilinear,
        WarpInterpolation::Bicubic => Interpolation::Bicubic,
    };
    warp_into(image, &projection, interpolation, fill, &mut canvas);
    canvas
}

/// Binary foot mask (foreground 255) of a rectified image.
///
/// Grayscale, Gaussian blur, global Otsu threshold in the configured
/// polarity, then a morphological close and open with a square element.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(w = rectified.width(), h = rectified.height()))
)]
pub fn segment_foot(rectified: &RgbImage, params: &SegmentParams) -> GrayImage {
    let gray = luma_bt601(rectified);
    let blurred = if params.blur_kernel > 1 {
        separable_filter_equal(&gray, &gaussian_kernel(params.blur_kernel as usize))
    } else {
        gray
    };

    let level = otsu_level(&blurred);
    let kind = match params.polarity {
        ForegroundPolarity::Darker => ThresholdType::BinaryInverted,
        ForegroundPolarity::Brighter => ThresholdType::Binary,
    };
    let mut mask = threshold(&blurred, level, kind);
    log::debug!("otsu level {} ({:?} foreground)", level, params.polarity);

    let radius = (params.morph_kernel / 2).min(u8::MAX as u32) as u8;
    if radius > 0 {
        mask = morphology::close(&mask, Norm::LInf, radius);
        mask = morphology::open(&mask, Norm::LInf, radius);
    }
    mask
}

/// Grayscale with BT.601 weights in 14-bit fixed point, rounded.
pub fn luma_bt601(image: &RgbImage) -> GrayImage {
    map_colors(image, |Rgb([r, g, b])| {
        let y = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        Luma([y as u8])
    })
}

/// Normalized 1-D Gaussian of odd size `k`, sigma derived from the size.
pub(crate) fn gaussian_kernel(k: usize) -> Vec<f32> {
    let sigma = 0.3 * ((k as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let c = (k / 2) as f64;
    let raw: Vec<f64> = (0..k)
        .map(|i| {
            let d = i as f64 - c;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use footmeasure_core::Homography;

    fn identity_transform() -> Transform {
        Transform {
            homography: Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            pixels_per_cm: 10.0,
            orientation_rad: 0.0,
        }
    }

    fn foot_scene() -> RgbImage {
        RgbImage::from_fn(160, 120, |x, y| {
            if (40..120).contains(&x) && (30..80).contains(&y) {
                Rgb([60, 50, 45])
            } else {
                Rgb([230, 228, 220])
            }
        })
    }

    #[test]
    fn luma_uses_bt601_weights() {
        let img = RgbImage::from_fn(5, 1, |x, _| {
            [
                Rgb([255, 0, 0]),
                Rgb([0, 255, 0]),
                Rgb([0, 0, 255]),
                Rgb([255, 255, 255]),
                Rgb([60, 45, 40]),
            ][x as usize]
        });
        let gray = luma_bt601(&img);
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![76, 150, 29, 255, 49]);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(7);
        assert_eq!(k.len(), 7);
        assert_relative_eq!(k.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        for i in 0..3 {
            assert_relative_eq!(k[i], k[6 - i], epsilon = 1e-7);
        }
        assert!(k[3] > k[2] && k[2] > k[1]);
    }

    #[test]
    fn canvas_is_scaled_and_filled_outside_the_input() {
        let img = foot_scene();
        let canvas = warp_to_canvas(&img, &identity_transform(), &SegmentParams::default());
        assert_eq!(canvas.dimensions(), (320, 240));
        assert_eq!(canvas.get_pixel(80, 50), &Rgb([60, 50, 45]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([230, 228, 220]));
        assert_eq!(canvas.get_pixel(300, 200), &Rgb([0, 0, 0]));
    }

    #[test]
    fn mask_is_binary_with_input_extent() {
        let img = foot_scene();
        let mask = segment_foot(&img, &SegmentParams::default());
        assert_eq!(mask.dimensions(), img.dimensions());
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(mask.get_pixel(80, 55).0[0], 255);
        assert_eq!(mask.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn brighter_polarity_flips_the_mask() {
        let img = foot_scene();
        let params = SegmentParams {
            polarity: ForegroundPolarity::Brighter,
            ..SegmentParams::default()
        };
        let mask = segment_foot(&img, &params);
        assert_eq!(mask.get_pixel(80, 55).0[0], 0);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
    }

    #[test]
    fn morphology_removes_specks() {
        let mut img = foot_scene();
        img.put_pixel(10, 100, Rgb([0, 0, 0]));
        let params = SegmentParams {
            blur_kernel: 1,
            ..SegmentParams::default()
        };
        let mask = segment_foot(&img, &params);
        assert_eq!(mask.get_pixel(10, 100).0[0], 0);
        assert_eq!(mask.get_pixel(80, 55).0[0], 255);
    }
}
