//! Pipeline configuration.

use crate::error::ParamsError;
use footmeasure_aruco::{builtins, ArucoError, ArucoParams};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`RectifyParams::known_width_cm`].
pub const ENV_KNOWN_WIDTH_CM: &str = "FOOTMEASURE_KNOWN_WIDTH_CM";
/// Environment variable overriding [`RectifyParams::ideal_width_pixels`].
pub const ENV_IDEAL_WIDTH_PIXELS: &str = "FOOTMEASURE_IDEAL_WIDTH_PIXELS";

/// Scale and layout of the rectified canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyParams {
    /// Real distance between the two reference markers, in centimeters.
    pub known_width_cm: f64,
    /// Canvas distance the reference markers are mapped to, in pixels.
    pub ideal_width_pixels: f64,
    /// Canvas margin as a fraction of `ideal_width_pixels`.
    pub margin_frac: f64,
    /// Real height spanned by the second reference point pair, in centimeters.
    pub reference_height_cm: f64,
}

impl Default for RectifyParams {
    fn default() -> Self {
        Self {
            known_width_cm: 30.0,
            ideal_width_pixels: 1000.0,
            margin_frac: 0.1,
            reference_height_cm: 5.0,
        }
    }
}

impl RectifyParams {
    #[inline]
    pub fn pixels_per_cm(&self) -> f64 {
        self.ideal_width_pixels / self.known_width_cm
    }
}

/// Which side of the Otsu level is the foot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForegroundPolarity {
    /// Foot darker than the background: pixels `<= level` are foreground.
    #[default]
    Darker,
    /// Foot brighter than the background: pixels `> level` are foreground.
    Brighter,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarpInterpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Warp and segmentation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Canvas size as a multiple of the input size.
    pub canvas_scale: u32,
    pub interpolation: WarpInterpolation,
    /// RGB value of canvas pixels with no source pixel.
    pub border_fill: [u8; 3],
    /// Gaussian blur kernel side (odd; 1 disables blurring).
    pub blur_kernel: u32,
    /// Square structuring element side for close/open (odd; 1 disables).
    pub morph_kernel: u32,
    pub polarity: ForegroundPolarity,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            canvas_scale: 2,
            interpolation: WarpInterpolation::Bilinear,
            border_fill: [0, 0, 0],
            blur_kernel: 7,
            morph_kernel: 5,
            polarity: ForegroundPolarity::Darker,
        }
    }
}

/// Complete configuration of a [`crate::FootMeasurer`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    pub rectify: RectifyParams,
    pub segment: SegmentParams,
    pub aruco: ArucoParams,
}

impl MeasureParams {
    /// Apply [`ENV_KNOWN_WIDTH_CM`] and [`ENV_IDEAL_WIDTH_PIXELS`] from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key/value source. Unparsable or
    /// non-positive values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut f64); 2] = [
            (ENV_KNOWN_WIDTH_CM, &mut self.rectify.known_width_cm),
            (ENV_IDEAL_WIDTH_PIXELS, &mut self.rectify.ideal_width_pixels),
        ];
        for (key, slot) in targets {
            let Some(raw) = lookup(key) else {
                continue;
            };
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => {
                    log::info!("{} = {} (was {})", key, v, slot);
                    *slot = v;
                }
                _ => log::warn!("ignoring {}={:?}: expected a positive number", key, raw),
            }
        }
    }

    /// Check every field; the pipeline assumes a validated configuration.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let r = &self.rectify;
        positive("rectify.known_width_cm", r.known_width_cm)?;
        positive("rectify.ideal_width_pixels", r.ideal_width_pixels)?;
        positive("rectify.reference_height_cm", r.reference_height_cm)?;
        if !r.margin_frac.is_finite() || r.margin_frac < 0.0 {
            return Err(ParamsError::OutOfRange {
                field: "rectify.margin_frac",
                expected: "finite and >= 0",
                value: r.margin_frac,
            });
        }

        let s = &self.segment;
        if !(1..=8).contains(&s.canvas_scale) {
            return Err(ParamsError::OutOfRange {
                field: "segment.canvas_scale",
                expected: "in 1..=8",
                value: s.canvas_scale as f64,
            });
        }
        odd_kernel("segment.blur_kernel", s.blur_kernel)?;
        odd_kernel("segment.morph_kernel", s.morph_kernel)?;

        if builtins::builtin_dictionary(&self.aruco.dictionary).is_none() {
            return Err(ArucoError::UnknownDictionary(self.aruco.dictionary.clone()).into());
        }
        self.aruco.validate()?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            field,
            expected: "finite and > 0",
            value,
        })
    }
}

fn odd_kernel(field: &'static str, value: u32) -> Result<(), ParamsError> {
    // morphology radii are u8
    if value % 2 == 1 && value <= 511 {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            field,
            expected: "an odd size in 1..=511",
            value: value as f64,
        })
    }
}
