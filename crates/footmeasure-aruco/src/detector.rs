//! Full-image marker detection: threshold, find quads, decode.

use crate::builtins::builtin_dictionary;
use crate::decode::{decode_quad, dedup_by_id_keep_best, MarkerDetection, SampleGrid};
use crate::quad::{find_quads, merge_duplicates};
use crate::threshold::adaptive_threshold_inv;
use crate::{ArucoError, Dictionary, Matcher};
use footmeasure_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Marker detector configuration.
///
/// Defaults follow the usual ArUco detector settings for printed
/// 4×4 markers photographed at moderate distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoParams {
    /// Name of an embedded dictionary, e.g. `"DICT_4X4_50"`.
    pub dictionary: String,
    /// Smallest adaptive-threshold window (pixels, odd).
    pub adaptive_win_min: usize,
    /// Largest adaptive-threshold window.
    pub adaptive_win_max: usize,
    /// Window size increment; `0` uses only `adaptive_win_min`.
    pub adaptive_win_step: usize,
    /// A pixel is dark when it is this much below its window mean.
    pub adaptive_constant: f32,
    /// Contour length bounds relative to `max(width, height)`.
    pub min_perimeter_rate: f32,
    pub max_perimeter_rate: f32,
    /// Polygon simplification tolerance relative to the contour length.
    pub polygonal_approx_accuracy_rate: f32,
    /// Shortest accepted quad side relative to the contour length.
    pub min_corner_distance_rate: f32,
    /// Corners closer than this to the image border are rejected.
    pub min_distance_to_border: u32,
    /// Quads closer than this (relative to side length) are the same marker.
    pub min_marker_distance_rate: f32,
    /// Largest accepted sub-pixel corner correction, in pixels. `0` disables refinement.
    pub max_corner_refine_shift: f32,
    /// Width of the black marker frame, in cells.
    pub border_bits: usize,
    /// Required fraction of frame cells read as black.
    pub min_border_score: f32,
    /// Accepted bit errors, at most the dictionary's correction capacity.
    pub max_hamming: u8,
    /// Side of the canonical square the marker is sampled on.
    pub canonical_px: f32,
    /// Fraction of a cell kept clear of edges when estimating the bit threshold.
    pub inset_frac: f32,
    /// Also try white-on-black markers.
    pub allow_inverted: bool,
}

impl Default for ArucoParams {
    fn default() -> Self {
        Self {
            dictionary: "DICT_4X4_50".to_string(),
            adaptive_win_min: 3,
            adaptive_win_max: 23,
            adaptive_win_step: 10,
            adaptive_constant: 7.0,
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3,
            min_marker_distance_rate: 0.05,
            max_corner_refine_shift: 2.0,
            border_bits: 1,
            min_border_score: 0.8,
            max_hamming: 0,
            canonical_px: 60.0,
            inset_frac: 0.0,
            allow_inverted: false,
        }
    }
}

impl ArucoParams {
    /// Check ranges that would otherwise make detection silently find nothing.
    pub fn validate(&self) -> Result<(), ArucoError> {
        let bad = |msg: &str| Err(ArucoError::InvalidParams(msg.to_string()));

        if self.adaptive_win_min < 3 || self.adaptive_win_max < self.adaptive_win_min {
            return bad("adaptive windows need 3 <= min <= max");
        }
        if !self.adaptive_constant.is_finite() {
            return bad("adaptive_constant must be finite");
        }
        let positive = [
            self.min_perimeter_rate,
            self.max_perimeter_rate,
            self.polygonal_approx_accuracy_rate,
            self.canonical_px,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return bad("perimeter rates, approximation rate and canonical_px must be > 0");
        }
        if self.max_perimeter_rate < self.min_perimeter_rate {
            return bad("max_perimeter_rate < min_perimeter_rate");
        }
        let non_negative = [
            self.min_corner_distance_rate,
            self.min_marker_distance_rate,
            self.max_corner_refine_shift,
            self.inset_frac,
        ];
        if non_negative.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return bad("distance rates, refine shift and inset must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.min_border_score) {
            return bad("min_border_score must be in [0, 1]");
        }
        Ok(())
    }

    fn window_sizes(&self) -> Vec<usize> {
        if self.adaptive_win_step == 0 {
            return vec![self.adaptive_win_min];
        }
        (self.adaptive_win_min..=self.adaptive_win_max)
            .step_by(self.adaptive_win_step)
            .collect()
    }
}

/// Detector for square fiducial markers of one embedded dictionary.
///
/// Construction resolves the dictionary and precomputes the matcher and the
/// sampling grid; [`ArucoDetector::detect`] only reads from `self`, so one
/// detector can be shared across threads.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: ArucoParams,
    matcher: Matcher,
    grid: SampleGrid,
    windows: Vec<usize>,
}

impl ArucoDetector {
    pub fn new(params: ArucoParams) -> Result<Self, ArucoError> {
        params.validate()?;

        let dict = builtin_dictionary(&params.dictionary)
            .ok_or_else(|| ArucoError::UnknownDictionary(params.dictionary.clone()))?;
        if params.max_hamming > dict.max_correction_bits {
            return Err(ArucoError::HammingTooLarge {
                requested: params.max_hamming,
                max: dict.max_correction_bits,
                dictionary: dict.name,
            });
        }

        let grid = SampleGrid::new(
            dict.marker_size,
            params.border_bits,
            params.canonical_px,
            params.inset_frac,
        )
        .ok_or_else(|| {
            ArucoError::InvalidParams(format!(
                "cannot sample {}x{} bits with border {} on a {} px square",
                dict.marker_size, dict.marker_size, params.border_bits, params.canonical_px
            ))
        })?;

        let matcher = Matcher::new(dict, params.max_hamming);
        let windows = params.window_sizes();

        Ok(Self {
            params,
            matcher,
            grid,
            windows,
        })
    }

    #[inline]
    pub fn params(&self) -> &ArucoParams {
        &self.params
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Detect markers in a grayscale image.
    ///
    /// Returns at most one detection per id, sorted by ascending id. An image
    /// without markers yields an empty vector.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn detect(&self, img: &GrayImageView<'_>) -> Vec<MarkerDetection> {
        let mut quads = Vec::new();
        for &win in &self.windows {
            let bin = adaptive_threshold_inv(img, win, self.params.adaptive_constant);
            let found = find_quads(&bin, &self.params);
            log::trace!("window {}: {} quad candidates", win, found.len());
            quads.extend(found);
        }
        let quads = merge_duplicates(quads, self.params.min_marker_distance_rate);

        let detections: Vec<MarkerDetection> = quads
            .iter()
            .filter_map(|q| {
                decode_quad(
                    img,
                    q,
                    &self.grid,
                    &self.matcher,
                    self.params.min_border_score,
                    self.params.allow_inverted,
                )
            })
            .collect();
        let detections = dedup_by_id_keep_best(detections);

        log::debug!(
            "{} candidates, {} markers: {:?}",
            quads.len(),
            detections.len(),
            detections.iter().map(|d| d.id).collect::<Vec<_>>()
        );
        detections
    }
}
