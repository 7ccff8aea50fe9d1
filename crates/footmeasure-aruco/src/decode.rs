//! Bit sampling and dictionary decoding of candidate quads.

use crate::quad::Quad;
use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;
use footmeasure_core::{homography_from_4pt, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One decoded marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Image-space corners: the marker's own top-left, top-right,
    /// bottom-right, bottom-left. Integer coordinates are pixel centers.
    pub corners: [Point2<f32>; 4],
    /// Clockwise quarter turns of the marker relative to its dictionary pattern.
    pub rotation: u8,
    pub hamming: u8,
    /// `border_score` scaled down by the fraction of corrected bits.
    pub score: f32,
    /// Fraction of border cells read as black.
    pub border_score: f32,
    /// Observed inner bits (row-major, black = 1), before rotation.
    pub code: u64,
    /// Whether the marker was read with inverted polarity.
    pub inverted: bool,
}

/// Smallest canonical marker side that still leaves room for 3×3 sampling.
const MIN_SIDE_PX: f32 = 12.0;

/// Minimum spread between the darkest and brightest cell sample.
const MIN_CONTRAST: u8 = 20;

/// Sample layout over the canonical `side × side` marker square.
#[derive(Clone, Debug)]
pub(crate) struct SampleGrid {
    side: f32,
    cells: usize,
    bits: usize,
    border: usize,
    /// Cell centers, row-major: `cy * cells + cx`.
    points: Vec<Point2<f32>>,
    /// Denser grid used to estimate the black/white threshold.
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    pub(crate) fn new(bits: usize, border: usize, side: f32, inset_frac: f32) -> Option<Self> {
        let cells = bits + 2 * border;
        if bits == 0 || bits * bits > 64 || side.is_nan() || side < MIN_SIDE_PX {
            return None;
        }

        let inset = (inset_frac.clamp(0.0, 0.25) * side / cells as f32).max(0.0);
        let step = side / cells as f32;

        let mut points = Vec::with_capacity(cells * cells);
        for cy in 0..cells {
            for cx in 0..cells {
                points.push(Point2::new(
                    (cx as f32 + 0.5) * step,
                    (cy as f32 + 0.5) * step,
                ));
            }
        }

        // three samples per cell and axis, kept away from cell edges by `inset`
        const SUBDIV: usize = 3;
        let sub = (step - 2.0 * inset) / SUBDIV as f32;
        let mut threshold_points = Vec::with_capacity(cells * cells * SUBDIV * SUBDIV);
        for cy in 0..cells {
            for cx in 0..cells {
                for sy in 0..SUBDIV {
                    for sx in 0..SUBDIV {
                        threshold_points.push(Point2::new(
                            cx as f32 * step + inset + (sx as f32 + 0.5) * sub,
                            cy as f32 * step + inset + (sy as f32 + 0.5) * sub,
                        ));
                    }
                }
            }
        }

        Some(Self {
            side,
            cells,
            bits,
            border,
            points,
            threshold_points,
        })
    }

    fn square(&self) -> [Point2<f32>; 4] {
        let s = self.side;
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }
}

#[derive(Clone, Copy, Debug)]
struct Observation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

/// Decode one candidate quad; `None` if it is not a dictionary marker.
pub(crate) fn decode_quad(
    img: &GrayImageView<'_>,
    quad: &Quad,
    grid: &SampleGrid,
    matcher: &Matcher,
    min_border_score: f32,
    allow_inverted: bool,
) -> Option<MarkerDetection> {
    let h = homography_from_4pt(&grid.square(), quad)?;
    let obs = observe(img, &h, grid, min_border_score, allow_inverted)?;
    let m = matcher.match_code(obs.code)?;

    let bits = matcher.dictionary().bit_count().max(1) as f32;
    let score = (obs.border_score * (1.0 - m.hamming as f32 / bits)).clamp(0.0, 1.0);

    let corners = m.marker_corners(*quad);

    Some(MarkerDetection {
        id: m.id,
        corners,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        code: obs.code,
        inverted: obs.inverted,
    })
}

fn observe(
    img: &GrayImageView<'_>,
    h: &Homography,
    grid: &SampleGrid,
    min_border_score: f32,
    allow_inverted: bool,
) -> Option<Observation> {
    let mut samples = Vec::with_capacity(grid.points.len());
    for p in &grid.points {
        let q = h.apply(*p);
        samples.push(img.mean_3x3(q.x, q.y)?);
    }
    let lo = samples.iter().copied().min().unwrap_or(0);
    let hi = samples.iter().copied().max().unwrap_or(0);
    if hi.saturating_sub(lo) < MIN_CONTRAST {
        return None;
    }

    let thr_samples: Vec<u8> = grid
        .threshold_points
        .iter()
        .filter_map(|p| {
            let q = h.apply(*p);
            img.mean_3x3(q.x, q.y)
        })
        .collect();
    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(&samples)
    } else {
        otsu_threshold_from_samples(&thr_samples)
    };

    let cells = grid.cells;
    let border = grid.border;
    let polarities: &[bool] = if allow_inverted {
        &[false, true]
    } else {
        &[false]
    };

    let mut best: Option<Observation> = None;
    for &inverted in polarities {
        let mut border_black = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] <= thr) != inverted;
                let on_border = border > 0
                    && (cx < border || cy < border || cx >= cells - border || cy >= cells - border);
                if on_border {
                    border_total += 1;
                    border_black += is_black as u32;
                } else if is_black {
                    code |= 1u64 << ((cy - border) * grid.bits + (cx - border));
                }
            }
        }

        let border_score = if border_total > 0 {
            border_black as f32 / border_total as f32
        } else {
            1.0
        };
        if border_score < min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(Observation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

/// Keep the highest-scoring detection per id, sorted by ascending id.
pub(crate) fn dedup_by_id_keep_best(mut dets: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    dets.sort_by(|a, b| a.id.cmp(&b.id).then(b.score.total_cmp(&a.score)));
    let mut seen = HashSet::new();
    dets.retain(|d| seen.insert(d.id));
    dets
}
