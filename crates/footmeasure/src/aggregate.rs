//! Multi-image statistics and confidence.

use crate::error::AggregateError;
use crate::measure::Measurement;
use serde::{Deserialize, Serialize};

/// Combined result of a batch. Field names follow the response contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(rename = "foot_length_cm")]
    pub length_cm: f64,
    #[serde(rename = "foot_width_cm")]
    pub width_cm: f64,
    /// `1 / (1 + σ_length + σ_width)`, 1.0 when all images agree.
    pub confidence: f64,
    pub num_images_processed: usize,
}

/// Mean length and width plus a spread-based confidence.
///
/// Standard deviations are population (divide by `n`). Means are rounded
/// to one decimal, the confidence to two.
pub fn aggregate(measurements: &[Measurement]) -> Result<AggregateResult, AggregateError> {
    if measurements.is_empty() {
        return Err(AggregateError::NoValidMeasurements);
    }
    let lengths: Vec<f64> = measurements.iter().map(|m| m.length_cm).collect();
    let widths: Vec<f64> = measurements.iter().map(|m| m.width_cm).collect();

    let (mean_len, std_len) = mean_std(&lengths);
    let (mean_wid, std_wid) = mean_std(&widths);
    let confidence = 1.0 / (1.0 + std_len + std_wid);

    Ok(AggregateResult {
        length_cm: round_to(mean_len, 1),
        width_cm: round_to(mean_wid, 1),
        confidence: round_to(confidence, 2),
        num_images_processed: measurements.len(),
    })
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
