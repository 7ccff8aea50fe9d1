//! Foot length and width from photos with two reference markers.
//!
//! The pipeline per image:
//! - decode a base64 (or raw) image payload to RGB,
//! - detect `DICT_4X4_50` markers and take the two lowest ids as the reference pair,
//! - warp the photo into a canvas with a known pixels-per-centimeter scale,
//! - segment the foot with Otsu thresholding and morphology,
//! - fit a minimum-area rectangle to the largest foreground contour.
//!
//! Batches skip images that fail any stage and aggregate the rest into a
//! mean size with a confidence derived from the spread.
//!
//! ## Quickstart
//!
//! ```no_run
//! use footmeasure::{FootMeasurer, MeasureParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let measurer = FootMeasurer::new(MeasureParams::default())?;
//! let images = vec![std::fs::read("left.jpg")?, std::fs::read("right.jpg")?];
//! let report = measurer.measure_batch_bytes(&images);
//! let result = report.result?;
//! println!("{} x {} cm ({})", result.length_cm, result.width_cm, result.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `footmeasure::core`: image views, homography, planar geometry, logger.
//! - `footmeasure::aruco`: dictionaries, marker detection and rendering.
//! - [`service`]: JSON request handler and health endpoint.

pub use footmeasure_aruco as aruco;
pub use footmeasure_core as core;

pub mod aggregate;
pub mod decode;
pub mod error;
mod io;
pub mod measure;
pub mod params;
mod pipeline;
pub mod rectify;
pub mod segment;
pub mod service;

pub use aggregate::{aggregate, AggregateResult};
pub use decode::{decode_base64_image, decode_image_bytes};
pub use error::{
    AggregateError, ConfigIoError, DecodeError, ImageError, ParamsError, ServiceError,
};
pub use io::{ImageReport, MeasureReport};
pub use measure::{measure_foot, Measurement};
pub use params::{ForegroundPolarity, MeasureParams, RectifyParams, SegmentParams, WarpInterpolation};
pub use pipeline::{gray_view, BatchReport, FootMeasurer, ImageOutcome};
pub use rectify::{compute_transform, Transform};
pub use service::{health, preflight, MeasureRequest, MeasureService, ServiceResponse};
