//! Square fiducial marker detection for footmeasure.
//!
//! This crate provides:
//! - embedded dictionaries (compiled in from `data/*_CODES.json`),
//! - matching observed bit codes against a dictionary in all four rotations,
//! - a full-image detector ([`ArucoDetector`]) that finds dark quadrilaterals,
//!   samples their bit grid and reports sub-pixel corners in the marker's own
//!   top-left, top-right, bottom-right, bottom-left order,
//! - rendering of printable markers ([`render_marker`]).

pub mod builtins;
mod decode;
mod detector;
mod dictionary;
mod error;
mod matcher;
mod quad;
mod render;
mod threshold;

pub use decode::MarkerDetection;
pub use detector::{ArucoDetector, ArucoParams};
pub use dictionary::Dictionary;
pub use error::ArucoError;
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use render::{render_marker, MAX_RENDER_SIDE};
