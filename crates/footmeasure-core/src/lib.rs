//! Core types and utilities for the footmeasure pipeline.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image codec or marker detector: image data is
//! exchanged through the lightweight [`GrayImageView`] type.

mod geometry;
mod homography;
mod image;
mod logger;

pub use geometry::{
    convex_hull, fit_line, intersect_lines, min_area_rect, oriented_area, Line2, RotatedRect,
};
pub use homography::{homography_from_4pt, Homography};
pub use image::{GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
