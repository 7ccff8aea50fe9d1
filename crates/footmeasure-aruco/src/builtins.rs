//! Embedded built-in dictionaries.
//!
//! The source of truth lives in `footmeasure-aruco/data/*_CODES.json`.

#![allow(clippy::unreadable_literal, non_upper_case_globals)]

use crate::Dictionary;

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));
