//! JSON configuration and report helpers.

use crate::error::ConfigIoError;
use crate::{AggregateResult, BatchReport, Measurement, MeasureParams};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

impl MeasureParams {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Outcome of one input image in a [`MeasureReport`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageReport {
    pub index: usize,
    /// Where the image came from (file path, or `request[i]`).
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-image and aggregate results of one batch, as written by the CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeasureReport {
    pub params: MeasureParams,
    pub images: Vec<ImageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AggregateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MeasureReport {
    /// Flatten a [`BatchReport`]; `sources[i]` labels input `i`.
    pub fn from_batch(params: &MeasureParams, sources: &[String], batch: &BatchReport) -> Self {
        let images = batch
            .outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| ImageReport {
                index,
                source: sources
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("request[{index}]")),
                measurement: outcome.as_ref().ok().cloned(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            })
            .collect();

        let (result, error) = match &batch.result {
            Ok(r) => (Some(r.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            params: params.clone(),
            images,
            result,
            error,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
