//! Error types of the measurement pipeline and the request handler.

use footmeasure_aruco::ArucoError;

/// Failure to turn an encoded payload into a raster image.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unreadable image data: {0}")]
    Image(#[from] image::ImageError),
    #[error("image has no pixels")]
    EmptyImage,
}

/// Reason a single image was skipped. Never aborts a batch.
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("need 2 reference markers, found {found}")]
    InsufficientMarkers { found: usize },
    #[error("reference marker corners do not define a perspective transform")]
    DegenerateMarkers,
    #[error("no foot contour in the segmented image")]
    NoFootContour,
    #[error("pixels_per_cm must be finite and positive, got {0}")]
    InvalidScale(f64),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no valid measurements to aggregate")]
    NoValidMeasurements,
}

/// Rejected configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
    #[error(transparent)]
    Aruco(#[from] ArucoError),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Request-level failure. The messages are part of the wire contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("No images provided")]
    NoImages,
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
    #[error("Could not process any images")]
    NoValidMeasurements,
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::NoImages | Self::InvalidRequest(_) | Self::NoValidMeasurements => 400,
            Self::Internal(_) => 500,
        }
    }
}

impl From<AggregateError> for ServiceError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NoValidMeasurements => Self::NoValidMeasurements,
        }
    }
}
