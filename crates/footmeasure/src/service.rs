//! Transport-agnostic request handling for the measurement and health endpoints.
//!
//! Responses are plain `(status, headers, body)` triples so any HTTP layer
//! can forward them unchanged.

use crate::aggregate::AggregateResult;
use crate::error::ServiceError;
use crate::pipeline::FootMeasurer;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "foot_measurement";

/// Body of a measurement request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureRequest {
    /// Base64 encoded images (plain or `data:` URLs).
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// A complete HTTP-style response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ServiceResponse {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![
                ("Access-Control-Allow-Origin".into(), "*".into()),
                ("Content-Type".into(), "application/json".into()),
            ],
            body,
        }
    }

    fn error(err: &ServiceError) -> Self {
        Self::json(err.status(), json!({ "error": err.to_string() }).to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Measurement endpoint bound to one shared [`FootMeasurer`].
#[derive(Clone, Debug)]
pub struct MeasureService {
    measurer: FootMeasurer,
}

impl MeasureService {
    pub fn new(measurer: FootMeasurer) -> Self {
        Self { measurer }
    }

    pub fn measurer(&self) -> &FootMeasurer {
        &self.measurer
    }

    /// Handle a raw JSON request body.
    pub fn handle_measure(&self, body: &str) -> ServiceResponse {
        match serde_json::from_str::<Option<MeasureRequest>>(body) {
            Ok(req) => self.handle_request(&req.unwrap_or_default()),
            Err(e) => ServiceResponse::error(&ServiceError::InvalidRequest(e.to_string())),
        }
    }

    /// Handle an already parsed request.
    pub fn handle_request(&self, req: &MeasureRequest) -> ServiceResponse {
        let outcome = guarded(|| self.measure(req)).and_then(|r| {
            serde_json::to_string(&r).map_err(|e| ServiceError::Internal(e.to_string()))
        });
        match outcome {
            Ok(body) => ServiceResponse::json(200, body),
            Err(err) => {
                if err.status() >= 500 {
                    log::error!("measure request failed: {}", err);
                } else {
                    log::info!("measure request rejected: {}", err);
                }
                ServiceResponse::error(&err)
            }
        }
    }

    /// Run the batch for `req` and return the aggregate.
    pub fn measure(&self, req: &MeasureRequest) -> Result<AggregateResult, ServiceError> {
        let images = match req.images.as_deref() {
            Some(images) if !images.is_empty() => images,
            _ => return Err(ServiceError::NoImages),
        };
        log::info!("measure request with {} images", images.len());
        Ok(self.measurer.measure_batch(images).result?)
    }
}

/// Liveness report with the current UTC time.
pub fn health() -> ServiceResponse {
    let body = HealthBody {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    };
    match serde_json::to_string(&body) {
        Ok(body) => ServiceResponse::json(200, body),
        Err(e) => ServiceResponse::json(
            500,
            json!({ "status": "unhealthy", "error": e.to_string() }).to_string(),
        ),
    }
}

/// CORS preflight answer for the health endpoint.
pub fn preflight() -> ServiceResponse {
    ServiceResponse {
        status: 204,
        headers: [
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET"),
            ("Access-Control-Allow-Headers", "Content-Type"),
            ("Access-Control-Max-Age", "3600"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        body: String::new(),
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    service: &'static str,
}

/// Run `f`, turning a panic into [`ServiceError::Internal`].
fn guarded<T>(f: impl FnOnce() -> Result<T, ServiceError>) -> Result<T, ServiceError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ServiceError::Internal(panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
