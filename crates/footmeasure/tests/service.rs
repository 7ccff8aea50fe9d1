mod common;

use footmeasure::{FootMeasurer, MeasureParams, MeasureRequest, MeasureService};
use serde_json::{json, Value};

fn service() -> MeasureService {
    MeasureService::new(FootMeasurer::new(MeasureParams::default()).expect("measurer"))
}

fn body(resp: &footmeasure::ServiceResponse) -> Value {
    serde_json::from_str(&resp.body).expect("json body")
}

#[test]
fn successful_request_reports_aggregate_fields() {
    let scene = common::png_base64(&common::scene());
    let req = json!({ "images": [scene, common::png_base64(&common::blank())] });

    let resp = service().handle_measure(&req.to_string());
    assert_eq!(resp.status, 200, "{}", resp.body);
    assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));

    let v = body(&resp);
    assert_eq!(v["num_images_processed"], 1);
    assert_eq!(v["confidence"], 1.0);
    let length = v["foot_length_cm"].as_f64().expect("length");
    let width = v["foot_width_cm"].as_f64().expect("width");
    assert!((length - 18.0).abs() < 0.5, "{length}");
    assert!((width - 9.0).abs() < 0.5, "{width}");
}

#[test]
fn empty_image_list_is_rejected() {
    let resp = service().handle_request(&MeasureRequest {
        images: Some(Vec::new()),
    });
    assert_eq!(resp.status, 400);
    assert_eq!(body(&resp), json!({ "error": "No images provided" }));
}

#[test]
fn all_images_failing_is_rejected() {
    let blank = common::png_base64(&common::blank());
    let req = json!({ "images": [blank.clone(), blank] });
    let resp = service().handle_measure(&req.to_string());
    assert_eq!(resp.status, 400);
    assert_eq!(body(&resp), json!({ "error": "Could not process any images" }));
}

#[test]
fn non_json_body_is_rejected() {
    let resp = service().handle_measure("images=abc");
    assert_eq!(resp.status, 400);
    assert!(body(&resp)["error"]
        .as_str()
        .expect("error")
        .starts_with("invalid request body"));
}

#[test]
fn health_and_preflight() {
    let resp = footmeasure::health();
    assert_eq!(resp.status, 200);
    let v = body(&resp);
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["service"], "foot_measurement");

    let pre = footmeasure::preflight();
    assert_eq!(pre.status, 204);
    assert_eq!(pre.header("Access-Control-Allow-Headers"), Some("Content-Type"));
}
