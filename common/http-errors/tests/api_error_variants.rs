use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::ApiError;
use std::collections::BTreeMap;
use uuid::Uuid;

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "invalid_quantity", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_quantity");
}

#[test]
fn validation_variant_carries_field_errors() {
    let mut fields = BTreeMap::new();
    fields.insert("postal_code".to_string(), "required".to_string());
    let err = ApiError::Validation { code: "address_validation_failed", trace_id: None, field_errors: fields };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "address_validation_failed");
}

#[test]
fn not_found_variant() {
    let err = ApiError::not_found("stock_not_found", None);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "stock_not_found");
}

#[test]
fn conflict_variant() {
    let err = ApiError::Conflict { code: "insufficient_stock", trace_id: None, message: Some("requested 3, available 1".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "insufficient_stock");
}

#[test]
fn bad_gateway_variant() {
    let err = ApiError::BadGateway { code: "payment_failed", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "payment_failed");
}

#[test]
fn internal_variant() {
    let trace = Some(Uuid::new_v4());
    let err = ApiError::Internal { trace_id: trace, message: Some("boom".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}
