use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use common_http_errors::ApiError;

use crate::app::AppState;
use crate::cart::{self, CartLine};
use crate::error::CheckoutError;

/// Persisted-cart endpoints are keyed by the caller-supplied `X-User-ID`
/// header; identity verification is the auth layer's concern, not this
/// service's.
pub(crate) fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get("X-User-ID")
        .ok_or(ApiError::BadRequest {
            code: "missing_user_id",
            trace_id: None,
            message: Some("Missing X-User-ID header".to_string()),
        })?
        .to_str()
        .map_err(|_| ApiError::bad_request("invalid_user_id", None))?
        .trim();
    Uuid::parse_str(value).map_err(|_| ApiError::bad_request("invalid_user_id", None))
}

pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let lines = cart::load_user_cart(&state.db, user_id).await?;
    Ok(Json(lines))
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub stock_id: Uuid,
    pub quantity: i32,
}

pub async fn add_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<Json<CartLine>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let line = cart::add_to_cart(&state.db, user_id, payload.stock_id, payload.quantity).await?;
    Ok(Json(line))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let mut conn = state.db.acquire().await.map_err(CheckoutError::from)?;
    let removed = cart::clear_user_cart(&mut conn, user_id).await?;
    Ok(Json(json!({ "removed": removed })))
}
