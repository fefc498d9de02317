use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use common_http_errors::ApiError;

use crate::app::AppState;
use crate::model::{Order, ReturnLogEntry};
use crate::returns::{self, ReturnItemRequest};

#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub items: Vec<ReturnItemRequest>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

pub async fn create_return(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CreateReturnRequest>,
) -> Result<Json<Order>, ApiError> {
    let reason = payload.reason.as_deref().unwrap_or("unspecified");
    let actor = payload.actor.as_deref().unwrap_or("operator");
    let order = returns::process_return(
        &state.db,
        &state.config.pricing,
        order_id,
        &payload.items,
        reason,
        actor,
    )
    .await?;
    state.metrics.returns_processed.inc();
    Ok(Json(order))
}

pub async fn list_order_returns(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<ReturnLogEntry>>, ApiError> {
    let entries = returns::list_returns(&state.db, order_id).await?;
    Ok(Json(entries))
}
