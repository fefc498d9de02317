use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use common_http_errors::ApiError;

use crate::app::AppState;
use crate::gateway::{GatewayResult, GatewayStatus};
use crate::model::Order;
use crate::order_assembler;
use crate::payment_completion;

/// Callback for an out-of-band gateway verdict (webhook or operator action)
/// on an order left pending or failed at checkout time. Completion here is
/// idempotent with the inline completion path.
pub async fn complete_order_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(result): Json<GatewayResult>,
) -> Result<Json<Order>, ApiError> {
    match result.status {
        GatewayStatus::Success => {
            let order = payment_completion::complete_payment(
                &state.db,
                order_id,
                result.gateway_reference.as_deref(),
                state.invoices.as_ref(),
            )
            .await?;
            state.metrics.payments_completed.inc();
            Ok(Json(order))
        }
        GatewayStatus::Failure => {
            let order = payment_completion::fail_payment(&state.db, order_id).await?;
            state.metrics.payment_failures.inc();
            Ok(Json(order))
        }
    }
}

/// Release every reservation still held by a non-paid order and mark it
/// voided. The recovery lever for stale reservations left by failed payments.
pub async fn void_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = order_assembler::void_order(&state.db, order_id).await?;
    Ok(Json(order))
}
