use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common_http_errors::ApiError;

use crate::app::AppState;
use crate::cart::{self, CartLine};
use crate::error::CheckoutError;
use crate::gateway::CustomerIdentity;
use crate::model::{Channel, Order, OrderItem, PaymentMethod, ORDER_COLUMNS, ORDER_ITEM_COLUMNS};
use crate::order_assembler::{self, CheckoutRequest, PaymentMeta};
use crate::pricing::{self, LineInput, PricedLine, ShippingContext};
use crate::address::RawAddress;
use crate::{discounts, stock_ledger};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CartLinePayload {
    pub stock_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ComputeCartRequest {
    pub channel: Channel,
    #[serde(default)]
    pub items: Vec<CartLinePayload>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub apply_discount: bool,
    #[serde(default)]
    pub custom_discounts: HashMap<Uuid, BigDecimal>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub shipping_cost: Option<BigDecimal>,
    #[serde(default)]
    pub home_delivery: bool,
    #[serde(default)]
    pub prefecture_fee: Option<BigDecimal>,
}

#[derive(Debug, Serialize)]
pub struct ComputeCartResponse {
    pub channel: Channel,
    pub lines: Vec<PricedLine>,
    pub subtotal: BigDecimal,
    pub total_discount: BigDecimal,
    pub tax: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total: BigDecimal,
    /// Difference between the undiscounted and discounted subtotals.
    pub saved_amount: BigDecimal,
}

/// Dry-run pricing for a cart (guest lines in the body, or a user's persisted
/// cart). Reads stock but reserves nothing.
pub async fn compute_cart(
    State(state): State<AppState>,
    Json(payload): Json<ComputeCartRequest>,
) -> Result<Json<ComputeCartResponse>, ApiError> {
    let lines = gather_lines(&state, payload.user_id, &payload.items).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    let lines = cart::merge_lines(lines);

    let mut conn = state.db.acquire().await.map_err(CheckoutError::from)?;
    let mut snapshots = Vec::with_capacity(lines.len());
    for line in &lines {
        let stock = stock_ledger::load(&mut conn, line.stock_id).await?;
        let tier_discount = if payload.apply_discount {
            discounts::resolve(&mut conn, line.stock_id, line.quantity).await?
        } else {
            BigDecimal::zero()
        };
        let custom_discount = payload.custom_discounts.get(&line.stock_id).cloned();
        snapshots.push((stock, line.quantity, tier_discount, custom_discount));
    }
    drop(conn);

    let inputs: Vec<LineInput<'_>> = snapshots
        .iter()
        .map(|(stock, quantity, tier_discount, custom_discount)| LineInput {
            stock,
            quantity: *quantity,
            tier_discount: tier_discount.clone(),
            custom_discount: custom_discount.clone(),
        })
        .collect();
    let priced = pricing::price_lines(&inputs, payload.channel, payload.apply_discount)?;

    let shipping_ctx = ShippingContext {
        prefecture_fee: payload.prefecture_fee.clone(),
        home_delivery: payload.home_delivery,
        override_cost: payload.shipping_cost.clone(),
        cash_on_delivery: payload
            .payment_method
            .map(|m| m.is_cash_on_delivery())
            .unwrap_or(false),
    };
    let shipping = pricing::resolve_shipping(payload.channel, &shipping_ctx, &state.config.pricing.cod_surcharge);
    let totals = pricing::cart_totals(&priced, payload.channel.tax_rate(&state.config.pricing), shipping);

    Ok(Json(ComputeCartResponse {
        channel: payload.channel,
        saved_amount: totals.total_discount.clone(),
        lines: priced.lines,
        subtotal: totals.subtotal,
        total_discount: totals.total_discount,
        tax: totals.tax,
        shipping_cost: totals.shipping_cost,
        total: totals.total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub channel: Channel,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<CartLinePayload>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_cost: Option<BigDecimal>,
    #[serde(default)]
    pub home_delivery: bool,
    #[serde(default = "default_true")]
    pub apply_discount: bool,
    #[serde(default)]
    pub custom_discounts: HashMap<Uuid, BigDecimal>,
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub customer: Option<CustomerIdentity>,
}

/// Checkout: reserve stock, persist the order, run the payment, finalize.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let timer = state.metrics.checkout_duration_seconds.start_timer();
    let lines = gather_lines(&state, payload.user_id, &payload.items).await?;

    let req = CheckoutRequest {
        user_id: payload.user_id,
        channel: payload.channel,
        lines,
        address: payload.address,
        customer: payload.customer.unwrap_or_default(),
        payment: PaymentMeta {
            method: payload.payment_method,
            due_date: payload.due_date,
            shipping_cost_override: payload.shipping_cost,
            home_delivery: payload.home_delivery,
            apply_discount: payload.apply_discount,
            custom_discounts: payload.custom_discounts,
        },
    };

    let result = order_assembler::place_order(
        &state.db,
        &state.config.pricing,
        state.address_resolver.as_ref(),
        state.gateway.as_ref(),
        state.invoices.as_ref(),
        &req,
    )
    .await;
    timer.observe_duration();

    match result {
        Ok(order) => {
            state.metrics.orders_placed.inc();
            state.metrics.payments_completed.inc();
            Ok(Json(order))
        }
        Err(err) => {
            match &err {
                CheckoutError::InsufficientStock { .. } => state.metrics.reservation_conflicts.inc(),
                CheckoutError::PaymentFailed { .. } => {
                    // The order row exists and is recoverable; only the payment failed.
                    state.metrics.orders_placed.inc();
                    state.metrics.payment_failures.inc();
                }
                _ => {}
            }
            Err(err.into())
        }
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let order = sqlx::query_as::<_, Order>(&select_sql)
        .bind(order_id)
        .fetch_optional(&state.db)
        .await
        .map_err(CheckoutError::from)?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;
    let items_sql = format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at"
    );
    let items = sqlx::query_as::<_, OrderItem>(&items_sql)
        .bind(order_id)
        .fetch_all(&state.db)
        .await
        .map_err(CheckoutError::from)?;
    Ok(Json(OrderWithItems { order, items }))
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = match query.user_id {
        Some(user_id) => {
            let sql = format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT 100"
            );
            sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(&state.db).await
        }
        None => {
            let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT 100");
            sqlx::query_as::<_, Order>(&sql).fetch_all(&state.db).await
        }
    }
    .map_err(CheckoutError::from)?;
    Ok(Json(orders))
}

async fn gather_lines(
    state: &AppState,
    user_id: Option<Uuid>,
    items: &[CartLinePayload],
) -> Result<Vec<CartLine>, CheckoutError> {
    if !items.is_empty() {
        for item in items {
            if item.quantity <= 0 {
                return Err(CheckoutError::InvalidQuantity(item.quantity));
            }
        }
        return Ok(items.iter().map(|i| CartLine::guest(i.stock_id, i.quantity)).collect());
    }
    match user_id {
        Some(user_id) => cart::load_user_cart(&state.db, user_id).await,
        None => Ok(Vec::new()),
    }
}
