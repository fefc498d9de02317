//! Partial or full reversal of a paid order's items.
//!
//! One transaction covers the restock, the item mutations, the append-only
//! return log and the order total recomputation; any failure rolls all of it
//! back together.

use bigdecimal::BigDecimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use common_money::round_half_up;

use crate::config::PricingConfig;
use crate::error::CheckoutError;
use crate::model::{
    Order, OrderItem, OrderStatus, PaymentStatus, ReturnLogEntry, ORDER_COLUMNS, ORDER_ITEM_COLUMNS,
};
use crate::stock_ledger;

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnItemRequest {
    pub stock_id: Uuid,
    pub quantity: i32,
}

/// The audit trail for an order, oldest entry first.
pub async fn list_returns(db: &PgPool, order_id: Uuid) -> Result<Vec<ReturnLogEntry>, CheckoutError> {
    let entries = sqlx::query_as::<_, ReturnLogEntry>(
        "SELECT id, order_id, stock_id, quantity, reason, actor, created_at \
         FROM return_log WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order_id)
    .fetch_all(db)
    .await?;
    Ok(entries)
}

pub async fn process_return(
    db: &PgPool,
    config: &PricingConfig,
    order_id: Uuid,
    items: &[ReturnItemRequest],
    reason: &str,
    actor: &str,
) -> Result<Order, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyReturn);
    }

    let mut tx = db.begin().await?;
    let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let order = sqlx::query_as::<_, Order>(&select_sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    if order.payment_status()? != PaymentStatus::Paid {
        return Err(CheckoutError::OrderNotPaid(order_id));
    }
    let channel = order.channel()?;

    let mut reduction_total = BigDecimal::from(0);
    for item in items {
        if item.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity(item.quantity));
        }

        let item_sql = format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 AND stock_id = $2 FOR UPDATE"
        );
        let line = sqlx::query_as::<_, OrderItem>(&item_sql)
            .bind(order_id)
            .bind(item.stock_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CheckoutError::OrderItemNotFound { order_id, stock_id: item.stock_id })?;

        if item.quantity > line.unit_quantity {
            return Err(CheckoutError::ExcessiveReturnQuantity {
                stock_id: item.stock_id,
                requested: item.quantity,
                ordered: line.unit_quantity,
            });
        }

        stock_ledger::restock(&mut tx, item.stock_id, item.quantity).await?;

        let net_unit = &line.unit_price - &line.unit_discount;
        let reduction = &net_unit * BigDecimal::from(item.quantity);
        let remaining = line.unit_quantity - item.quantity;
        if remaining == 0 {
            sqlx::query("DELETE FROM order_items WHERE id = $1")
                .bind(line.id)
                .execute(&mut *tx)
                .await?;
        } else {
            let new_line_total = &net_unit * BigDecimal::from(remaining);
            sqlx::query("UPDATE order_items SET unit_quantity = $2, line_total = $3 WHERE id = $1")
                .bind(line.id)
                .bind(remaining)
                .bind(&new_line_total)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO return_log (id, order_id, stock_id, quantity, reason, actor) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(item.stock_id)
        .bind(item.quantity)
        .bind(reason)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        tracing::info!(
            order_id = %order_id,
            stock_id = %item.stock_id,
            quantity = item.quantity,
            remaining,
            reduction = %reduction,
            "order line returned and restocked"
        );
        reduction_total += reduction;
    }

    let new_subtotal = &order.subtotal - &reduction_total;
    let new_tax = round_half_up(&(&new_subtotal * channel.tax_rate(config)));
    let new_total = &new_subtotal + &new_tax + &order.shipping_cost;

    let remaining_items = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&mut *tx)
    .await?;
    let new_status = if remaining_items == 0 {
        OrderStatus::Returned.as_str().to_string()
    } else {
        order.order_status.clone()
    };

    let update_sql = format!(
        "UPDATE orders SET subtotal = $2, tax = $3, total = $4, order_status = $5, \
         updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Order>(&update_sql)
        .bind(order_id)
        .bind(&new_subtotal)
        .bind(&new_tax)
        .bind(&new_total)
        .bind(&new_status)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        subtotal = %updated.subtotal,
        tax = %updated.tax,
        total = %updated.total,
        status = %updated.order_status,
        "return processed"
    );
    Ok(updated)
}
