//! Reaction to the payment gateway's verdict for an assembled order.
//!
//! Completion is idempotent: the order row is locked and its payment status
//! checked before any stock is consumed, so a re-delivered success signal is
//! a no-op rather than a second decrement.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::invoice::InvoiceService;
use crate::model::{
    is_valid_payment_transition, Order, OrderItem, OrderStatus, PaymentStatus, ORDER_COLUMNS,
    ORDER_ITEM_COLUMNS,
};
use crate::stock_ledger;

pub async fn complete_payment(
    db: &PgPool,
    order_id: Uuid,
    gateway_reference: Option<&str>,
    invoices: &dyn InvoiceService,
) -> Result<Order, CheckoutError> {
    let mut tx = db.begin().await?;
    let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let order = sqlx::query_as::<_, Order>(&select_sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    if order.payment_status()? == PaymentStatus::Paid {
        tracing::info!(order_id = %order_id, "payment already completed; ignoring duplicate signal");
        tx.rollback().await?;
        return Ok(order);
    }
    // A voided order no longer holds reservations to consume.
    if order.is_voided() {
        return Err(CheckoutError::OrderVoided(order_id));
    }

    let items_sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1");
    let items = sqlx::query_as::<_, OrderItem>(&items_sql)
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;
    for item in &items {
        stock_ledger::consume(&mut tx, item.stock_id, item.unit_quantity).await?;
    }

    let update_sql = format!(
        "UPDATE orders SET payment_status = $2, order_status = $3, paid_amount = total, \
         due_payment_amount = 0, gateway_reference = COALESCE($4, gateway_reference), \
         updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Order>(&update_sql)
        .bind(order_id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(OrderStatus::Completed.as_str())
        .bind(gateway_reference)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        lines = items.len(),
        paid_amount = %updated.paid_amount,
        "payment completed; reserved stock consumed"
    );

    // Invoicing is best-effort: the payment state above is already committed
    // and must not be rolled back by a delivery failure.
    if let Err(err) = deliver_invoice(invoices, order_id).await {
        tracing::warn!(order_id = %order_id, error = %err, "invoice delivery failed");
    }

    Ok(updated)
}

/// Record a gateway decline. The order stays recoverable (`failed` can still
/// transition to `paid`) and its reservations are kept; releasing them is the
/// operator's call via the void path.
pub async fn fail_payment(db: &PgPool, order_id: Uuid) -> Result<Order, CheckoutError> {
    let mut tx = db.begin().await?;
    let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let order = sqlx::query_as::<_, Order>(&select_sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    let status = order.payment_status()?;
    if status == PaymentStatus::Failed {
        tx.rollback().await?;
        return Ok(order);
    }
    if !is_valid_payment_transition(status, PaymentStatus::Failed) {
        return Err(CheckoutError::OrderAlreadyPaid(order_id));
    }

    let update_sql = format!(
        "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Order>(&update_sql)
        .bind(order_id)
        .bind(PaymentStatus::Failed.as_str())
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::warn!(order_id = %order_id, "payment failed; reservations retained for recovery");
    Ok(updated)
}

async fn deliver_invoice(invoices: &dyn InvoiceService, order_id: Uuid) -> anyhow::Result<()> {
    let invoice_id = invoices.make_invoice(order_id).await?;
    invoices.send_invoice(invoice_id).await
}
