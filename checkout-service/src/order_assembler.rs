//! Converts a cart into a persisted order inside one transaction: snapshot
//! stocks, reserve every line, price, insert the order and its items, clear
//! the persisted cart. Any failure rolls the whole transaction back, so no
//! partial reservation can survive an aborted checkout.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::address::{AddressOutcome, AddressResolver, RawAddress, ResolvedAddress};
use crate::cart::{self, CartLine};
use crate::config::PricingConfig;
use crate::discounts;
use crate::error::CheckoutError;
use crate::gateway::{CustomerIdentity, GatewayStatus, PaymentGateway};
use crate::invoice::InvoiceService;
use crate::model::{Channel, Order, OrderStatus, PaymentMethod, PaymentStatus, Stock, ORDER_COLUMNS};
use crate::payment_completion;
use crate::pricing::{self, LineInput, ShippingContext};
use crate::stock_ledger;

#[derive(Debug, Clone)]
pub struct PaymentMeta {
    pub method: PaymentMethod,
    pub due_date: Option<DateTime<Utc>>,
    pub shipping_cost_override: Option<BigDecimal>,
    pub home_delivery: bool,
    pub apply_discount: bool,
    /// Order-level extra discount per stock, spread across that line's units.
    pub custom_discounts: HashMap<Uuid, BigDecimal>,
}

pub struct CheckoutRequest {
    pub user_id: Option<Uuid>,
    pub channel: Channel,
    pub lines: Vec<CartLine>,
    pub address: Option<RawAddress>,
    pub customer: CustomerIdentity,
    pub payment: PaymentMeta,
}

/// Steps 1-6 of order placement: everything up to, and including, the commit
/// of the order row with its stock reservations. The payment gateway is not
/// involved yet.
pub async fn assemble(
    db: &PgPool,
    config: &PricingConfig,
    address_resolver: &dyn AddressResolver,
    req: &CheckoutRequest,
) -> Result<Order, CheckoutError> {
    let lines = cart::merge_lines(req.lines.clone());
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if let Some(due) = req.payment.due_date {
        if due <= Utc::now() {
            return Err(CheckoutError::InvalidDueDate);
        }
    }
    let address = resolve_address(req, address_resolver).await?;

    let mut tx = db.begin().await?;

    // Snapshot, tier-resolve and reserve every line before pricing. A failed
    // reservation aborts here and the transaction rollback drops the holds
    // already taken in this loop.
    let mut snapshots: Vec<(Stock, i32, BigDecimal, Option<BigDecimal>)> = Vec::with_capacity(lines.len());
    for line in &lines {
        let stock = stock_ledger::load(&mut tx, line.stock_id).await?;
        let tier_discount = if req.payment.apply_discount {
            discounts::resolve(&mut tx, line.stock_id, line.quantity).await?
        } else {
            BigDecimal::zero()
        };
        stock_ledger::reserve(&mut tx, line.stock_id, line.quantity).await?;
        let custom_discount = req.payment.custom_discounts.get(&line.stock_id).cloned();
        snapshots.push((stock, line.quantity, tier_discount, custom_discount));
    }

    let inputs: Vec<LineInput<'_>> = snapshots
        .iter()
        .map(|(stock, quantity, tier_discount, custom_discount)| LineInput {
            stock,
            quantity: *quantity,
            tier_discount: tier_discount.clone(),
            custom_discount: custom_discount.clone(),
        })
        .collect();
    let priced = pricing::price_lines(&inputs, req.channel, req.payment.apply_discount)?;

    let shipping_ctx = ShippingContext {
        prefecture_fee: address.as_ref().and_then(|a| a.shipping_fee.clone()),
        home_delivery: req.payment.home_delivery,
        override_cost: req.payment.shipping_cost_override.clone(),
        cash_on_delivery: req.payment.method.is_cash_on_delivery(),
    };
    let shipping = pricing::resolve_shipping(req.channel, &shipping_ctx, &config.cod_surcharge);
    let totals = pricing::cart_totals(&priced, req.channel.tax_rate(config), shipping);

    let order_id = Uuid::new_v4();
    let insert_sql = format!(
        "INSERT INTO orders (id, user_id, channel, order_status, payment_status, payment_method, \
         currency, subtotal, total_discount, tax, shipping_cost, total, paid_amount, \
         due_payment_amount, due_date, shipping_region_id, shipping_prefecture_id, shipping_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
         RETURNING {ORDER_COLUMNS}"
    );
    let order = sqlx::query_as::<_, Order>(&insert_sql)
        .bind(order_id)
        .bind(req.user_id)
        .bind(req.channel.as_str())
        .bind(req.channel.initial_status().as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(req.payment.method.as_str())
        .bind(&config.currency)
        .bind(&totals.subtotal)
        .bind(&totals.total_discount)
        .bind(&totals.tax)
        .bind(&totals.shipping_cost)
        .bind(&totals.total)
        .bind(BigDecimal::zero())
        .bind(&totals.total)
        .bind(req.payment.due_date)
        .bind(address.as_ref().and_then(|a| a.region_id))
        .bind(address.as_ref().and_then(|a| a.prefecture_id))
        .bind(address.as_ref().map(|a| a.formatted.clone()))
        .fetch_one(&mut *tx)
        .await?;

    for line in &priced.lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, stock_id, product_name, category_name, \
             brand_name, unit_price, unit_discount, unit_quantity, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(line.stock_id)
        .bind(&line.product_name)
        .bind(&line.category_name)
        .bind(&line.brand_name)
        .bind(&line.unit_price)
        .bind(&line.unit_discount)
        .bind(line.quantity)
        .bind(&line.line_total)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(user_id) = req.user_id {
        cart::clear_user_cart(&mut tx, user_id).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        channel = %order.channel,
        lines = priced.lines.len(),
        subtotal = %order.subtotal,
        total_discount = %order.total_discount,
        tax = %order.tax,
        shipping = %order.shipping_cost,
        total = %order.total,
        "order assembled and stock reserved"
    );
    Ok(order)
}

/// Full placement: assemble, then hand the total to the payment gateway. On
/// success the order is completed and stock consumed; on failure the order is
/// marked failed and its reservations are deliberately kept for operator or
/// callback-driven recovery.
pub async fn place_order(
    db: &PgPool,
    config: &PricingConfig,
    address_resolver: &dyn AddressResolver,
    gateway: &dyn PaymentGateway,
    invoices: &dyn InvoiceService,
    req: &CheckoutRequest,
) -> Result<Order, CheckoutError> {
    let order = assemble(db, config, address_resolver, req).await?;
    let outcome = gateway
        .process_payment(order.id, &order.total, &order.currency, req.payment.method, &req.customer)
        .await;
    match outcome {
        Ok(result) if result.status == GatewayStatus::Success => {
            payment_completion::complete_payment(db, order.id, result.gateway_reference.as_deref(), invoices).await
        }
        Ok(result) => {
            payment_completion::fail_payment(db, order.id).await?;
            Err(CheckoutError::PaymentFailed {
                order_id: order.id,
                message: result.message.unwrap_or_else(|| "payment declined".to_string()),
            })
        }
        Err(err) => {
            payment_completion::fail_payment(db, order.id).await?;
            Err(CheckoutError::PaymentFailed { order_id: order.id, message: err.to_string() })
        }
    }
}

/// Operator-facing recovery for orders whose payment never completed: drop
/// every reservation the order still holds and mark it voided. Idempotent;
/// refuses to void a paid order.
pub async fn void_order(db: &PgPool, order_id: Uuid) -> Result<Order, CheckoutError> {
    let mut tx = db.begin().await?;
    let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let order = sqlx::query_as::<_, Order>(&select_sql)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    if order.payment_status()? == PaymentStatus::Paid {
        return Err(CheckoutError::OrderAlreadyPaid(order_id));
    }
    if order.is_voided() {
        tx.rollback().await?;
        return Ok(order);
    }

    let items = sqlx::query("SELECT stock_id, unit_quantity FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;
    for item in &items {
        stock_ledger::release(&mut tx, item.get("stock_id"), item.get("unit_quantity")).await?;
    }

    let update_sql = format!(
        "UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Order>(&update_sql)
        .bind(order_id)
        .bind(OrderStatus::Voided.as_str())
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(order_id = %order_id, released_lines = items.len(), "order voided; reservations released");
    Ok(updated)
}

async fn resolve_address(
    req: &CheckoutRequest,
    resolver: &dyn AddressResolver,
) -> Result<Option<ResolvedAddress>, CheckoutError> {
    match (&req.address, req.channel) {
        (Some(raw), _) => match resolver.resolve(raw).await.map_err(CheckoutError::Collaborator)? {
            AddressOutcome::Resolved(address) => Ok(Some(address)),
            AddressOutcome::Invalid(errors) => Err(CheckoutError::AddressValidationFailed(errors)),
        },
        // Walk-in sale; nothing ships.
        (None, Channel::Pos) => Ok(None),
        (None, Channel::Web) => {
            let mut errors = std::collections::BTreeMap::new();
            errors.insert("address".to_string(), "required for web orders".to_string());
            Err(CheckoutError::AddressValidationFailed(errors))
        }
    }
}
