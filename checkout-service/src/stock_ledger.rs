//! Quantity/reservation bookkeeping for a single stock row.
//!
//! Every mutation is one conditional `UPDATE ... WHERE <guard> RETURNING`
//! so that concurrent checkouts against the same stock serialize on the row
//! write lock instead of racing a read-then-write pair. A missed update is
//! classified afterwards into "row absent" vs "guard failed".

use serde::Deserialize;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::model::{Stock, STOCK_COLUMNS};

pub(crate) const RESERVE_SQL: &str =
    "UPDATE stocks SET reserved_quantity = reserved_quantity + $2, updated_at = NOW() \
     WHERE id = $1 AND reserved_quantity + $2 <= quantity \
     RETURNING quantity, reserved_quantity";

const RELEASE_SQL: &str =
    "UPDATE stocks SET reserved_quantity = reserved_quantity - $2, updated_at = NOW() \
     WHERE id = $1 AND reserved_quantity >= $2 \
     RETURNING quantity, reserved_quantity";

const CONSUME_SQL: &str =
    "UPDATE stocks SET quantity = quantity - $2, reserved_quantity = reserved_quantity - $2, updated_at = NOW() \
     WHERE id = $1 AND reserved_quantity >= $2 \
     RETURNING quantity, reserved_quantity, alert_quantity";

const RESTOCK_SQL: &str =
    "UPDATE stocks SET quantity = quantity + $2, updated_at = NOW() \
     WHERE id = $1 \
     RETURNING quantity, reserved_quantity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    Add,
    Subtract,
    Replace,
}

fn ensure_non_negative(quantity: i32) -> Result<(), CheckoutError> {
    if quantity < 0 {
        return Err(CheckoutError::InvalidQuantity(quantity));
    }
    Ok(())
}

pub async fn load(conn: &mut PgConnection, stock_id: Uuid) -> Result<Stock, CheckoutError> {
    let sql = format!("SELECT {STOCK_COLUMNS} FROM stocks WHERE id = $1");
    sqlx::query_as::<_, Stock>(&sql)
        .bind(stock_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CheckoutError::StockNotFound(stock_id))
}

/// Hold `quantity` units against unconfirmed orders. Never pushes the
/// reservation past the owned quantity.
pub async fn reserve(conn: &mut PgConnection, stock_id: Uuid, quantity: i32) -> Result<(), CheckoutError> {
    ensure_non_negative(quantity)?;
    let row = sqlx::query(RESERVE_SQL)
        .bind(stock_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            tracing::debug!(
                stock_id = %stock_id,
                quantity,
                total = row.get::<i32, _>("quantity"),
                reserved = row.get::<i32, _>("reserved_quantity"),
                "stock reserved"
            );
            Ok(())
        }
        None => Err(insufficient_stock(conn, stock_id, quantity).await?),
    }
}

/// Drop a hold taken by an aborted or voided checkout.
pub async fn release(conn: &mut PgConnection, stock_id: Uuid, quantity: i32) -> Result<(), CheckoutError> {
    ensure_non_negative(quantity)?;
    let row = sqlx::query(RELEASE_SQL)
        .bind(stock_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            tracing::debug!(
                stock_id = %stock_id,
                quantity,
                reserved = row.get::<i32, _>("reserved_quantity"),
                "reservation released"
            );
            Ok(())
        }
        None => Err(insufficient_reserved(conn, stock_id, quantity).await?),
    }
}

/// Payment succeeded: the physical unit leaves inventory and the hold is
/// dropped in the same statement.
pub async fn consume(conn: &mut PgConnection, stock_id: Uuid, quantity: i32) -> Result<(), CheckoutError> {
    ensure_non_negative(quantity)?;
    let row = sqlx::query(CONSUME_SQL)
        .bind(stock_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let remaining: i32 = row.get("quantity");
            let alert_quantity: i32 = row.get("alert_quantity");
            let reserved: i32 = row.get("reserved_quantity");
            if remaining - reserved <= alert_quantity {
                tracing::warn!(stock_id = %stock_id, remaining, reserved, alert_quantity, "stock at or below alert threshold");
            }
            tracing::debug!(stock_id = %stock_id, quantity, remaining, reserved, "stock consumed");
            Ok(())
        }
        None => Err(insufficient_reserved(conn, stock_id, quantity).await?),
    }
}

/// Returned units re-enter inventory; no upper bound.
pub async fn restock(conn: &mut PgConnection, stock_id: Uuid, quantity: i32) -> Result<(), CheckoutError> {
    ensure_non_negative(quantity)?;
    let row = sqlx::query(RESTOCK_SQL)
        .bind(stock_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            tracing::debug!(
                stock_id = %stock_id,
                quantity,
                total = row.get::<i32, _>("quantity"),
                "stock restocked"
            );
            Ok(())
        }
        None => Err(CheckoutError::StockNotFound(stock_id)),
    }
}

/// Administrative quantity edit. `Subtract` and `Replace` refuse to push the
/// owned quantity below the reserved quantity.
pub async fn adjust_quantity(
    conn: &mut PgConnection,
    stock_id: Uuid,
    quantity: i32,
    mode: AdjustMode,
) -> Result<Stock, CheckoutError> {
    ensure_non_negative(quantity)?;
    let sql = match mode {
        AdjustMode::Add => format!(
            "UPDATE stocks SET quantity = quantity + $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {STOCK_COLUMNS}"
        ),
        AdjustMode::Subtract => format!(
            "UPDATE stocks SET quantity = quantity - $2, updated_at = NOW() \
             WHERE id = $1 AND quantity - $2 >= reserved_quantity RETURNING {STOCK_COLUMNS}"
        ),
        AdjustMode::Replace => format!(
            "UPDATE stocks SET quantity = $2, updated_at = NOW() \
             WHERE id = $1 AND $2 >= reserved_quantity RETURNING {STOCK_COLUMNS}"
        ),
    };
    let updated = sqlx::query_as::<_, Stock>(&sql)
        .bind(stock_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
    match updated {
        Some(stock) => {
            tracing::info!(stock_id = %stock_id, quantity = stock.quantity, reserved = stock.reserved_quantity, mode = ?mode, "stock quantity adjusted");
            Ok(stock)
        }
        None => {
            let current = sqlx::query("SELECT reserved_quantity FROM stocks WHERE id = $1")
                .bind(stock_id)
                .fetch_optional(&mut *conn)
                .await?;
            match current {
                Some(row) => Err(CheckoutError::ReservationExceedsStock {
                    stock_id,
                    reserved: row.get("reserved_quantity"),
                }),
                None => Err(CheckoutError::StockNotFound(stock_id)),
            }
        }
    }
}

async fn insufficient_stock(
    conn: &mut PgConnection,
    stock_id: Uuid,
    requested: i32,
) -> Result<CheckoutError, CheckoutError> {
    let row = sqlx::query("SELECT quantity, reserved_quantity FROM stocks WHERE id = $1")
        .bind(stock_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match row {
        Some(row) => CheckoutError::InsufficientStock {
            stock_id,
            requested,
            available: row.get::<i32, _>("quantity") - row.get::<i32, _>("reserved_quantity"),
        },
        None => CheckoutError::StockNotFound(stock_id),
    })
}

async fn insufficient_reserved(
    conn: &mut PgConnection,
    stock_id: Uuid,
    requested: i32,
) -> Result<CheckoutError, CheckoutError> {
    let row = sqlx::query("SELECT reserved_quantity FROM stocks WHERE id = $1")
        .bind(stock_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match row {
        Some(row) => CheckoutError::InsufficientReservedStock {
            stock_id,
            requested,
            reserved: row.get("reserved_quantity"),
        },
        None => CheckoutError::StockNotFound(stock_id),
    })
}
