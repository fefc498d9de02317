use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::CheckoutError;

/// One cart line, persisted or guest. Guest lines are synthesized per request
/// and never written; persisted lines carry their row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub stock_id: Uuid,
    pub quantity: i32,
}

impl CartLine {
    pub fn guest(stock_id: Uuid, quantity: i32) -> Self {
        Self { id: None, user_id: None, stock_id, quantity }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    stock_id: Uuid,
    quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine { id: Some(row.id), user_id: Some(row.user_id), stock_id: row.stock_id, quantity: row.quantity }
    }
}

/// Collapse duplicate stock lines into one, summing quantities. First-seen
/// order is preserved so pricing output is deterministic.
pub fn merge_lines(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|existing| existing.stock_id == line.stock_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line),
        }
    }
    merged
}

pub async fn load_user_cart(db: &PgPool, user_id: Uuid) -> Result<Vec<CartLine>, CheckoutError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT id, user_id, stock_id, quantity FROM cart_lines WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

/// Add a line to a persisted cart; adding the same stock again bumps the
/// existing line's quantity.
pub async fn add_to_cart(
    db: &PgPool,
    user_id: Uuid,
    stock_id: Uuid,
    quantity: i32,
) -> Result<CartLine, CheckoutError> {
    if quantity <= 0 {
        return Err(CheckoutError::InvalidQuantity(quantity));
    }
    let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM stocks WHERE id = $1")
        .bind(stock_id)
        .fetch_optional(db)
        .await?;
    if exists.is_none() {
        return Err(CheckoutError::StockNotFound(stock_id));
    }
    let row = sqlx::query_as::<_, CartLineRow>(
        "INSERT INTO cart_lines (id, user_id, stock_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, stock_id) DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity \
         RETURNING id, user_id, stock_id, quantity",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(stock_id)
    .bind(quantity)
    .fetch_one(db)
    .await?;
    Ok(row.into())
}

/// Drop every persisted line for the user; returns how many were removed.
pub async fn clear_user_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, CheckoutError> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_duplicate_stocks_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_lines(vec![
            CartLine::guest(a, 2),
            CartLine::guest(b, 1),
            CartLine::guest(a, 3),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].stock_id, a);
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].stock_id, b);
        assert_eq!(merged[1].quantity, 1);
    }

    #[test]
    fn guest_lines_have_no_persistence_identity() {
        let line = CartLine::guest(Uuid::new_v4(), 1);
        assert!(line.id.is_none());
        assert!(line.user_id.is_none());
    }
}
