use bigdecimal::{BigDecimal, Zero};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::model::DiscountRule;

/// Pick the rule with the largest `min_quantity` that still qualifies for the
/// requested quantity. Tiers do not stack with each other.
pub fn best_tier(rules: &[DiscountRule], quantity: i32) -> BigDecimal {
    rules
        .iter()
        .filter(|rule| rule.min_quantity <= quantity)
        .max_by_key(|rule| rule.min_quantity)
        .map(|rule| rule.discount.clone())
        .unwrap_or_else(BigDecimal::zero)
}

/// Per-unit tier discount for a stock/quantity pair, 0 when no tier qualifies.
pub async fn resolve(
    conn: &mut PgConnection,
    stock_id: Uuid,
    quantity: i32,
) -> Result<BigDecimal, CheckoutError> {
    let discount = sqlx::query_scalar::<_, BigDecimal>(
        "SELECT discount FROM discount_rules \
         WHERE stock_id = $1 AND min_quantity <= $2 \
         ORDER BY min_quantity DESC LIMIT 1",
    )
    .bind(stock_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(discount.unwrap_or_else(BigDecimal::zero))
}
