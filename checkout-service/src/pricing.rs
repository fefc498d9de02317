//! Channel-parameterized cart pricing.
//!
//! Totals are explicit return values of pure functions; nothing here touches
//! the database or holds accumulator state between calls. `total_discount` is
//! always derived as `gross subtotal - discounted subtotal` so the two paths
//! cannot drift apart through per-line rounding.

use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use uuid::Uuid;

use common_money::round_half_up;

use crate::config::PricingConfig;
use crate::error::CheckoutError;
use crate::model::{Channel, Stock};

/// One cart line ready for pricing: the stock snapshot, the requested
/// quantity, the resolved tier discount and any caller-supplied custom
/// discount (an order-level amount spread across the line's units).
pub struct LineInput<'a> {
    pub stock: &'a Stock,
    pub quantity: i32,
    pub tier_discount: BigDecimal,
    pub custom_discount: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    pub stock_id: Uuid,
    pub product_name: String,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub unit_discount: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    /// Subtotal before any deduction.
    pub gross_subtotal: BigDecimal,
    /// Subtotal after per-unit discounts; the figure tax applies to.
    pub subtotal: BigDecimal,
    pub total_discount: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartTotals {
    pub subtotal: BigDecimal,
    pub total_discount: BigDecimal,
    pub tax: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total: BigDecimal,
}

impl Channel {
    pub fn tax_rate<'a>(&self, config: &'a PricingConfig) -> &'a BigDecimal {
        match self {
            Channel::Web => &config.tax_rate_web,
            Channel::Pos => &config.tax_rate_pos,
        }
    }
}

/// Price a set of cart lines for a channel.
///
/// With `apply_discount` the effective per-unit discount is the channel's flat
/// discount plus the tier discount plus the custom discount divided across the
/// line's units, normalized to cents before it is multiplied back out so the
/// stored `line_total = (unit_price - unit_discount) * quantity` identity
/// holds exactly. Without it, lines are priced at the bare unit price, which
/// is how the pre-discount figure behind `saved_amount` is produced.
pub fn price_lines(
    lines: &[LineInput<'_>],
    channel: Channel,
    apply_discount: bool,
) -> Result<PricedCart, CheckoutError> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut gross_subtotal = BigDecimal::zero();
    let mut subtotal = BigDecimal::zero();

    for line in lines {
        if line.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity(line.quantity));
        }
        let quantity = BigDecimal::from(line.quantity);
        let unit_price = channel.unit_price(line.stock).clone();

        let unit_discount = if apply_discount {
            let mut discount = channel.flat_discount(line.stock) + &line.tier_discount;
            if let Some(custom) = &line.custom_discount {
                discount += custom / &quantity;
            }
            let discount = round_half_up(&discount);
            // A discount past the unit price would price the line negative.
            if discount > unit_price {
                unit_price.clone()
            } else {
                discount
            }
        } else {
            BigDecimal::zero()
        };

        let line_total = (&unit_price - &unit_discount) * &quantity;
        gross_subtotal += &unit_price * &quantity;
        subtotal += &line_total;

        tracing::debug!(
            stock_id = %line.stock.id,
            channel = channel.as_str(),
            quantity = line.quantity,
            unit_price = %unit_price,
            unit_discount = %unit_discount,
            line_total = %line_total,
            "line priced"
        );

        priced.push(PricedLine {
            stock_id: line.stock.id,
            product_name: line.stock.product_name.clone(),
            category_name: line.stock.category_name.clone(),
            brand_name: line.stock.brand_name.clone(),
            quantity: line.quantity,
            unit_price,
            unit_discount,
            line_total,
        });
    }

    let total_discount = &gross_subtotal - &subtotal;
    Ok(PricedCart { lines: priced, gross_subtotal, subtotal, total_discount })
}

/// Tax on the discounted subtotal (half-up to cents), then the grand total.
pub fn cart_totals(cart: &PricedCart, tax_rate: &BigDecimal, shipping_cost: BigDecimal) -> CartTotals {
    let tax = round_half_up(&(&cart.subtotal * tax_rate));
    let total = &cart.subtotal + &tax + &shipping_cost;
    tracing::debug!(
        subtotal = %cart.subtotal,
        total_discount = %cart.total_discount,
        tax = %tax,
        shipping = %shipping_cost,
        total = %total,
        "cart totals computed"
    );
    CartTotals {
        subtotal: cart.subtotal.clone(),
        total_discount: cart.total_discount.clone(),
        tax,
        shipping_cost,
        total,
    }
}

/// Inputs for the shipping decision, gathered by the caller from the resolved
/// address and the request itself.
#[derive(Debug, Clone, Default)]
pub struct ShippingContext {
    pub prefecture_fee: Option<BigDecimal>,
    pub home_delivery: bool,
    pub override_cost: Option<BigDecimal>,
    pub cash_on_delivery: bool,
}

/// Shipping rules: an explicit override wins; otherwise web orders pay the
/// destination prefecture's fee unless flagged for home delivery, and POS
/// orders ship nothing. Cash on delivery adds the configured surcharge on top.
pub fn resolve_shipping(channel: Channel, ctx: &ShippingContext, cod_surcharge: &BigDecimal) -> BigDecimal {
    let base = match &ctx.override_cost {
        Some(cost) => cost.clone(),
        None => match channel {
            Channel::Web => {
                if ctx.home_delivery {
                    BigDecimal::zero()
                } else {
                    ctx.prefecture_fee.clone().unwrap_or_else(BigDecimal::zero)
                }
            }
            Channel::Pos => BigDecimal::zero(),
        },
    };
    if ctx.cash_on_delivery {
        base + cod_surcharge
    } else {
        base
    }
}
