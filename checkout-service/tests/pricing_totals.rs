use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;
use uuid::Uuid;

use checkout_service::config::PricingConfig;
use checkout_service::discounts;
use checkout_service::model::{Channel, DiscountRule, Stock};
use checkout_service::pricing::{cart_totals, price_lines, resolve_shipping, LineInput, ShippingContext};

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn stock(web_price: &str, web_discount: &str, pos_price: &str, pos_discount: &str) -> Stock {
    Stock {
        id: Uuid::new_v4(),
        sku: "SKU-TEST".into(),
        product_name: "Widget".into(),
        category_name: Some("Widgets".into()),
        brand_name: Some("Acme".into()),
        quantity: 100,
        reserved_quantity: 0,
        web_price: dec(web_price),
        pos_price: dec(pos_price),
        web_discount: dec(web_discount),
        pos_discount: dec(pos_discount),
        cost: dec("1.00"),
        alert_quantity: 0,
    }
}

fn rule(stock_id: Uuid, min_quantity: i32, discount: &str) -> DiscountRule {
    DiscountRule { id: Uuid::new_v4(), stock_id, min_quantity, discount: dec(discount) }
}

#[test]
fn tier_resolution_picks_highest_qualifying_rule() {
    let stock_id = Uuid::new_v4();
    let rules = vec![rule(stock_id, 5, "2"), rule(stock_id, 10, "5")];
    assert_eq!(discounts::best_tier(&rules, 7), dec("2"));
    assert_eq!(discounts::best_tier(&rules, 12), dec("5"));
    assert_eq!(discounts::best_tier(&rules, 3), dec("0"));
}

#[test]
fn web_pricing_with_flat_discount_and_tax() {
    // web_price=100, web_discount=10, qty 3:
    // pre-discount 300, discount 30, subtotal 270, tax 8% = 21.60, total 291.60
    let s = stock("100", "10", "100", "0");
    let cart = price_lines(
        &[LineInput { stock: &s, quantity: 3, tier_discount: BigDecimal::zero(), custom_discount: None }],
        Channel::Web,
        true,
    )
    .unwrap();
    assert_eq!(cart.gross_subtotal, dec("300"));
    assert_eq!(cart.total_discount, dec("30.00"));
    assert_eq!(cart.subtotal, dec("270.00"));

    let totals = cart_totals(&cart, &dec("0.08"), BigDecimal::zero());
    assert_eq!(totals.tax, dec("21.60"));
    assert_eq!(totals.total, dec("291.60"));
}

#[test]
fn saved_amount_is_the_gap_between_both_pricing_paths() {
    let s = stock("100", "10", "100", "0");
    let line = |stock| LineInput { stock, quantity: 3, tier_discount: dec("2"), custom_discount: Some(dec("6")) };

    let discounted = price_lines(&[line(&s)], Channel::Web, true).unwrap();
    let undiscounted = price_lines(&[line(&s)], Channel::Web, false).unwrap();

    // 10 flat + 2 tier + 6/3 custom = 14 per unit
    assert_eq!(discounted.lines[0].unit_discount, dec("14.00"));
    assert_eq!(undiscounted.subtotal, dec("300"));
    assert_eq!(&undiscounted.subtotal - &discounted.subtotal, discounted.total_discount);
}

#[test]
fn pos_orders_price_with_pos_fields_throughout() {
    let s = stock("100", "10", "80", "4");
    let cart = price_lines(
        &[LineInput { stock: &s, quantity: 2, tier_discount: BigDecimal::zero(), custom_discount: None }],
        Channel::Pos,
        true,
    )
    .unwrap();
    // POS lines never borrow the web price or web discount
    assert_eq!(cart.lines[0].unit_price, dec("80"));
    assert_eq!(cart.lines[0].unit_discount, dec("4.00"));
    assert_eq!(cart.subtotal, dec("152.00"));

    let config = PricingConfig::default();
    let totals = cart_totals(&cart, Channel::Pos.tax_rate(&config), BigDecimal::zero());
    // pos commerce rate 10%
    assert_eq!(totals.tax, dec("15.20"));
    assert_eq!(totals.total, dec("167.20"));
}

#[test]
fn channel_tax_rates_come_from_configuration() {
    let config = PricingConfig::default();
    assert_eq!(Channel::Web.tax_rate(&config), &dec("0.08"));
    assert_eq!(Channel::Pos.tax_rate(&config), &dec("0.10"));
}

#[test]
fn shipping_cost_feeds_the_grand_total() {
    let s = stock("100", "0", "100", "0");
    let cart = price_lines(
        &[LineInput { stock: &s, quantity: 1, tier_discount: BigDecimal::zero(), custom_discount: None }],
        Channel::Web,
        true,
    )
    .unwrap();
    let ctx = ShippingContext { prefecture_fee: Some(dec("8.00")), ..Default::default() };
    let shipping = resolve_shipping(Channel::Web, &ctx, &dec("5.00"));
    let totals = cart_totals(&cart, &dec("0.08"), shipping);
    assert_eq!(totals.shipping_cost, dec("8.00"));
    assert_eq!(totals.total, dec("116.00"));
}

#[test]
fn cod_surcharge_stacks_on_the_base_shipping_fee() {
    let ctx = ShippingContext {
        prefecture_fee: Some(dec("8.00")),
        cash_on_delivery: true,
        ..Default::default()
    };
    assert_eq!(resolve_shipping(Channel::Web, &ctx, &dec("5.00")), dec("13.00"));

    // POS with an explicit override and COD
    let ctx = ShippingContext {
        override_cost: Some(dec("2.50")),
        cash_on_delivery: true,
        ..Default::default()
    };
    assert_eq!(resolve_shipping(Channel::Pos, &ctx, &dec("5.00")), dec("7.50"));
}

#[test]
fn rounding_happens_once_at_the_tax_step() {
    // 3 units at 9.99 with a 0.33 discount: subtotal 28.98, 8% tax 2.3184 -> 2.32
    let s = stock("9.99", "0.33", "9.99", "0");
    let cart = price_lines(
        &[LineInput { stock: &s, quantity: 3, tier_discount: BigDecimal::zero(), custom_discount: None }],
        Channel::Web,
        true,
    )
    .unwrap();
    assert_eq!(cart.subtotal, dec("28.98"));
    let totals = cart_totals(&cart, &dec("0.08"), BigDecimal::zero());
    assert_eq!(totals.tax, dec("2.32"));
    assert_eq!(totals.total, dec("31.30"));
}
