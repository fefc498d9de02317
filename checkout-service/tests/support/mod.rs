#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use checkout_service::address::RawAddress;
use checkout_service::cart::CartLine;
use checkout_service::gateway::CustomerIdentity;
use checkout_service::model::{Channel, PaymentMethod};
use checkout_service::order_assembler::{CheckoutRequest, PaymentMeta};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS stocks (
      id UUID PRIMARY KEY,
      sku TEXT NOT NULL,
      product_name TEXT NOT NULL,
      category_name TEXT NULL,
      brand_name TEXT NULL,
      quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
      reserved_quantity INTEGER NOT NULL DEFAULT 0 CHECK (reserved_quantity >= 0),
      web_price NUMERIC NOT NULL DEFAULT 0,
      pos_price NUMERIC NOT NULL DEFAULT 0,
      web_discount NUMERIC NOT NULL DEFAULT 0,
      pos_discount NUMERIC NOT NULL DEFAULT 0,
      cost NUMERIC NOT NULL DEFAULT 0,
      alert_quantity INTEGER NOT NULL DEFAULT 0,
      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
      CHECK (reserved_quantity <= quantity)
    )",
    "CREATE TABLE IF NOT EXISTS discount_rules (
      id UUID PRIMARY KEY,
      stock_id UUID NOT NULL REFERENCES stocks(id) ON DELETE CASCADE,
      min_quantity INTEGER NOT NULL CHECK (min_quantity >= 1),
      discount NUMERIC NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS cart_lines (
      id UUID PRIMARY KEY,
      user_id UUID NOT NULL,
      stock_id UUID NOT NULL REFERENCES stocks(id) ON DELETE CASCADE,
      quantity INTEGER NOT NULL CHECK (quantity > 0),
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
      UNIQUE (user_id, stock_id)
    )",
    "CREATE TABLE IF NOT EXISTS orders (
      id UUID PRIMARY KEY,
      user_id UUID NULL,
      channel TEXT NOT NULL,
      order_status TEXT NOT NULL,
      payment_status TEXT NOT NULL,
      payment_method TEXT NOT NULL,
      currency TEXT NOT NULL,
      subtotal NUMERIC NOT NULL DEFAULT 0,
      total_discount NUMERIC NOT NULL DEFAULT 0,
      tax NUMERIC NOT NULL DEFAULT 0,
      shipping_cost NUMERIC NOT NULL DEFAULT 0,
      total NUMERIC NOT NULL DEFAULT 0,
      paid_amount NUMERIC NOT NULL DEFAULT 0,
      due_payment_amount NUMERIC NOT NULL DEFAULT 0,
      due_date TIMESTAMPTZ NULL,
      gateway_reference TEXT NULL,
      shipping_region_id UUID NULL,
      shipping_prefecture_id UUID NULL,
      shipping_address TEXT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
      id UUID PRIMARY KEY,
      order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
      stock_id UUID NOT NULL REFERENCES stocks(id) ON DELETE RESTRICT,
      product_name TEXT NOT NULL,
      category_name TEXT NULL,
      brand_name TEXT NULL,
      unit_price NUMERIC NOT NULL,
      unit_discount NUMERIC NOT NULL DEFAULT 0,
      unit_quantity INTEGER NOT NULL CHECK (unit_quantity > 0),
      line_total NUMERIC NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
      UNIQUE (order_id, stock_id)
    )",
    "CREATE TABLE IF NOT EXISTS return_log (
      id UUID PRIMARY KEY,
      order_id UUID NOT NULL REFERENCES orders(id),
      stock_id UUID NOT NULL,
      quantity INTEGER NOT NULL CHECK (quantity > 0),
      reason TEXT NOT NULL,
      actor TEXT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
];

pub async fn start_test_db(test: &str) -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP {test}: TEST_DATABASE_URL not set");
            return None;
        }
    };
    match PgPool::connect(&url).await {
        Ok(pool) => {
            run_migrations(&pool).await;
            Some(pool)
        }
        Err(err) => {
            eprintln!("SKIP {test}: cannot connect: {err}");
            None
        }
    }
}

async fn run_migrations(pool: &PgPool) {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await.expect("schema statement");
    }
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub struct StockSeed {
    pub quantity: i32,
    pub reserved: i32,
    pub web_price: &'static str,
    pub web_discount: &'static str,
    pub pos_price: &'static str,
    pub pos_discount: &'static str,
    pub alert_quantity: i32,
}

impl Default for StockSeed {
    fn default() -> Self {
        Self {
            quantity: 10,
            reserved: 0,
            web_price: "100",
            web_discount: "0",
            pos_price: "100",
            pos_discount: "0",
            alert_quantity: 0,
        }
    }
}

pub async fn seed_stock(pool: &PgPool, seed: StockSeed) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO stocks (id, sku, product_name, category_name, quantity, reserved_quantity, \
         web_price, pos_price, web_discount, pos_discount, cost, alert_quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(id)
    .bind(format!("SKU-{}", &id.to_string()[..8]))
    .bind("Widget")
    .bind("Widgets")
    .bind(seed.quantity)
    .bind(seed.reserved)
    .bind(dec(seed.web_price))
    .bind(dec(seed.pos_price))
    .bind(dec(seed.web_discount))
    .bind(dec(seed.pos_discount))
    .bind(dec("1.00"))
    .bind(seed.alert_quantity)
    .execute(pool)
    .await
    .expect("seed stock");
    id
}

pub async fn seed_discount_rule(pool: &PgPool, stock_id: Uuid, min_quantity: i32, discount: &str) {
    sqlx::query("INSERT INTO discount_rules (id, stock_id, min_quantity, discount) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(stock_id)
        .bind(min_quantity)
        .bind(dec(discount))
        .execute(pool)
        .await
        .expect("seed discount rule");
}

pub async fn stock_quantities(pool: &PgPool, stock_id: Uuid) -> (i32, i32) {
    let row: (i32, i32) = sqlx::query_as("SELECT quantity, reserved_quantity FROM stocks WHERE id = $1")
        .bind(stock_id)
        .fetch_one(pool)
        .await
        .expect("stock row");
    row
}

pub fn payment_meta(method: PaymentMethod) -> PaymentMeta {
    PaymentMeta {
        method,
        due_date: None,
        shipping_cost_override: None,
        home_delivery: false,
        apply_discount: true,
        custom_discounts: HashMap::new(),
    }
}

pub fn test_address() -> RawAddress {
    RawAddress {
        postal_code: Some("100-0001".into()),
        line1: Some("1-1 Chiyoda".into()),
        ..Default::default()
    }
}

/// A web-channel checkout request with a passthrough-valid address.
pub fn web_request(lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        user_id: None,
        channel: Channel::Web,
        lines,
        address: Some(test_address()),
        customer: CustomerIdentity::default(),
        payment: payment_meta(PaymentMethod::Card),
    }
}

pub fn pos_request(lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        user_id: None,
        channel: Channel::Pos,
        lines,
        address: None,
        customer: CustomerIdentity::default(),
        payment: payment_meta(PaymentMethod::Cash),
    }
}
