use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CheckoutError;

/// Sales context selecting which price/discount fields and tax rate apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Pos,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Web => "web",
            Channel::Pos => "pos",
        }
    }

    pub fn parse(s: &str) -> Option<Channel> {
        match s {
            "web" => Some(Channel::Web),
            "pos" => Some(Channel::Pos),
            _ => None,
        }
    }

    pub fn unit_price<'a>(&self, stock: &'a Stock) -> &'a BigDecimal {
        match self {
            Channel::Web => &stock.web_price,
            Channel::Pos => &stock.pos_price,
        }
    }

    pub fn flat_discount<'a>(&self, stock: &'a Stock) -> &'a BigDecimal {
        match self {
            Channel::Web => &stock.web_discount,
            Channel::Pos => &stock.pos_discount,
        }
    }

    pub fn initial_status(&self) -> OrderStatus {
        match self {
            Channel::Web => OrderStatus::Pending,
            Channel::Pos => OrderStatus::Pos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Pos,
    Completed,
    Voided,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Pos => "pos",
            OrderStatus::Completed => "completed",
            OrderStatus::Voided => "voided",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "pos" => Some(OrderStatus::Pos),
            "completed" => Some(OrderStatus::Completed),
            "voided" => Some(OrderStatus::Voided),
            "returned" => Some(OrderStatus::Returned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Valid payment transitions:
/// pending -> paid | failed
/// failed -> paid (operator retry / late gateway confirmation)
/// paid is terminal.
pub fn is_valid_payment_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    match from {
        PaymentStatus::Pending => matches!(to, PaymentStatus::Paid | PaymentStatus::Failed),
        PaymentStatus::Failed => matches!(to, PaymentStatus::Paid),
        PaymentStatus::Paid => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    CashOnDelivery,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentMethod> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "cash" => Some(PaymentMethod::Cash),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery)
    }
}

/// A purchasable variant with its own prices, discounts and quantities.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Stock {
    pub id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub web_price: BigDecimal,
    pub pos_price: BigDecimal,
    pub web_discount: BigDecimal,
    pub pos_discount: BigDecimal,
    pub cost: BigDecimal,
    pub alert_quantity: i32,
}

impl Stock {
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }

    pub fn low_stock(&self) -> bool {
        self.available() <= self.alert_quantity
    }
}

pub const STOCK_COLUMNS: &str = "id, sku, product_name, category_name, brand_name, quantity, \
     reserved_quantity, web_price, pos_price, web_discount, pos_discount, cost, alert_quantity";

/// Quantity-tiered discount rule; the largest qualifying `min_quantity` wins.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DiscountRule {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub min_quantity: i32,
    pub discount: BigDecimal,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub channel: String,
    pub order_status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub currency: String,
    pub subtotal: BigDecimal,
    pub total_discount: BigDecimal,
    pub tax: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total: BigDecimal,
    pub paid_amount: BigDecimal,
    pub due_payment_amount: BigDecimal,
    pub due_date: Option<DateTime<Utc>>,
    pub gateway_reference: Option<String>,
    pub shipping_region_id: Option<Uuid>,
    pub shipping_prefecture_id: Option<Uuid>,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn channel(&self) -> Result<Channel, CheckoutError> {
        Channel::parse(&self.channel)
            .ok_or_else(|| CheckoutError::Invariant(format!("order {} has unrecognised channel `{}`", self.id, self.channel)))
    }

    pub fn payment_status(&self) -> Result<PaymentStatus, CheckoutError> {
        PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| CheckoutError::Invariant(format!("order {} has unrecognised payment status `{}`", self.id, self.payment_status)))
    }

    pub fn is_voided(&self) -> bool {
        self.order_status == OrderStatus::Voided.as_str()
    }
}

pub const ORDER_COLUMNS: &str = "id, user_id, channel, order_status, payment_status, payment_method, \
     currency, subtotal, total_discount, tax, shipping_cost, total, paid_amount, due_payment_amount, \
     due_date, gateway_reference, shipping_region_id, shipping_prefecture_id, shipping_address, \
     created_at, updated_at";

/// One order line; product identity is snapshotted at order time so later
/// catalog edits do not alter historical orders.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_id: Uuid,
    pub product_name: String,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub unit_price: BigDecimal,
    pub unit_discount: BigDecimal,
    pub unit_quantity: i32,
    pub line_total: BigDecimal,
}

pub const ORDER_ITEM_COLUMNS: &str = "id, order_id, stock_id, product_name, category_name, \
     brand_name, unit_price, unit_discount, unit_quantity, line_total";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ReturnLogEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}
