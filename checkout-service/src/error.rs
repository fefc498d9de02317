use std::collections::BTreeMap;

use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

/// Per-request failures of the checkout pipeline. Nothing here is fatal to the
/// process; every variant maps onto an HTTP error with a stable code.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("quantity must be non-negative (got {0})")]
    InvalidQuantity(i32),
    #[error("insufficient stock for {stock_id} (requested {requested}, available {available})")]
    InsufficientStock { stock_id: Uuid, requested: i32, available: i32 },
    #[error("release of {requested} exceeds reserved quantity {reserved} for {stock_id}")]
    InsufficientReservedStock { stock_id: Uuid, requested: i32, reserved: i32 },
    #[error("quantity for {stock_id} would fall below reserved quantity {reserved}")]
    ReservationExceedsStock { stock_id: Uuid, reserved: i32 },
    #[error("stock {0} not found")]
    StockNotFound(Uuid),
    #[error("order {0} not found")]
    OrderNotFound(Uuid),
    #[error("order {order_id} has no line for stock {stock_id}")]
    OrderItemNotFound { order_id: Uuid, stock_id: Uuid },
    #[error("due date must be in the future")]
    InvalidDueDate,
    #[error("return of {requested} exceeds ordered quantity {ordered} for {stock_id}")]
    ExcessiveReturnQuantity { stock_id: Uuid, requested: i32, ordered: i32 },
    #[error("payment failed for order {order_id}: {message}")]
    PaymentFailed { order_id: Uuid, message: String },
    #[error("address validation failed")]
    AddressValidationFailed(BTreeMap<String, String>),
    #[error("cart has no lines")]
    EmptyCart,
    #[error("return must include at least one item")]
    EmptyReturn,
    #[error("order {0} has not been paid")]
    OrderNotPaid(Uuid),
    #[error("order {0} is already paid")]
    OrderAlreadyPaid(Uuid),
    #[error("order {0} has been voided")]
    OrderVoided(Uuid),
    #[error("{0}")]
    Invariant(String),
    #[error("collaborator call failed: {0}")]
    Collaborator(#[source] anyhow::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::InvalidQuantity(_) => {
                ApiError::BadRequest { code: "invalid_quantity", trace_id: None, message: Some(message) }
            }
            CheckoutError::InsufficientStock { .. } => {
                ApiError::Conflict { code: "insufficient_stock", trace_id: None, message: Some(message) }
            }
            CheckoutError::InsufficientReservedStock { .. } => {
                ApiError::Conflict { code: "insufficient_reserved_stock", trace_id: None, message: Some(message) }
            }
            CheckoutError::ReservationExceedsStock { .. } => {
                ApiError::Conflict { code: "reservation_exceeds_stock", trace_id: None, message: Some(message) }
            }
            CheckoutError::StockNotFound(_) => {
                ApiError::NotFound { code: "stock_not_found", trace_id: None, message: Some(message) }
            }
            CheckoutError::OrderNotFound(_) => {
                ApiError::NotFound { code: "order_not_found", trace_id: None, message: Some(message) }
            }
            CheckoutError::OrderItemNotFound { .. } => {
                ApiError::NotFound { code: "order_item_not_found", trace_id: None, message: Some(message) }
            }
            CheckoutError::InvalidDueDate => {
                ApiError::BadRequest { code: "invalid_due_date", trace_id: None, message: Some(message) }
            }
            CheckoutError::ExcessiveReturnQuantity { .. } => {
                ApiError::BadRequest { code: "excessive_return_quantity", trace_id: None, message: Some(message) }
            }
            CheckoutError::PaymentFailed { .. } => {
                ApiError::BadGateway { code: "payment_failed", trace_id: None, message: Some(message) }
            }
            CheckoutError::AddressValidationFailed(field_errors) => {
                ApiError::Validation { code: "address_validation_failed", trace_id: None, field_errors }
            }
            CheckoutError::EmptyCart => {
                ApiError::BadRequest { code: "empty_cart", trace_id: None, message: Some(message) }
            }
            CheckoutError::EmptyReturn => {
                ApiError::BadRequest { code: "empty_return", trace_id: None, message: Some(message) }
            }
            CheckoutError::OrderNotPaid(_) => {
                ApiError::Conflict { code: "order_not_paid", trace_id: None, message: Some(message) }
            }
            CheckoutError::OrderAlreadyPaid(_) => {
                ApiError::Conflict { code: "order_already_paid", trace_id: None, message: Some(message) }
            }
            CheckoutError::OrderVoided(_) => {
                ApiError::Conflict { code: "order_voided", trace_id: None, message: Some(message) }
            }
            CheckoutError::Invariant(_) | CheckoutError::Collaborator(_) | CheckoutError::Database(_) => {
                ApiError::Internal { trace_id: None, message: Some(message) }
            }
        }
    }
}
