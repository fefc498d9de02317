pub mod address;
pub mod app;
pub mod cart;
pub mod cart_handlers;
pub mod checkout_handlers;
pub mod config;
pub mod discounts;
pub mod error;
pub mod gateway;
pub mod invoice;
pub mod model;
pub mod order_assembler;
pub mod payment_completion;
pub mod payment_handlers;
pub mod pricing;
pub mod return_handlers;
pub mod returns;
pub mod stock_handlers;
pub mod stock_ledger;

pub use app::{build_router, AppState};
pub use config::CheckoutConfig;
pub use error::CheckoutError;
