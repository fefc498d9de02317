use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method, StatusCode,
};
use axum::{middleware, routing::{get, post}, Router};
use prometheus::{Encoder, TextEncoder};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

use common_observability::CheckoutMetrics;

use crate::address::{AddressResolver, HttpAddressResolver, PassthroughAddressResolver};
use crate::cart_handlers::{add_cart_item, clear_cart, get_cart};
use crate::checkout_handlers::{compute_cart, create_order, get_order, list_orders};
use crate::config::CheckoutConfig;
use crate::gateway::{HttpPaymentGateway, PaymentGateway, StubGateway};
use crate::invoice::{HttpInvoiceService, InvoiceService, NoopInvoiceService};
use crate::payment_handlers::{complete_order_payment, void_order};
use crate::return_handlers::{create_return, list_order_returns};
use crate::stock_handlers::{adjust_stock, get_stock, list_stock};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<CheckoutConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub address_resolver: Arc<dyn AddressResolver>,
    pub invoices: Arc<dyn InvoiceService>,
    pub metrics: Arc<CheckoutMetrics>,
}

impl AppState {
    /// Wire collaborators from configuration: HTTP implementations when a
    /// base URL is configured, in-process fallbacks otherwise.
    pub fn from_config(db: PgPool, config: CheckoutConfig) -> Self {
        let client = reqwest::Client::new();
        let gateway: Arc<dyn PaymentGateway> = match &config.payment_gateway_url {
            Some(url) => Arc::new(HttpPaymentGateway::new(client.clone(), url.clone())),
            None => Arc::new(StubGateway::new()),
        };
        let address_resolver: Arc<dyn AddressResolver> = match &config.address_service_url {
            Some(url) => Arc::new(HttpAddressResolver::new(client.clone(), url.clone())),
            None => Arc::new(PassthroughAddressResolver),
        };
        let invoices: Arc<dyn InvoiceService> = match &config.invoice_service_url {
            Some(url) => Arc::new(HttpInvoiceService::new(client, url.clone())),
            None => Arc::new(NoopInvoiceService),
        };
        AppState {
            db,
            config: Arc::new(config),
            gateway,
            address_resolver,
            invoices,
            metrics: Arc::new(CheckoutMetrics::new()),
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8_lossy(&buf).to_string())
}

async fn error_metrics_mw(
    State(metrics): State<Arc<CheckoutMetrics>>,
    req: axum::http::Request<Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("x-error-code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics
            .http_errors_total
            .with_label_values(&["checkout-service", code, status.as_str()])
            .inc();
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ]);

    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/compute", post(compute_cart))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/:order_id/void", post(void_order))
        .route("/orders/:order_id/return", post(create_return))
        .route("/orders/:order_id/returns", get(list_order_returns))
        .route("/orders/:order_id/payment/complete", post(complete_order_payment))
        .route("/stock", get(list_stock))
        .route("/stock/:stock_id", get(get_stock))
        .route("/stock/:stock_id/adjust", post(adjust_stock))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
        .layer(cors)
}
