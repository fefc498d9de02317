use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};

#[derive(Clone)]
pub struct CheckoutMetrics {
    pub registry: Registry,
    pub orders_placed: IntCounter,
    pub payments_completed: IntCounter,
    pub payment_failures: IntCounter,
    pub returns_processed: IntCounter,
    pub reservation_conflicts: IntCounter,
    pub checkout_duration_seconds: Histogram,
    pub http_errors_total: IntCounterVec,
}

impl CheckoutMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let orders_placed = IntCounter::new(
            "checkout_orders_placed_total",
            "Orders assembled and committed",
        ).unwrap();
        let payments_completed = IntCounter::new(
            "checkout_payments_completed_total",
            "Payments confirmed and stock consumed",
        ).unwrap();
        let payment_failures = IntCounter::new(
            "checkout_payment_failures_total",
            "Gateway declines and transport failures",
        ).unwrap();
        let returns_processed = IntCounter::new(
            "checkout_returns_processed_total",
            "Return transactions committed",
        ).unwrap();
        let reservation_conflicts = IntCounter::new(
            "checkout_reservation_conflicts_total",
            "Checkouts aborted because stock could not be reserved",
        ).unwrap();
        let checkout_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "checkout_duration_seconds",
                "Wall-clock duration of an order placement"
            ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0])
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let _ = registry.register(Box::new(orders_placed.clone()));
        let _ = registry.register(Box::new(payments_completed.clone()));
        let _ = registry.register(Box::new(payment_failures.clone()));
        let _ = registry.register(Box::new(returns_processed.clone()));
        let _ = registry.register(Box::new(reservation_conflicts.clone()));
        let _ = registry.register(Box::new(checkout_duration_seconds.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        CheckoutMetrics {
            registry,
            orders_placed,
            payments_completed,
            payment_failures,
            returns_processed,
            reservation_conflicts,
            checkout_duration_seconds,
            http_errors_total,
        }
    }
}

impl Default for CheckoutMetrics {
    fn default() -> Self { Self::new() }
}
