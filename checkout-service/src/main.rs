use std::net::SocketAddr;

use sqlx::PgPool;
use tokio::net::TcpListener;

use checkout_service::{build_router, AppState, CheckoutConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    common_money::log_rounding_mode_once();

    let config = CheckoutConfig::from_env()?;
    let db = PgPool::connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let host = config.host.clone();
    let port = config.port;
    let state = AppState::from_config(db, config);
    let app = build_router(state);

    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    println!("starting checkout-service on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
