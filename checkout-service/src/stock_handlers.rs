use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common_http_errors::ApiError;

use crate::app::AppState;
use crate::error::CheckoutError;
use crate::model::{Stock, STOCK_COLUMNS};
use crate::stock_ledger::{self, AdjustMode};

#[derive(Debug, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub stock: Stock,
    pub available: i32,
    pub low_stock: bool,
}

impl From<Stock> for StockView {
    fn from(stock: Stock) -> Self {
        let available = stock.available();
        let low_stock = stock.low_stock();
        StockView { stock, available, low_stock }
    }
}

pub async fn list_stock(State(state): State<AppState>) -> Result<Json<Vec<StockView>>, ApiError> {
    let sql = format!("SELECT {STOCK_COLUMNS} FROM stocks ORDER BY sku");
    let stocks = sqlx::query_as::<_, Stock>(&sql)
        .fetch_all(&state.db)
        .await
        .map_err(CheckoutError::from)?;
    Ok(Json(stocks.into_iter().map(StockView::from).collect()))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
) -> Result<Json<StockView>, ApiError> {
    let mut conn = state.db.acquire().await.map_err(CheckoutError::from)?;
    let stock = stock_ledger::load(&mut conn, stock_id).await?;
    Ok(Json(stock.into()))
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: i32,
    pub mode: AdjustMode,
}

/// Administrative quantity edit; `subtract`/`replace` refuse to cut below the
/// reserved quantity.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<Json<StockView>, ApiError> {
    let mut tx = state.db.begin().await.map_err(CheckoutError::from)?;
    let stock = stock_ledger::adjust_quantity(&mut tx, stock_id, payload.quantity, payload.mode).await?;
    tx.commit().await.map_err(CheckoutError::from)?;
    Ok(Json(stock.into()))
}
