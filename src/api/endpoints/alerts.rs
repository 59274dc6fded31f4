//! Stock alert endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::alerts::{self, StockAlertReport};
use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext};
use crate::config::EXPIRY_WARNING_DAYS;

#[derive(Deserialize)]
pub struct AlertQuery {
    pub days: Option<i64>,
}

/// `GET /api/alerts/stock?days=` — defaults to the standard expiry window.
pub async fn stock(
    State(ctx): State<ApiContext>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<StockAlertReport>, ApiError> {
    let days = query.days.unwrap_or(EXPIRY_WARNING_DAYS);
    let as_of = today();
    let report = ctx
        .with_db(move |conn| alerts::stock_alerts(conn, as_of, days))
        .await?;
    Ok(Json(report))
}
