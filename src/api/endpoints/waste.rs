//! Waste endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{now, today, ApiContext};
use crate::context::AuthenticatedUser;
use crate::models::{NewWaste, WasteEntry};
use crate::waste::{self, WasteReport};

/// `POST /api/waste`
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(entry): Json<NewWaste>,
) -> Result<(StatusCode, Json<WasteEntry>), ApiError> {
    let at = now();
    let stored = ctx
        .with_request_context(user, move |rc| waste::record_waste(rc, &entry, at))
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// `GET /api/waste?from=&to=` — defaults to the current month so far.
pub async fn report(
    State(ctx): State<ApiContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<WasteReport>, ApiError> {
    let to = query.to.unwrap_or_else(today);
    let from = query
        .from
        .unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    let report = ctx
        .with_db(move |conn| waste::list_waste(conn, from, to))
        .await?;
    Ok(Json(report))
}
