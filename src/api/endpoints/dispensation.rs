//! Dispensation endpoints.
//!
//! - `GET /api/dispensation/queue` — items awaiting dispensation
//! - `POST /api/dispensation` — dispense an item
//! - `GET /api/dispensation/items/:id` — item state
//! - `POST /api/administrations` — record an administration

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{now, today, ApiContext};
use crate::context::AuthenticatedUser;
use crate::dispensation::{self, DispensationReceipt, ItemStatus, QueueEntry};

pub async fn queue(State(ctx): State<ApiContext>) -> Result<Json<Vec<QueueEntry>>, ApiError> {
    let as_of = today();
    let entries = ctx
        .with_db(move |conn| dispensation::dispensation_queue(conn, as_of))
        .await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
pub struct DispenseRequest {
    pub item_id: i64,
    pub quantity: i64,
}

pub async fn dispense(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<DispenseRequest>,
) -> Result<(StatusCode, Json<DispensationReceipt>), ApiError> {
    let at = now();
    let receipt = ctx
        .with_request_context(user, move |rc| {
            dispensation::dispense(rc, req.item_id, req.quantity, at)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn item_status(
    State(ctx): State<ApiContext>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemStatus>, ApiError> {
    let status = ctx
        .with_db(move |conn| dispensation::item_status(conn, item_id))
        .await?;
    Ok(Json(status))
}

#[derive(Deserialize)]
pub struct AdministrationRequest {
    pub item_id: i64,
    pub notes: Option<String>,
}

pub async fn record_administration(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<AdministrationRequest>,
) -> Result<(StatusCode, Json<ItemStatus>), ApiError> {
    let at = now();
    let status = ctx
        .with_request_context(user, move |rc| {
            dispensation::record_administration(rc, req.item_id, req.notes.as_deref(), at)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(status)))
}
