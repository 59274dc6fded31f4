//! Drug catalogue, lot and recall endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext};
use crate::context::AuthenticatedUser;
use crate::inventory::{self, AvailableStock, LotView};
use crate::models::enums::RecallStatus;
use crate::models::{Drug, LotStock, NewDrug, NewLot, NewRecall, Recall};

#[derive(Deserialize)]
pub struct DrugQuery {
    pub search: Option<String>,
}

/// `GET /api/drugs?search=`
pub async fn search_drugs(
    State(ctx): State<ApiContext>,
    Query(query): Query<DrugQuery>,
) -> Result<Json<Vec<Drug>>, ApiError> {
    let drugs = ctx
        .with_db(move |conn| inventory::search_drugs(conn, query.search.as_deref()))
        .await?;
    Ok(Json(drugs))
}

/// `POST /api/drugs`
pub async fn register_drug(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(drug): Json<NewDrug>,
) -> Result<(StatusCode, Json<Drug>), ApiError> {
    let stored = ctx
        .with_request_context(user, move |rc| inventory::register_drug(rc, &drug))
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/drugs/:id/lots`
pub async fn lots(
    State(ctx): State<ApiContext>,
    Path(drug_id): Path<i64>,
) -> Result<Json<Vec<LotView>>, ApiError> {
    let as_of = today();
    let lots = ctx
        .with_db(move |conn| inventory::list_lots(conn, drug_id, as_of))
        .await?;
    Ok(Json(lots))
}

/// `GET /api/drugs/:id/stock`
pub async fn stock(
    State(ctx): State<ApiContext>,
    Path(drug_id): Path<i64>,
) -> Result<Json<AvailableStock>, ApiError> {
    let as_of = today();
    let stock = ctx
        .with_db(move |conn| inventory::available_stock(conn, drug_id, as_of))
        .await?;
    Ok(Json(stock))
}

/// `POST /api/lots`
pub async fn receive_lot(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(lot): Json<NewLot>,
) -> Result<(StatusCode, Json<LotStock>), ApiError> {
    let stored = ctx
        .with_request_context(user, move |rc| inventory::receive_lot(rc, &lot))
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Deserialize)]
pub struct RecallQuery {
    pub status: Option<RecallStatus>,
}

/// `GET /api/recalls?status=`
pub async fn recalls(
    State(ctx): State<ApiContext>,
    Query(query): Query<RecallQuery>,
) -> Result<Json<Vec<Recall>>, ApiError> {
    let recalls = ctx
        .with_db(move |conn| inventory::list_recalls(conn, query.status))
        .await?;
    Ok(Json(recalls))
}

/// `POST /api/recalls`
pub async fn register_recall(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(recall): Json<NewRecall>,
) -> Result<(StatusCode, Json<Recall>), ApiError> {
    let as_of = today();
    let stored = ctx
        .with_request_context(user, move |rc| inventory::register_recall(rc, &recall, as_of))
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `POST /api/recalls/:id/close`
pub async fn close_recall(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(recall_id): Path<i64>,
) -> Result<Json<Recall>, ApiError> {
    let as_of = today();
    let closed = ctx
        .with_request_context(user, move |rc| inventory::close_recall(rc, recall_id, as_of))
        .await?;
    Ok(Json(closed))
}
