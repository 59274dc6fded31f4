//! Storage location endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext};
use crate::context::AuthenticatedUser;
use crate::models::{StorageLocation, StorageLocationInput};
use crate::storage::{self, StorageContents, StorageSummary};

/// `GET /api/storage`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<StorageSummary>>, ApiError> {
    let locations = ctx.with_db(storage::list_storage_locations).await?;
    Ok(Json(locations))
}

/// `POST /api/storage`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<StorageLocationInput>,
) -> Result<(StatusCode, Json<StorageLocation>), ApiError> {
    let location = ctx
        .with_request_context(user, move |rc| storage::create_storage_location(rc, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// `PUT /api/storage/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(input): Json<StorageLocationInput>,
) -> Result<Json<StorageLocation>, ApiError> {
    let location = ctx
        .with_request_context(user, move |rc| storage::update_storage_location(rc, id, &input))
        .await?;
    Ok(Json(location))
}

/// `GET /api/storage/:id/contents`
pub async fn contents(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<StorageContents>, ApiError> {
    let as_of = today();
    let contents = ctx
        .with_db(move |conn| storage::storage_contents(conn, id, as_of))
        .await?;
    Ok(Json(contents))
}
