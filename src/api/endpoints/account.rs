//! Account endpoints.
//!
//! - `POST /api/account/password` — change the acting user's password
//! - `POST /api/users` — create a user (administrators)

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::account::{self, PasswordChange};
use crate::api::error::ApiError;
use crate::api::types::{now, ApiContext};
use crate::context::AuthenticatedUser;
use crate::models::{NewUser, User};

pub async fn change_password(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(change): Json<PasswordChange>,
) -> Result<StatusCode, ApiError> {
    let policy = ctx.password_policy;
    let at = now();
    ctx.with_db(move |conn| account::change_password(conn, user.id, &change, policy, at))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_user(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let policy = ctx.password_policy;
    let created = ctx
        .with_request_context(user, move |rc| account::create_user(rc, &new_user, policy))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
