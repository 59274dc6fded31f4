//! Resolves the acting user.
//!
//! The gateway in front of this service authenticates staff and forwards the
//! user id in `X-User-Id`. The id must name an active user; the resolved
//! `AuthenticatedUser` is injected into request extensions for handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::context::AuthenticatedUser;
use crate::db;

pub const USER_ID_HEADER: &str = "X-User-Id";

pub async fn require_user(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_user_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_user_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or(ApiError::Unauthorized)?;

    let user = ctx.with_db(move |conn| db::get_user(conn, user_id)).await?;
    let user = match user {
        Some(user) if user.active => user,
        _ => {
            tracing::warn!(user_id, "Request from unknown or inactive user");
            return Err(ApiError::Unauthorized);
        }
    };

    req.extensions_mut().insert(AuthenticatedUser::from(user));
    Ok(next.run(req).await)
}
