//! Audit logging middleware.
//!
//! Logs every API request with a fresh request id, the acting user, method,
//! path, response status and latency. Runs innermost (after identity has
//! injected the user).

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::RequestId;
use crate::context::AuthenticatedUser;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub async fn log_access(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user_id = req.extensions().get::<AuthenticatedUser>().map(|u| u.id);
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let started = Instant::now();
    let mut response = next.run(req).await;
    let status = response.status().as_u16();

    tracing::info!(
        request_id = %request_id,
        user_id,
        %method,
        %path,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API access"
    );

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}
