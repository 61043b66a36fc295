use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use store_core::error::AppError;

use crate::AppState;

/// Gate for routes that need a signed-in identity.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = state.session.snapshot();
    if snapshot.identity.is_none() {
        return AppError::Unauthorized(anyhow::anyhow!("sign in required")).into_response();
    }
    next.run(request).await
}

/// Gate for admin-only routes. A still-resolving or failed-open role reads
/// as `user` here, so lookup trouble can never grant admin access.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = state.session.snapshot();
    if snapshot.identity.is_none() {
        return AppError::Unauthorized(anyhow::anyhow!("sign in required")).into_response();
    }
    if !snapshot.role.map(|r| r.is_admin()).unwrap_or(false) {
        return AppError::Forbidden(anyhow::anyhow!("admin role required")).into_response();
    }
    next.run(request).await
}
