use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    app::{health_check, index},
    auth::{login_handler, logout_handler, register_handler, session_handler},
    dashboard,
    policies::{create_policy, list_policies, purchase_policy},
};
use crate::middleware::auth::{require_admin, require_session};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/session", get(session_handler))
        .route("/login", post(login_handler))
        .route("/register", post(register_handler))
        .route("/logout", get(logout_handler))
        .route("/policies", get(list_policies))
        .route(
            "/admin/policies",
            post(create_policy).layer(from_fn_with_state(state.clone(), require_admin)),
        )
        .route(
            "/policies/:id/purchase",
            post(purchase_policy).layer(from_fn_with_state(state.clone(), require_session)),
        )
        .route(
            "/dashboard/policies",
            get(dashboard::my_policies)
                .layer(from_fn_with_state(state.clone(), require_session)),
        )
        .route(
            "/admin/users/:identity/policies",
            get(dashboard::user_policies)
                .layer(from_fn_with_state(state.clone(), require_admin)),
        )
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
