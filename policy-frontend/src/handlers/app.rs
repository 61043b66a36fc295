use axum::{response::IntoResponse, Json};

pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "policy-frontend",
        "status": "ok",
    }))
}

pub async fn health_check() -> impl IntoResponse {
    "OK"
}
