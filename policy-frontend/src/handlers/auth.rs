use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use validator::Validate;

use store_core::error::AppError;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
}

/// The UI read model: identity, role, and the bounded loading flag.
pub async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot())
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    state
        .session
        .sign_in(&payload.email, &payload.password)
        .await?;

    // Role resolution continues in the background; the snapshot tells the
    // caller whether it is still loading.
    Ok(Json(state.session.snapshot()))
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let new_identity = state
        .session
        .sign_up(&payload.email, &payload.password, &payload.full_name)
        .await?;

    Ok(Json(serde_json::json!({
        "identity": new_identity.identity,
        "message": "Registration successful",
    })))
}

pub async fn logout_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.session.sign_out().await?;
    Ok(Json(state.session.snapshot()))
}
