use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use store_core::error::AppError;

use crate::AppState;

/// The signed-in user's purchased policies, with the policy details joined
/// in by the record service.
pub async fn my_policies(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.session.snapshot();
    let user_id = snapshot
        .identity
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("sign in required")))?;

    let rows = state
        .store
        .fetch_rows(
            "user_policies",
            &[
                ("user_id", format!("eq.{user_id}")),
                (
                    "select",
                    "*, policies(name, premium_amount, coverage_amount)".to_string(),
                ),
            ],
        )
        .await?;

    Ok(Json(rows))
}

/// Admin lookup: another user's profile and purchased policies.
pub async fn user_policies(
    State(state): State<AppState>,
    Path(identity): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let filter = format!("eq.{identity}");

    let profiles = state
        .store
        .fetch_rows(
            "profiles",
            &[("user_id", filter.clone()), ("select", "*".to_string())],
        )
        .await?;

    let policies = state
        .store
        .fetch_rows(
            "user_policies",
            &[
                ("user_id", filter),
                (
                    "select",
                    "*, policies(name, premium_amount, coverage_amount)".to_string(),
                ),
            ],
        )
        .await?;

    Ok(Json(serde_json::json!({
        "profile": profiles.into_iter().next(),
        "policies": policies,
    })))
}
