use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use store_core::error::AppError;

use crate::models::policy::{CreatePolicyRequest, Policy, UserPolicy};
use crate::AppState;

fn parse_policies(rows: Vec<serde_json::Value>) -> Result<Vec<Policy>, AppError> {
    serde_json::from_value(serde_json::Value::Array(rows))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("malformed policy rows: {e}")))
}

/// Marketplace listing: every policy currently open for purchase.
pub async fn list_policies(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state
        .store
        .fetch_rows(
            "policies",
            &[("status", "eq.active".to_string()), ("select", "*".to_string())],
        )
        .await?;
    Ok(Json(parse_policies(rows)?))
}

/// Create a policy offering. Router gates this behind the admin role.
pub async fn create_policy(
    State(state): State<AppState>,
    Json(payload): Json<CreatePolicyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let snapshot = state.session.snapshot();
    let created_by = snapshot
        .identity
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("sign in required")))?;

    state
        .store
        .insert_row(
            "policies",
            serde_json::json!({
                "name": payload.name,
                "description": payload.description,
                "coverage_amount": payload.coverage_amount,
                "premium_amount": payload.premium_amount,
                "duration_months": payload.duration_months,
                "status": payload.status,
                "created_by": created_by,
            }),
        )
        .await?;

    tracing::info!(name = %payload.name, %created_by, "policy created");
    Ok(Json(serde_json::json!({ "message": "Policy created" })))
}

/// Purchase a policy: inserts a pending `user_policies` row running from
/// today for the policy's duration.
pub async fn purchase_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.session.snapshot();
    let user_id = snapshot
        .identity
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("sign in required")))?;

    let rows = state
        .store
        .fetch_rows(
            "policies",
            &[
                ("id", format!("eq.{policy_id}")),
                ("select", "*".to_string()),
            ],
        )
        .await?;
    let policy = parse_policies(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("policy {policy_id} not found")))?;

    let purchase = UserPolicy::purchase(user_id, &policy);
    state
        .store
        .insert_row(
            "user_policies",
            serde_json::to_value(&purchase)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?,
        )
        .await?;

    tracing::info!(%user_id, %policy_id, "policy purchased");
    Ok(Json(purchase))
}
