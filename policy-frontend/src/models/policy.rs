//! Policy rows as stored in the hosted record service.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An insurance product offered in the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub coverage_amount: f64,
    pub premium_amount: f64,
    pub duration_months: u32,
    pub status: String,
}

/// Request to create a policy (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Coverage must not be negative"))]
    pub coverage_amount: f64,
    #[validate(range(min = 0.0, message = "Premium must not be negative"))]
    pub premium_amount: f64,
    #[validate(range(min = 1, message = "Duration must be at least one month"))]
    pub duration_months: u32,
    #[serde(default = "default_policy_status")]
    pub status: String,
}

fn default_policy_status() -> String {
    "active".to_string()
}

/// A purchased policy row. Purchases start out pending activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPolicy {
    pub user_id: Uuid,
    pub policy_id: Uuid,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub premium_paid: f64,
}

impl UserPolicy {
    /// Build the pending purchase row: coverage runs from today for the
    /// policy's duration, at the listed premium.
    pub fn purchase(user_id: Uuid, policy: &Policy) -> Self {
        let start_date = Utc::now().date_naive();
        let end_date = start_date
            .checked_add_months(chrono::Months::new(policy.duration_months))
            .unwrap_or(start_date);
        Self {
            user_id,
            policy_id: policy.id,
            status: "pending".to_string(),
            start_date,
            end_date,
            premium_paid: policy.premium_amount,
        }
    }
}
