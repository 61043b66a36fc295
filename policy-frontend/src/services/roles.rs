//! Role resolution with lazy provisioning.

use store_core::models::Role;
use store_core::store::IdentityStore;
use uuid::Uuid;

/// Resolve the authorization role for `identity`.
///
/// Never fails: a missing row is provisioned with the default `user` role,
/// and any other lookup failure resolves to `user` as well. An authorization
/// outage must never grant `admin`, and must never leave the caller waiting.
/// Insert failures (including a duplicate key from a concurrent
/// provisioning attempt) are logged and do not block resolution.
pub async fn resolve(store: &dyn IdentityStore, identity: Uuid) -> Role {
    match store.query_role(identity).await {
        Ok(role) => {
            tracing::debug!(%identity, %role, "role row found");
            role
        }
        Err(err) if err.is_row_not_found() => {
            tracing::info!(%identity, "no role row, provisioning default user role");
            if let Err(insert_err) = store.insert_role(identity, Role::User).await {
                if insert_err.is_conflict() {
                    tracing::debug!(%identity, "role row already provisioned");
                } else {
                    tracing::error!(%identity, error = %insert_err, "failed to create default user role");
                }
            }
            Role::User
        }
        Err(err) => {
            tracing::error!(%identity, error = %err, "role lookup failed, falling back to user");
            Role::User
        }
    }
}
