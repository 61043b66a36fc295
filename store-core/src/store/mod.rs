//! The external collaborator boundary: hosted identity + record store.

pub mod client;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewIdentity, Role, Session, SessionEvent};

pub use client::HostedStoreClient;

/// Interface to the hosted identity and record service.
///
/// The session context depends on this trait rather than the HTTP client so
/// resolution behavior can be exercised against a scripted double.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Lightweight connectivity check. A failure here means the backend is
    /// unreachable and further calls in the same pass are pointless.
    async fn probe(&self) -> Result<(), StoreError>;

    /// The current session, if one exists.
    async fn current_session(&self) -> Result<Option<Session>, StoreError>;

    /// Subscribe to session lifecycle notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<NewIdentity, StoreError>;

    async fn sign_out(&self) -> Result<(), StoreError>;

    /// Role row lookup. A missing row is reported as
    /// [`StoreError::RowNotFound`], distinguishable from connectivity or
    /// permission failures.
    async fn query_role(&self, identity: Uuid) -> Result<Role, StoreError>;

    async fn insert_role(&self, identity: Uuid, role: Role) -> Result<(), StoreError>;

    async fn insert_profile(&self, identity: Uuid, full_name: &str) -> Result<(), StoreError>;

    /// Plain filtered read against a row table, used by the dashboard and
    /// marketplace screens.
    async fn fetch_rows(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Plain insert into a row table.
    async fn insert_row(&self, table: &str, row: serde_json::Value) -> Result<(), StoreError>;
}
