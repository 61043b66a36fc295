//! Shared domain models: sessions, roles, and session-change events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proof of an authenticated identity, issued by the hosted service.
///
/// At most one session is current at any time; the session context owns the
/// current value and is the single source of truth the rest of the
/// application reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable user identifier.
    pub identity: Uuid,
    /// Display only.
    pub email: String,
    pub access_token: String,
}

/// Identity handle returned by a successful sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIdentity {
    pub identity: Uuid,
}

/// Authorization level attached to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle notification published by the store client.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}
