pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use services::session::SessionContext;
use std::sync::Arc;
use store_core::store::IdentityStore;

/// Shared application state: the hosted-store client and the session
/// context that owns session/role resolution.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IdentityStore>,
    pub session: Arc<SessionContext>,
}

impl AppState {
    pub fn new(store: Arc<dyn IdentityStore>, session: Arc<SessionContext>) -> Self {
        Self { store, session }
    }
}
