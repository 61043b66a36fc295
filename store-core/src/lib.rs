//! store-core: Shared infrastructure for the policy-sales frontend.
//!
//! Holds the client for the hosted identity/record service, the error
//! taxonomy, shared domain models, and logging initialization.
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod store;

pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use uuid;
