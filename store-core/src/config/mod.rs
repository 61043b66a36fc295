use secrecy::Secret;
use serde::Deserialize;

/// Connection settings for the hosted identity/record service.
#[derive(Deserialize, Clone)]
pub struct HostedStoreSettings {
    /// Base URL of the hosted project (identity under `/auth/v1`, rows
    /// under `/rest/v1`).
    pub base_url: String,
    /// Project API key, sent with every request.
    pub api_key: Secret<String>,
}
