use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::HostedStoreSettings;
use crate::error::StoreError;
use crate::models::{NewIdentity, Role, Session, SessionEvent};
use crate::store::IdentityStore;

/// PostgREST "no rows returned" code for single-object reads.
const NO_ROWS_CODE: &str = "PGRST116";

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Upper bound on any single request to the hosted service. The resolution
/// timeouts are tighter; this only keeps connections from hanging forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the hosted identity/record service.
///
/// Identity endpoints live under `/auth/v1`, row tables under `/rest/v1`.
/// The client keeps the process-local current session and publishes
/// [`SessionEvent`]s whenever its own auth calls change it.
pub struct HostedStoreClient {
    client: Client,
    settings: HostedStoreSettings,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl HostedStoreClient {
    pub fn new(settings: HostedStoreSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build http client");
        Self {
            client,
            settings,
            current: RwLock::new(None),
            events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.settings.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.settings.base_url, table)
    }

    /// Attach the project key and the strongest available bearer token.
    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let api_key = self.settings.api_key.expose_secret().clone();
        let bearer = self
            .current
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| api_key.clone());
        req.header("apikey", api_key).bearer_auth(bearer)
    }

    fn replace_session(&self, session: Option<Session>) {
        *self.current.write().expect("session lock poisoned") = session;
    }

    fn publish(&self, event: SessionEvent) {
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }

    async fn error_body(response: Response) -> (u16, serde_json::Value) {
        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

/// Map a failed row-table read onto the taxonomy. The explicit no-rows code
/// must stay distinguishable from everything else.
fn rest_error_from(status: u16, body: &serde_json::Value) -> StoreError {
    let code = body["code"].as_str().map(str::to_string);
    let message = body["message"]
        .as_str()
        .unwrap_or("unknown store error")
        .to_string();
    if code.as_deref() == Some(NO_ROWS_CODE) {
        return StoreError::RowNotFound {
            code: NO_ROWS_CODE.to_string(),
        };
    }
    StoreError::Api {
        status,
        code,
        message,
    }
}

/// Map a failed row-table write. Duplicate keys keep their code so callers
/// can tolerate a second provisioning attempt.
fn write_error_from(status: u16, body: &serde_json::Value) -> StoreError {
    StoreError::Write {
        code: body["code"].as_str().map(str::to_string),
        message: format!(
            "status {status}: {}",
            body["message"].as_str().unwrap_or("unknown write error")
        ),
    }
}

/// Map a failed identity call. Credential problems become `Auth` so the UI
/// can show an inline message; everything else is a generic store error.
fn auth_error_from(status: u16, body: &serde_json::Value) -> StoreError {
    let message = body["error_description"]
        .as_str()
        .or_else(|| body["msg"].as_str())
        .or_else(|| body["message"].as_str())
        .unwrap_or("authentication failed")
        .to_string();
    match status {
        400 | 401 | 403 | 422 => StoreError::Auth(message),
        _ => StoreError::Api {
            status,
            code: body["error"].as_str().map(str::to_string),
            message,
        },
    }
}

#[async_trait]
impl IdentityStore for HostedStoreClient {
    async fn probe(&self) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.get(self.rest_url("user_roles")))
            .query(&[("select", "role"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("connectivity probe failed: {}", e);
                StoreError::Connectivity(e.to_string())
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Connectivity(format!(
                "probe returned {}",
                response.status()
            )))
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self
            .current
            .read()
            .expect("session lock poisoned")
            .clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        let response = self
            .authed(self.client.post(self.auth_url("/token")))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(auth_error_from(status, &body));
        }

        let body: serde_json::Value = response.json().await?;
        let identity = body["user"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| StoreError::Auth("malformed token response".to_string()))?;
        let session = Session {
            identity,
            email: body["user"]["email"].as_str().unwrap_or(email).to_string(),
            access_token: body["access_token"].as_str().unwrap_or_default().to_string(),
        };

        self.replace_session(Some(session.clone()));
        self.publish(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<NewIdentity, StoreError> {
        let response = self
            .authed(self.client.post(self.auth_url("/signup")))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(auth_error_from(status, &body));
        }

        let body: serde_json::Value = response.json().await?;
        let identity = body["user"]["id"]
            .as_str()
            .or_else(|| body["id"].as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| StoreError::Auth("malformed signup response".to_string()))?;

        // Projects without email confirmation return a session immediately.
        if let Some(token) = body["access_token"].as_str() {
            let session = Session {
                identity,
                email: email.to_string(),
                access_token: token.to_string(),
            };
            self.replace_session(Some(session.clone()));
            self.publish(SessionEvent::SignedIn(session));
        }

        Ok(NewIdentity { identity })
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.post(self.auth_url("/logout")))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(auth_error_from(status, &body));
        }

        self.replace_session(None);
        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    async fn query_role(&self, identity: Uuid) -> Result<Role, StoreError> {
        let filter = format!("eq.{identity}");
        let response = self
            .authed(self.client.get(self.rest_url("user_roles")))
            .query(&[("user_id", filter.as_str()), ("select", "role")])
            // Single-object read: no rows is an error with its own code.
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(rest_error_from(status, &body));
        }

        let row: serde_json::Value = response.json().await?;
        serde_json::from_value(row["role"].clone()).map_err(|e| StoreError::Api {
            status: 200,
            code: None,
            message: format!("unrecognized role value: {e}"),
        })
    }

    async fn insert_role(&self, identity: Uuid, role: Role) -> Result<(), StoreError> {
        self.insert_row(
            "user_roles",
            serde_json::json!({ "user_id": identity, "role": role }),
        )
        .await
    }

    async fn insert_profile(&self, identity: Uuid, full_name: &str) -> Result<(), StoreError> {
        self.insert_row(
            "profiles",
            serde_json::json!({ "user_id": identity, "full_name": full_name }),
        )
        .await
    }

    async fn fetch_rows(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let response = self
            .authed(self.client.get(self.rest_url(table)))
            .query(filters)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(rest_error_from(status, &body));
        }

        Ok(response.json().await?)
    }

    async fn insert_row(&self, table: &str, row: serde_json::Value) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            let err = write_error_from(status, &body);
            tracing::error!(table, error = %err, "row insert rejected");
            return Err(err);
        }

        Ok(())
    }
}
