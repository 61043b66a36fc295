//! Scripted in-memory stand-in for the hosted identity/record service.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, Notify};
use uuid::Uuid;

use policy_frontend::services::session::{AuthSnapshot, ResolverTimeouts, SessionContext};
use store_core::error::StoreError;
use store_core::models::{NewIdentity, Role, Session, SessionEvent};
use store_core::store::IdentityStore;

pub fn session_for(identity: Uuid, email: &str) -> Session {
    Session {
        identity,
        email: email.to_string(),
        access_token: "scripted-token".to_string(),
    }
}

#[derive(Default)]
pub struct ScriptedStore {
    /// Chronological record of collaborator calls.
    pub calls: Mutex<Vec<&'static str>>,

    pub probe_fails: AtomicBool,
    pub probe_hangs: AtomicBool,

    pub current: Mutex<Option<Session>>,
    pub session_fetch_fails: AtomicBool,

    /// Registered credentials: email -> (password, session).
    pub accounts: Mutex<HashMap<String, (String, Session)>>,

    pub role_rows: Mutex<HashMap<Uuid, Role>>,
    pub role_query_fails: AtomicBool,
    /// When set, role queries block until the gate is notified.
    pub role_gate: Mutex<Option<Arc<Notify>>>,
    pub insert_role_conflicts: AtomicBool,
    pub inserted_roles: Mutex<Vec<(Uuid, Role)>>,
    pub insert_profile_fails: AtomicBool,
    pub inserted_profiles: Mutex<Vec<(Uuid, String)>>,

    pub tables: Mutex<HashMap<String, Vec<serde_json::Value>>>,

    events: Mutex<Option<broadcast::Sender<SessionEvent>>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        let store = Self::default();
        let (tx, _) = broadcast::channel(16);
        *store.events.lock().unwrap() = Some(tx);
        Arc::new(store)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn called(&self, call: &'static str) -> bool {
        self.calls.lock().unwrap().contains(&call)
    }

    pub fn with_session(self: &Arc<Self>, session: Session) -> Arc<Self> {
        *self.current.lock().unwrap() = Some(session);
        Arc::clone(self)
    }

    pub fn with_role(self: &Arc<Self>, identity: Uuid, role: Role) -> Arc<Self> {
        self.role_rows.lock().unwrap().insert(identity, role);
        Arc::clone(self)
    }

    pub fn with_account(self: &Arc<Self>, email: &str, password: &str, session: Session) -> Arc<Self> {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), session));
        Arc::clone(self)
    }

    /// Block role queries until the returned gate is notified.
    pub fn gate_role_queries(self: &Arc<Self>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.role_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.lock().unwrap().as_ref().unwrap().clone()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender().send(event);
    }
}

#[async_trait]
impl IdentityStore for ScriptedStore {
    async fn probe(&self) -> Result<(), StoreError> {
        self.record("probe");
        if self.probe_hangs.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.probe_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("scripted outage".to_string()));
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        self.record("current_session");
        if self.session_fetch_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("scripted fetch failure".to_string()));
        }
        Ok(self.current.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender().subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        self.record("sign_in");
        let session = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((expected, session)) if expected == password => session.clone(),
                _ => {
                    return Err(StoreError::Auth("Invalid login credentials".to_string()));
                }
            }
        };
        *self.current.lock().unwrap() = Some(session.clone());
        self.publish(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _full_name: &str,
    ) -> Result<NewIdentity, StoreError> {
        self.record("sign_up");
        let identity = Uuid::new_v4();
        let session = session_for(identity, email);
        *self.current.lock().unwrap() = Some(session.clone());
        self.publish(SessionEvent::SignedIn(session));
        Ok(NewIdentity { identity })
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        self.record("sign_out");
        *self.current.lock().unwrap() = None;
        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    async fn query_role(&self, identity: Uuid) -> Result<Role, StoreError> {
        self.record("query_role");
        let gate = self.role_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.role_query_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 500,
                code: None,
                message: "scripted role lookup failure".to_string(),
            });
        }
        match self.role_rows.lock().unwrap().get(&identity) {
            Some(role) => Ok(*role),
            None => Err(StoreError::RowNotFound {
                code: "PGRST116".to_string(),
            }),
        }
    }

    async fn insert_role(&self, identity: Uuid, role: Role) -> Result<(), StoreError> {
        self.record("insert_role");
        self.inserted_roles.lock().unwrap().push((identity, role));
        if self.insert_role_conflicts.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                code: Some("23505".to_string()),
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }
        self.role_rows.lock().unwrap().insert(identity, role);
        Ok(())
    }

    async fn insert_profile(&self, identity: Uuid, full_name: &str) -> Result<(), StoreError> {
        self.record("insert_profile");
        self.inserted_profiles
            .lock()
            .unwrap()
            .push((identity, full_name.to_string()));
        if self.insert_profile_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                code: None,
                message: "scripted profile insert failure".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_rows(
        &self,
        table: &str,
        _filters: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        self.record("fetch_rows");
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_row(&self, table: &str, row: serde_json::Value) -> Result<(), StoreError> {
        self.record("insert_row");
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }
}

/// Context with short, test-friendly timeout bounds (in paused-clock tests
/// the virtual durations still match production defaults).
pub fn context(store: Arc<ScriptedStore>) -> Arc<SessionContext> {
    Arc::new(SessionContext::new(store, ResolverTimeouts::default()))
}

/// Await snapshots until the predicate holds, returning the matching one.
pub async fn wait_for(
    rx: &mut watch::Receiver<AuthSnapshot>,
    pred: impl Fn(&AuthSnapshot) -> bool,
) -> AuthSnapshot {
    loop {
        {
            let snap = rx.borrow();
            if pred(&snap) {
                return snap.clone();
            }
        }
        rx.changed().await.expect("snapshot channel closed");
    }
}
