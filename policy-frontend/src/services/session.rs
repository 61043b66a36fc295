//! Session context: owns the current session and role, resolves both on
//! startup and on every session-change notification, and guarantees the
//! observed `loading` flag clears within a bounded time no matter what the
//! network does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use store_core::error::StoreError;
use store_core::models::{NewIdentity, Role, Session, SessionEvent};
use store_core::store::IdentityStore;

use crate::services::resolution::{Resolution, Ticket};
use crate::services::roles;

/// Read model exposed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub identity: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl AuthSnapshot {
    fn signed_out() -> Self {
        Self {
            identity: None,
            email: None,
            role: None,
            loading: false,
        }
    }
}

/// Timeout bounds for resolution attempts.
///
/// The presentation layer keeps its own outer timeout (around 8 s) that
/// renders the screen regardless of this core; both bounds here must fire
/// well before it.
#[derive(Debug, Clone)]
pub struct ResolverTimeouts {
    /// Circuit breaker for the whole initialization pass, covering a hung
    /// connectivity probe.
    pub init_safety: Duration,
    /// Re-armed on every transition to `loading=true`.
    pub loading: Duration,
}

impl Default for ResolverTimeouts {
    fn default() -> Self {
        Self {
            init_safety: Duration::from_secs(3),
            loading: Duration::from_secs(5),
        }
    }
}

struct State {
    session: Option<Session>,
    role: Option<Role>,
    resolution: Resolution,
}

struct Shared {
    state: Mutex<State>,
    snapshot: watch::Sender<AuthSnapshot>,
    timeouts: ResolverTimeouts,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("session state lock poisoned")
    }

    /// Rebuild and publish the snapshot from current state.
    fn publish(&self) {
        let snap = {
            let state = self.lock();
            AuthSnapshot {
                identity: state.session.as_ref().map(|s| s.identity),
                email: state.session.as_ref().map(|s| s.email.clone()),
                role: state.role,
                loading: state.resolution.is_loading(),
            }
        };
        self.snapshot.send_replace(snap);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        // Reap completed handles before tracking a new one.
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Clear loading for the given attempt (error paths and signed-out
    /// finalization).
    fn finish(&self, ticket: Ticket) {
        self.lock().resolution.complete(ticket);
        self.publish();
    }

    /// Finalize the signed-out state: drop session and role, end the
    /// current attempt, and invalidate any still-running resolution work so
    /// a late result cannot resurrect the session.
    fn clear_session(&self) {
        {
            let mut state = self.lock();
            state.session = None;
            state.role = None;
            state.resolution.supersede();
        }
        self.publish();
    }
}

/// Start a new resolution attempt and arm its paired timeout.
fn begin_attempt(shared: &Arc<Shared>, after: Duration, label: &'static str) -> Ticket {
    let ticket = shared.lock().resolution.begin();
    shared.publish();
    let handle = spawn_expiry(Arc::clone(shared), ticket, after, label);
    shared.track(handle);
    ticket
}

/// Timer racing the real resolution: forces `loading=false` if the attempt
/// has not completed within `after`. Ticket-guarded, so a timer from a
/// superseded attempt is harmless, and cancellation stops it outright.
fn spawn_expiry(
    shared: Arc<Shared>,
    ticket: Ticket,
    after: Duration,
    label: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shared.cancel.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                let expired = shared.lock().resolution.expire(ticket);
                if expired {
                    tracing::warn!(label, timeout_ms = after.as_millis() as u64,
                        "resolution timed out, forcing loading off");
                    shared.publish();
                }
            }
        }
    })
}

/// Owns session and role state for the application.
///
/// Single writer: all mutations go through this context, on `init`, on
/// session-change notifications, or on the sign-in/up/out operations.
/// Readers observe [`AuthSnapshot`] through a watch channel.
pub struct SessionContext {
    store: Arc<dyn IdentityStore>,
    shared: Arc<Shared>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn IdentityStore>, timeouts: ResolverTimeouts) -> Self {
        let (snapshot, _) = watch::channel(AuthSnapshot::signed_out());
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                session: None,
                role: None,
                resolution: Resolution::new(),
            }),
            snapshot,
            timeouts,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        });
        Self { store, shared }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// First activation: probe connectivity, fetch the current session,
    /// resolve its role, and start listening for session changes.
    ///
    /// Never propagates an error; every branch terminates with
    /// `loading=false` within the safety bound.
    pub async fn init(&self) {
        tracing::info!("starting session initialization");
        let ticket = begin_attempt(
            &self.shared,
            self.shared.timeouts.init_safety,
            "initialization",
        );

        // Subscribe before any network call so a sign-in racing with init
        // is not missed.
        let events = self.store.subscribe();
        let listener = tokio::spawn(run_listener(
            Arc::clone(&self.store),
            Arc::clone(&self.shared),
            events,
        ));
        self.shared.track(listener);

        if let Err(err) = self.store.probe().await {
            // A known-down backend makes the session fetch pointless.
            tracing::error!(error = %err, "connectivity probe failed, finalizing signed out");
            self.shared.clear_session();
            return;
        }

        match self.store.current_session().await {
            Err(err) => {
                tracing::error!(error = %err, "session fetch failed, finalizing signed out");
                self.shared.clear_session();
            }
            Ok(None) => {
                tracing::info!("no existing session");
                self.shared.clear_session();
            }
            Ok(Some(session)) => {
                tracing::info!(identity = %session.identity, "session found");
                adopt_session(&self.store, &self.shared, ticket, session).await;
            }
        }
    }

    /// Sign in with password credentials.
    ///
    /// On success the resulting session-change notification is the sole
    /// authority for clearing `loading`; only the error path clears it here.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let ticket = begin_attempt(&self.shared, self.shared.timeouts.loading, "sign-in");
        tracing::info!(email, "signing in");
        match self.store.sign_in_with_password(email, password).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "sign in failed");
                self.shared.finish(ticket);
                Err(err)
            }
        }
    }

    /// Sign up, then attempt the compensating profile and default-role
    /// inserts the identity service does not perform on its own. Insert
    /// failures are logged, not fatal.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<NewIdentity, StoreError> {
        let ticket = begin_attempt(&self.shared, self.shared.timeouts.loading, "sign-up");
        tracing::info!(email, "signing up");
        let new_identity = match self.store.sign_up(email, password, full_name).await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::error!(error = %err, "sign up failed");
                self.shared.finish(ticket);
                return Err(err);
            }
        };

        if let Err(err) = self
            .store
            .insert_profile(new_identity.identity, full_name)
            .await
        {
            tracing::error!(identity = %new_identity.identity, error = %err,
                "failed to create profile record");
        }
        if let Err(err) = self.store.insert_role(new_identity.identity, Role::User).await {
            if err.is_conflict() {
                tracing::debug!(identity = %new_identity.identity, "role row already exists");
            } else {
                tracing::error!(identity = %new_identity.identity, error = %err,
                    "failed to create default user role");
            }
        }

        // Loading clears via the session-change notification (or the armed
        // timeout if the project requires email confirmation first).
        Ok(new_identity)
    }

    pub async fn sign_out(&self) -> Result<(), StoreError> {
        let ticket = begin_attempt(&self.shared, self.shared.timeouts.loading, "sign-out");
        tracing::info!("signing out");
        match self.store.sign_out().await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "sign out failed");
                self.shared.finish(ticket);
                Err(err)
            }
        }
    }

    /// Cancel all pending timers and the change listener. Idempotent; no
    /// timer or callback fires afterwards.
    pub fn teardown(&self) {
        tracing::info!("tearing down session context");
        self.shared.cancel.cancel();
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .expect("task list lock poisoned");
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Store the session as current and delegate to the role resolver, then
/// signal resolution-complete exactly once for this attempt.
async fn adopt_session(
    store: &Arc<dyn IdentityStore>,
    shared: &Arc<Shared>,
    ticket: Ticket,
    session: Session,
) {
    let identity = session.identity;
    {
        let mut state = shared.lock();
        state.session = Some(session);
    }
    shared.publish();

    let role = roles::resolve(store.as_ref(), identity).await;
    {
        let mut state = shared.lock();
        if state.resolution.current_ticket() != ticket {
            // A sign-out or newer attempt superseded this one while the
            // lookup ran; its result no longer applies.
            tracing::warn!(%identity, "discarding role from a superseded attempt");
            return;
        }
        state.role = Some(role);
        if !state.resolution.complete(ticket) {
            // Timed out: last-value-wins on the data, but the loading
            // flag stays down.
            tracing::warn!(%identity, "role resolved after attempt ended");
        }
    }
    shared.publish();
}

/// Consume session-change notifications until cancelled.
async fn run_listener(
    store: Arc<dyn IdentityStore>,
    shared: Arc<Shared>,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    loop {
        let event = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(SessionEvent::SignedIn(session)) | Ok(SessionEvent::TokenRefreshed(session)) => {
                tracing::info!(identity = %session.identity, "session change: signed in");
                // Reuse the in-flight attempt from sign_in/sign_up when
                // there is one, otherwise start (and bound) a fresh one.
                let ticket = {
                    let state = shared.lock();
                    if state.resolution.is_loading() {
                        Some(state.resolution.current_ticket())
                    } else {
                        None
                    }
                };
                let ticket = match ticket {
                    Some(t) => t,
                    None => begin_attempt(&shared, shared.timeouts.loading, "session change"),
                };
                // Adopt on its own task so a slow role lookup cannot block
                // the next notification, a sign-out in particular.
                let store = Arc::clone(&store);
                let task_shared = Arc::clone(&shared);
                let handle = tokio::spawn(async move {
                    tokio::select! {
                        _ = task_shared.cancel.cancelled() => {}
                        _ = adopt_session(&store, &task_shared, ticket, session) => {}
                    }
                });
                shared.track(handle);
            }
            Ok(SessionEvent::SignedOut) => {
                tracing::info!("session change: signed out");
                shared.clear_session();
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "session event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
