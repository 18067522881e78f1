//! Session Context — the process-wide view of who is signed in.
//!
//! DESIGN
//! ======
//! An explicitly owned object, built at app start and passed by reference
//! to whatever needs it. State is published through a `watch` channel so
//! guards can wait for the first resolved snapshot. The context caches what
//! the token store implies and is rebuilt from scratch on every start.
//!
//! After [`SessionContext::teardown`] no completion may publish state, so a
//! request that resolves after navigation away is dropped on the floor.
//!
//! Every login, logout, and refresh bumps a generation counter. A bootstrap
//! that finishes after one of those has published is stale: it neither
//! publishes nor clears tokens.

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::client::SessionClient;
use super::error::SessionError;
use super::types::{LoginOutcome, RefreshOutcome, Resolution, User};

/// Point-in-time session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    /// True only while the initial resolution is in flight.
    pub loading: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn resolved(user: Option<User>) -> Self {
        Self { user, loading: false }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Clone)]
pub struct SessionContext {
    client: Arc<SessionClient>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    alive: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl SessionContext {
    /// New context in the loading state. Call [`Self::initialize`] next.
    #[must_use]
    pub fn new(client: Arc<SessionClient>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::loading());
        Self {
            client,
            state: Arc::new(state),
            alive: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop publishing. Pending completions become no-ops.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Resolve stored tokens into a user and leave the loading state.
    ///
    /// The one place that treats an unresolvable session as dead: tokens are
    /// cleared when they exist but cannot be resolved, and unexpected errors
    /// degrade to "signed out".
    pub async fn initialize(&self) {
        let started = self.generation.load(Ordering::SeqCst);
        let resolved = self.client.resolve_current_user().await;
        if self.generation.load(Ordering::SeqCst) != started {
            tracing::debug!("dropping stale session bootstrap");
            return;
        }
        let user = match resolved {
            Ok(Resolution::Authenticated(user)) => Some(user),
            Ok(Resolution::Anonymous) => None,
            Ok(Resolution::Expired) => {
                tracing::info!("stored session is no longer valid; signing out");
                self.client.tokens().clear();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "session bootstrap failed; signing out");
                self.client.tokens().clear();
                None
            }
        };
        self.client.tokens().sync_flag();
        self.publish(SessionSnapshot::resolved(user));
    }

    /// Run [`Self::initialize`] on the runtime.
    #[must_use]
    pub fn spawn_initialize(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move { ctx.initialize().await })
    }

    // =========================================================================
    // PASS-THROUGHS
    // =========================================================================

    /// Log in and publish the user on success.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionClient::login`] errors (malformed 2xx only).
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome, SessionError> {
        let outcome = self.client.login(identifier, secret).await?;
        if let LoginOutcome::Success(user) = &outcome {
            self.publish_newer(SessionSnapshot::resolved(Some(user.clone())));
        }
        Ok(outcome)
    }

    /// Log out. Always ends signed out.
    pub async fn logout(&self) {
        self.client.logout().await;
        self.publish_newer(SessionSnapshot::resolved(None));
    }

    /// Rotate tokens and re-resolve the user.
    pub async fn refresh(&self) -> RefreshOutcome {
        let outcome = self.client.refresh().await;
        if outcome == RefreshOutcome::Refreshed {
            match self.client.resolve_current_user().await {
                Ok(resolution) => {
                    self.publish_newer(SessionSnapshot::resolved(resolution.into_user()));
                }
                Err(e) => tracing::warn!(error = %e, "user lookup after refresh failed"),
            }
        }
        outcome
    }

    /// Publish and mark any bootstrap still in flight as stale.
    fn publish_newer(&self, snapshot: SessionSnapshot) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.publish(snapshot)
    }

    fn publish(&self, snapshot: SessionSnapshot) -> bool {
        if !self.is_alive() {
            tracing::debug!("dropping session update for torn-down context");
            return false;
        }
        self.state.send_replace(snapshot);
        true
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("snapshot", &*self.state.borrow())
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}
