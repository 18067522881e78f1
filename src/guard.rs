//! Route Guard — decides whether a protected screen may render.
//!
//! DESIGN
//! ======
//! The guard reads a [`SessionSnapshot`] and nothing else. While the session
//! is loading it stays in `Checking`, which renders a neutral placeholder:
//! protected content and a redirect are never produced for the same
//! snapshot. Once loading ends the decision is terminal:
//!
//! 1. no user → login path
//! 2. allowed roles given and the user's role is not among them → that
//!    role's default screen
//! 3. otherwise → allowed

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

use tokio::sync::watch;

use crate::config::DashboardConfig;
use crate::session::SessionSnapshot;

pub const EMPLOYEE_ROLE: &str = "employee";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Allowed,
    RedirectLogin(String),
    RedirectRoleDefault(String),
}

impl GuardState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Checking)
    }
}

/// What the wrapped screen should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    Loading,
    Children,
    Redirect(String),
}

impl From<GuardState> for Render {
    fn from(state: GuardState) -> Self {
        match state {
            GuardState::Checking => Self::Loading,
            GuardState::Allowed => Self::Children,
            GuardState::RedirectLogin(path) | GuardState::RedirectRoleDefault(path) => Self::Redirect(path),
        }
    }
}

// =============================================================================
// ROLE DEFAULTS
// =============================================================================

/// Role → default screen. Unknown roles land on the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefaults {
    fallback: String,
    by_role: Vec<(String, String)>,
}

impl RoleDefaults {
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self { fallback: fallback.into(), by_role: Vec::new() }
    }

    #[must_use]
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.landing_path.clone())
            .with_role(ADMIN_ROLE, config.landing_path.clone())
            .with_role(EMPLOYEE_ROLE, config.employee_default_path.clone())
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, path: impl Into<String>) -> Self {
        let role = role.into();
        self.by_role.retain(|(r, _)| !r.eq_ignore_ascii_case(&role));
        self.by_role.push((role, path.into()));
        self
    }

    #[must_use]
    pub fn path_for(&self, role: &str) -> &str {
        self.by_role
            .iter()
            .find(|(r, _)| r.eq_ignore_ascii_case(role))
            .map_or(self.fallback.as_str(), |(_, path)| path.as_str())
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    allowed_roles: Option<Vec<String>>,
    login_path: String,
    role_defaults: RoleDefaults,
}

impl RouteGuard {
    /// Guard that admits any signed-in user.
    #[must_use]
    pub fn new(login_path: impl Into<String>, role_defaults: RoleDefaults) -> Self {
        Self { allowed_roles: None, login_path: login_path.into(), role_defaults }
    }

    #[must_use]
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.login_path.clone(), RoleDefaults::from_config(config))
    }

    /// Restrict the guarded screen to the given roles (case-insensitive).
    #[must_use]
    pub fn allow_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn evaluate(&self, snapshot: &SessionSnapshot) -> GuardState {
        if snapshot.loading {
            return GuardState::Checking;
        }
        let Some(user) = &snapshot.user else {
            return GuardState::RedirectLogin(self.login_path.clone());
        };
        if let Some(allowed) = &self.allowed_roles {
            if !allowed.iter().any(|role| user.has_role(role)) {
                tracing::debug!(user_id = %user.id, role = %user.role, "role not permitted");
                return GuardState::RedirectRoleDefault(self.role_defaults.path_for(&user.role).to_owned());
            }
        }
        GuardState::Allowed
    }

    #[must_use]
    pub fn render(&self, snapshot: &SessionSnapshot) -> Render {
        self.evaluate(snapshot).into()
    }

    /// Wait for the session to finish loading, then decide.
    ///
    /// Stays `Checking` if the session publisher goes away first.
    pub async fn wait(&self, mut session: watch::Receiver<SessionSnapshot>) -> GuardState {
        let resolved = session
            .wait_for(|snapshot| !snapshot.loading)
            .await
            .map(|snapshot| snapshot.clone());
        match resolved {
            Ok(snapshot) => self.evaluate(&snapshot),
            Err(_) => GuardState::Checking,
        }
    }
}
