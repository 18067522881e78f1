//! Session DTOs and outcome values.
//!
//! DESIGN
//! ======
//! Wire types mirror the backend `/auth/*` contract. Outcome enums carry the
//! expected failures (bad credentials, expired session) as values so callers
//! never have to treat "not signed in" as an error.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// USER
// =============================================================================

/// Signed-in dashboard user as returned by the backend.
///
/// Replaced wholesale on login, refresh, and logout; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier. Mongo-style `_id` is accepted as well.
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "org_email")]
    pub email: String,
    /// Authorization role, e.g. `"admin"` or `"employee"`. Empty when the
    /// backend does not send one.
    #[serde(default)]
    pub role: String,
    /// Remaining profile fields (phone, waiting flag, ...), kept verbatim.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

// =============================================================================
// TOKENS
// =============================================================================

/// A complete access/refresh pair. Always written together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Whatever the token store currently holds. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<TokenPair> for StoredTokens {
    fn from(pair: TokenPair) -> Self {
        Self { access_token: Some(pair.access_token), refresh_token: Some(pair.refresh_token) }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub identifier: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeResponse {
    pub user: User,
}

/// Error body shape shared by the backend's 4xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a login attempt. Failure carries a reason fit for a form error.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(User),
    Failure(String),
}

/// Result of resolving the stored tokens into a user.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Authenticated(User),
    /// No tokens were stored; nothing was sent to the backend.
    Anonymous,
    /// Tokens were stored but could not be resolved, even after one refresh.
    Expired,
}

impl Resolution {
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous | Self::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Failed,
}

/// Result of a fire-and-report account action such as a password reset step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Failed(String),
}
