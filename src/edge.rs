//! Edge Router — coarse cookie-based gate run before any page code.
//!
//! DESIGN
//! ======
//! Sees only request-time cookies, never the token store itself. A protected
//! path with no token cookie and no advisory `hasTokens` flag goes to login;
//! a public path with a real token cookie goes to the landing page. Anything
//! else passes through. This is a redirect heuristic and not an authorization
//! boundary: the route guard and the backend re-check every request.
//!
//! Paths match a prefix on a segment boundary, so `/login` covers
//! `/login/otp` but not `/loginx`.

#[cfg(test)]
#[path = "edge_test.rs"]
mod tests;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::config::DashboardConfig;
use crate::session::token_store::{ACCESS_TOKEN_KEY, ADVISORY_COOKIE_NAME, REFRESH_TOKEN_KEY};

/// Prefixes the gate never touches: backend proxies, assets, health checks.
pub const BYPASS_PREFIXES: &[&str] = &["/api", "/pkg", "/assets", "/images", "/public", "/favicon.ico", "/healthz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Bypass,
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    Pass,
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRouter {
    public_prefixes: Vec<String>,
    bypass_prefixes: Vec<String>,
    login_path: String,
    landing_path: String,
}

impl EdgeRouter {
    #[must_use]
    pub fn new(public_prefixes: Vec<String>, login_path: impl Into<String>, landing_path: impl Into<String>) -> Self {
        Self {
            public_prefixes,
            bypass_prefixes: BYPASS_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
            login_path: login_path.into(),
            landing_path: landing_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.public_paths.clone(), config.login_path.clone(), config.landing_path.clone())
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> PathClass {
        if self.bypass_prefixes.iter().any(|p| has_prefix(path, p)) {
            PathClass::Bypass
        } else if self.public_prefixes.iter().any(|p| has_prefix(path, p)) {
            PathClass::Public
        } else {
            PathClass::Protected
        }
    }

    #[must_use]
    pub fn decide(&self, path: &str, cookies: &CookieJar) -> EdgeDecision {
        let has_token = cookie_present(cookies, ACCESS_TOKEN_KEY) || cookie_present(cookies, REFRESH_TOKEN_KEY);
        match self.classify(path) {
            PathClass::Bypass => EdgeDecision::Pass,
            PathClass::Public if has_token => EdgeDecision::Redirect(self.landing_path.clone()),
            PathClass::Protected if !has_token && !advisory_flag(cookies) => {
                EdgeDecision::Redirect(self.login_path.clone())
            }
            PathClass::Public | PathClass::Protected => EdgeDecision::Pass,
        }
    }
}

/// Axum middleware applying [`EdgeRouter::decide`] to every request.
pub async fn edge_gate(
    State(router): State<Arc<EdgeRouter>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    match router.decide(request.uri().path(), &jar) {
        EdgeDecision::Pass => next.run(request).await,
        EdgeDecision::Redirect(target) => {
            tracing::debug!(path = %request.uri().path(), %target, "edge redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

pub(crate) fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn cookie_present(jar: &CookieJar, name: &str) -> bool {
    jar.get(name).is_some_and(|c| !c.value().is_empty())
}

fn advisory_flag(jar: &CookieJar) -> bool {
    jar.get(ADVISORY_COOKIE_NAME)
        .and_then(|c| crate::config::parse_bool(c.value()))
        .unwrap_or(false)
}
