//! Session Client — login, logout, identity, refresh, and authorized calls.
//!
//! ARCHITECTURE
//! ============
//! The only component that talks to the backend about identity. Tokens go
//! through [`TokenStore`]; requests go through [`Transport`].
//!
//! Every authorized call runs the same small state machine:
//!
//! ```text
//! ATTEMPT --(non-401)--> DONE
//! ATTEMPT --(401)--> REFRESHING --(ok)--> RETRY --> DONE
//!                    REFRESHING --(fail)--> FAILED
//! ```
//!
//! RETRY always ends in DONE, whatever its status, so a call makes at most
//! one refresh and one retry. Concurrent calls that hit 401 together each
//! refresh on their own; the last saved pair wins, and every pair minted by a
//! valid refresh is itself valid.
//!
//! ERROR HANDLING
//! ==============
//! Rejected credentials, expired sessions, and unreachable backends are
//! outcome values. `Err` is reserved for malformed 2xx bodies and transport
//! failures on generic data calls.

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use super::error::SessionError;
use super::token_store::TokenStore;
use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use super::types::{
    ActionOutcome, LoginOutcome, LoginRequest, LoginResponse, MeResponse, RefreshOutcome, RefreshRequest,
    Resolution, TokenPair,
};
use crate::config::DashboardConfig;

pub(crate) const LOGIN_ENDPOINT: &str = "/auth/login";
pub(crate) const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub(crate) const ME_ENDPOINT: &str = "/auth/me";
pub(crate) const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub(crate) const FORGOT_PASSWORD_ENDPOINT: &str = "/auth/forgot-password";
pub(crate) const VERIFY_OTP_ENDPOINT: &str = "/auth/verify-otp";
pub(crate) const RESET_PASSWORD_ENDPOINT: &str = "/auth/reset-password";

const LOGIN_FAILED: &str = "Login failed";
const UNEXPECTED_FAILURE: &str = "An unexpected error occurred";
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";

/// Position in the refresh-and-retry sequence of one authorized call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Attempt,
    Refreshing,
    Retry,
    Done,
    Failed,
}

/// Terminal state of an authorized call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedCall {
    /// `Done` or `Failed`.
    pub phase: CallPhase,
    /// Last response seen. `None` only when the call started at
    /// `Refreshing` and the refresh failed.
    pub response: Option<ApiResponse>,
    pub refreshed: bool,
}

pub struct SessionClient {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
}

impl SessionClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self { transport, tokens }
    }

    /// Client against the configured backend over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &DashboardConfig, tokens: TokenStore) -> Result<Self, SessionError> {
        let transport = HttpTransport::new(config.api_base_url.clone(), config.timeouts)?;
        Ok(Self::new(Arc::new(transport), tokens))
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    // =========================================================================
    // LOGIN / LOGOUT
    // =========================================================================

    /// Exchange credentials for a user and a fresh token pair.
    ///
    /// Tokens are written only after a well-formed 2xx; a rejected or
    /// unreachable login leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only if a 2xx response body is malformed.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome, SessionError> {
        let request = ApiRequest::post(LOGIN_ENDPOINT, json_body(&LoginRequest { identifier, secret }));
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "login request failed");
                return Ok(LoginOutcome::Failure(UNEXPECTED_FAILURE.to_owned()));
            }
        };

        if !response.is_success() {
            tracing::debug!(status = response.status, "login rejected");
            let reason = response
                .error_message()
                .unwrap_or_else(|| LOGIN_FAILED.to_owned());
            return Ok(LoginOutcome::Failure(reason));
        }

        let parsed: LoginResponse = response
            .json()
            .map_err(|e| SessionError::malformed(LOGIN_ENDPOINT, &e))?;
        self.tokens.save(&parsed.tokens);
        tracing::info!(user_id = %parsed.user.id, "login succeeded");
        Ok(LoginOutcome::Success(parsed.user))
    }

    /// Tell the backend (best effort), then clear local tokens. Never fails.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.tokens.load().refresh_token {
            let body = json_body(&RefreshRequest { refresh_token: &refresh_token });
            match self
                .transport
                .send(&ApiRequest::post(LOGOUT_ENDPOINT, body))
                .await
            {
                Ok(response) if response.is_success() => {}
                Ok(response) => tracing::warn!(status = response.status, "logout notification rejected"),
                Err(e) => tracing::warn!(error = %e, "logout notification failed"),
            }
        }
        self.tokens.clear();
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    /// Turn stored tokens into a user.
    ///
    /// No tokens means [`Resolution::Anonymous`] with no network call. With
    /// only a refresh token the identity attempt is skipped and the call
    /// starts at `REFRESHING`. Anything short of a 2xx identity response
    /// after at most one refresh is [`Resolution::Expired`]. Tokens are not
    /// cleared here; that belongs to the session bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error only if a 2xx identity body is malformed.
    pub async fn resolve_current_user(&self) -> Result<Resolution, SessionError> {
        let stored = self.tokens.load();
        if stored.is_empty() {
            return Ok(Resolution::Anonymous);
        }

        let start = if stored.access_token.is_some() { CallPhase::Attempt } else { CallPhase::Refreshing };
        let call = match self.run(&ApiRequest::get(ME_ENDPOINT), start).await {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "identity lookup failed");
                return Ok(Resolution::Expired);
            }
        };

        match call.response {
            Some(response) if call.phase == CallPhase::Done && response.is_success() => {
                let me: MeResponse = response
                    .json()
                    .map_err(|e| SessionError::malformed(ME_ENDPOINT, &e))?;
                Ok(Resolution::Authenticated(me.user))
            }
            response => {
                tracing::debug!(status = ?response.map(|r| r.status), phase = ?call.phase, "session unresolved");
                Ok(Resolution::Expired)
            }
        }
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Trade the stored refresh token for a new pair.
    ///
    /// Fails fast without a network call when no refresh token is stored.
    /// Does not clear tokens on failure.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.tokens.load().refresh_token else {
            tracing::debug!("refresh skipped: no refresh token");
            return RefreshOutcome::Failed;
        };

        let body = json_body(&RefreshRequest { refresh_token: &refresh_token });
        match self
            .transport
            .send(&ApiRequest::post(REFRESH_ENDPOINT, body))
            .await
        {
            Ok(response) if response.is_success() => match response.json::<TokenPair>() {
                Ok(pair) => {
                    self.tokens.save(&pair);
                    tracing::debug!("token pair refreshed");
                    RefreshOutcome::Refreshed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "refresh response malformed");
                    RefreshOutcome::Failed
                }
            },
            Ok(response) => {
                tracing::debug!(status = response.status, "refresh rejected");
                RefreshOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh request failed");
                RefreshOutcome::Failed
            }
        }
    }

    // =========================================================================
    // AUTHORIZED CALLS
    // =========================================================================

    /// Send `request` with the stored bearer token, refreshing and retrying
    /// once on 401.
    ///
    /// When the refresh fails the caller gets the original 401 response.
    /// Failures never clear tokens or force navigation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    pub async fn authenticated_request(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let call = self.run(&request, CallPhase::Attempt).await?;
        Ok(call
            .response
            .unwrap_or_else(|| ApiResponse::new(401, String::new())))
    }

    /// Drive one call through the refresh-and-retry state machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable during ATTEMPT or RETRY.
    pub async fn run(&self, request: &ApiRequest, start: CallPhase) -> Result<AuthorizedCall, SessionError> {
        let mut phase = start;
        let mut response = None;
        let mut refreshed = false;

        loop {
            phase = match phase {
                CallPhase::Attempt => {
                    let first = self.send_authorized(request).await?;
                    let next = if first.is_unauthorized() { CallPhase::Refreshing } else { CallPhase::Done };
                    response = Some(first);
                    next
                }
                CallPhase::Refreshing => match self.refresh().await {
                    RefreshOutcome::Refreshed => {
                        refreshed = true;
                        CallPhase::Retry
                    }
                    RefreshOutcome::Failed => CallPhase::Failed,
                },
                CallPhase::Retry => {
                    response = Some(self.send_authorized(request).await?);
                    CallPhase::Done
                }
                CallPhase::Done | CallPhase::Failed => break,
            };
            tracing::trace!(endpoint = %request.endpoint, ?phase, "call phase");
        }

        Ok(AuthorizedCall { phase, response, refreshed })
    }

    async fn send_authorized(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        let authorized = request
            .clone()
            .with_bearer(self.tokens.load().access_token);
        self.transport.send(&authorized).await
    }

    // =========================================================================
    // PASSWORD RECOVERY
    // =========================================================================

    /// Ask the backend to email a one-time reset code.
    pub async fn request_password_reset(&self, email: &str) -> ActionOutcome {
        self.account_action(FORGOT_PASSWORD_ENDPOINT, json!({ "org_email": email }))
            .await
    }

    /// Check a one-time reset code.
    pub async fn verify_otp(&self, otp: &str) -> ActionOutcome {
        self.account_action(VERIFY_OTP_ENDPOINT, json!({ "OTP": otp }))
            .await
    }

    /// Set a new password using a verified reset code.
    pub async fn reset_password(&self, email: &str, otp: &str, new_password: &str) -> ActionOutcome {
        let body = json!({ "email": email, "otp": otp, "newPassword": new_password });
        self.account_action(RESET_PASSWORD_ENDPOINT, body).await
    }

    async fn account_action(&self, endpoint: &str, body: Value) -> ActionOutcome {
        match self.transport.send(&ApiRequest::post(endpoint, body)).await {
            Ok(response) if response.is_success() => ActionOutcome::Done,
            Ok(response) if response.status == 429 => ActionOutcome::Failed(TOO_MANY_REQUESTS.to_owned()),
            Ok(response) => {
                tracing::debug!(endpoint, status = response.status, "account action rejected");
                ActionOutcome::Failed(
                    response
                        .error_message()
                        .unwrap_or_else(|| GENERIC_FAILURE.to_owned()),
                )
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "account action failed");
                ActionOutcome::Failed(UNEXPECTED_FAILURE.to_owned())
            }
        }
    }
}

fn json_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}
