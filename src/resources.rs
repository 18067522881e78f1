//! Resources — CRUD over the backend's data collections.
//!
//! DESIGN
//! ======
//! Every call goes through [`SessionClient::authenticated_request`], so an
//! expired access token is refreshed and the call retried once. A response
//! that is still not 2xx becomes [`SessionError::Status`]; it never clears
//! the session.

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::records::{Record, RecordError};
use crate::session::SessionClient;
use crate::session::error::SessionError;
use crate::session::transport::{ApiRequest, ApiResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Payments,
    Reports,
}

impl Resource {
    pub const ALL: [Self; 3] = [Self::Users, Self::Payments, Self::Reports];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Users => "/users",
            Self::Payments => "/payments",
            Self::Reports => "/reports",
        }
    }

    fn item_path(self, id: &str) -> String {
        format!("{}/{id}", self.path())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|r| r.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown resource '{s}' (expected users, payments, or reports)"))
    }
}

pub struct ResourceClient {
    session: Arc<SessionClient>,
}

impl ResourceClient {
    #[must_use]
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    /// # Errors
    ///
    /// Fails if the backend is unreachable, answers non-2xx, or sends
    /// something other than an array of objects.
    pub async fn list(&self, resource: Resource) -> Result<Vec<Record>, SessionError> {
        let endpoint = resource.path();
        let body = self.call(ApiRequest::get(endpoint)).await?;
        Record::list_from_json(&body).map_err(|e| malformed_record(endpoint, &e))
    }

    /// # Errors
    ///
    /// See [`ResourceClient::list`].
    pub async fn fetch(&self, resource: Resource, id: &str) -> Result<Record, SessionError> {
        let endpoint = resource.item_path(id);
        let body = self.call(ApiRequest::get(&endpoint)).await?;
        Record::from_json(&body).map_err(|e| malformed_record(&endpoint, &e))
    }

    /// Create a row and return it as stored by the backend.
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::list`].
    pub async fn create(&self, resource: Resource, fields: Value) -> Result<Record, SessionError> {
        let endpoint = resource.path();
        let body = self.call(ApiRequest::post(endpoint, fields)).await?;
        Record::from_json(&body).map_err(|e| malformed_record(endpoint, &e))
    }

    /// Replace the row `id` with `record` (its id field is not sent).
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::list`].
    pub async fn update(&self, resource: Resource, id: &str, record: &Record) -> Result<Record, SessionError> {
        let endpoint = resource.item_path(id);
        let body = self
            .call(ApiRequest::put(&endpoint, record.to_write_body()))
            .await?;
        Record::from_json(&body).map_err(|e| malformed_record(&endpoint, &e))
    }

    /// # Errors
    ///
    /// Fails if the backend is unreachable or answers non-2xx.
    pub async fn delete(&self, resource: Resource, id: &str) -> Result<(), SessionError> {
        let endpoint = resource.item_path(id);
        let response = self
            .session
            .authenticated_request(ApiRequest::delete(&endpoint))
            .await?;
        ensure_success(&endpoint, &response)
    }

    async fn call(&self, request: ApiRequest) -> Result<Value, SessionError> {
        let endpoint = request.endpoint.clone();
        let response = self.session.authenticated_request(request).await?;
        ensure_success(&endpoint, &response)?;
        response
            .json()
            .map_err(|e| SessionError::malformed(&endpoint, &e))
    }
}

fn ensure_success(endpoint: &str, response: &ApiResponse) -> Result<(), SessionError> {
    if response.is_success() {
        return Ok(());
    }
    tracing::debug!(endpoint, status = response.status, "resource call rejected");
    Err(SessionError::Status { endpoint: endpoint.to_owned(), status: response.status })
}

fn malformed_record(endpoint: &str, err: &RecordError) -> SessionError {
    SessionError::MalformedResponse { endpoint: endpoint.to_owned(), reason: err.to_string() }
}
