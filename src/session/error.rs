//! Session-layer error types.
//!
//! Only unexpected conditions live here. Rejected credentials and expired
//! sessions are outcome values in [`super::types`].

/// Unexpected failures while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("backend request failed: {0}")]
    Transport(String),

    /// A 2xx response whose body did not match the contract.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// A non-success status where the caller required success.
    #[error("backend returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl SessionError {
    pub(crate) fn malformed(endpoint: &str, err: &serde_json::Error) -> Self {
        Self::MalformedResponse { endpoint: endpoint.to_owned(), reason: err.to_string() }
    }
}

/// Failures of a token storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token storage unavailable: {0}")]
    Unavailable(String),

    #[error("token storage io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
