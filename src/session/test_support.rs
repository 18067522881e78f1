//! In-process fake backend for session tests.
//!
//! Models the `/auth/*` contract closely enough to exercise refresh-and-retry:
//! every login or refresh mints a new token generation and invalidates the
//! previous one. Data routes require the current access token.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::Notify;

use super::client::{
    FORGOT_PASSWORD_ENDPOINT, LOGIN_ENDPOINT, LOGOUT_ENDPOINT, ME_ENDPOINT, REFRESH_ENDPOINT,
    RESET_PASSWORD_ENDPOINT, VERIFY_OTP_ENDPOINT,
};
use super::error::SessionError;
use super::token_store::{MemoryFlag, MemoryStorage, TokenStore};
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use super::types::TokenPair;

pub(crate) const IDENTIFIER: &str = "admin@example.com";
pub(crate) const SECRET: &str = "password123";

struct BackendState {
    user: Value,
    generation: u32,
    access_valid: bool,
    refresh_valid: bool,
    offline: bool,
    logout_offline: bool,
    scripted: HashMap<String, VecDeque<ApiResponse>>,
    collections: HashMap<String, Vec<Value>>,
    calls: Vec<ApiRequest>,
}

pub(crate) struct MockBackend {
    state: Mutex<BackendState>,
    identity_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_user(json!({ "_id": "u-admin", "name": "Admin", "org_email": IDENTIFIER, "role": "admin" }))
    }

    pub(crate) fn with_user(user: Value) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BackendState {
                user,
                generation: 0,
                access_valid: false,
                refresh_valid: false,
                offline: false,
                logout_offline: false,
                scripted: HashMap::new(),
                collections: HashMap::new(),
                calls: Vec::new(),
            }),
            identity_gate: Mutex::new(None),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().expect("mock backend mutex should lock")
    }

    /// Mint a fresh pair as if the user had logged in elsewhere.
    pub(crate) fn issue(&self) -> TokenPair {
        let mut state = self.lock();
        mint(&mut state)
    }

    pub(crate) fn expire_access(&self) {
        self.lock().access_valid = false;
    }

    pub(crate) fn revoke_refresh(&self) {
        self.lock().refresh_valid = false;
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub(crate) fn fail_logout(&self) {
        self.lock().logout_offline = true;
    }

    /// Queue a canned response for the next call to `endpoint`.
    pub(crate) fn script(&self, endpoint: &str, response: ApiResponse) {
        self.lock()
            .scripted
            .entry(endpoint.to_owned())
            .or_default()
            .push_back(response);
    }

    pub(crate) fn seed(&self, collection: &str, rows: Vec<Value>) {
        self.lock().collections.insert(collection.to_owned(), rows);
    }

    /// Hold identity lookups until the returned notifier fires.
    pub(crate) fn gate_identity(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.identity_gate.lock().expect("gate mutex should lock") = Some(gate.clone());
        gate
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    pub(crate) fn calls(&self) -> Vec<ApiRequest> {
        self.lock().calls.clone()
    }

    pub(crate) fn current_pair(&self) -> TokenPair {
        let state = self.lock();
        pair_for(state.generation)
    }

    fn respond(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        let mut state = self.lock();
        state.calls.push(request.clone());

        if state.offline || (request.endpoint == LOGOUT_ENDPOINT && state.logout_offline) {
            return Err(SessionError::Transport("connection refused".into()));
        }
        if let Some(canned) = state
            .scripted
            .get_mut(&request.endpoint)
            .and_then(VecDeque::pop_front)
        {
            return Ok(canned);
        }

        let body = request.body.clone().unwrap_or(Value::Null);
        let response = match (request.method, request.endpoint.as_str()) {
            (Method::Post, LOGIN_ENDPOINT) => {
                if body["identifier"] == IDENTIFIER && body["secret"] == SECRET {
                    let pair = mint(&mut state);
                    ok(json!({ "user": state.user, "accessToken": pair.access_token, "refreshToken": pair.refresh_token }))
                } else {
                    ApiResponse::new(401, json!({ "message": "Invalid credentials" }).to_string())
                }
            }
            (Method::Post, REFRESH_ENDPOINT) => {
                let current = pair_for(state.generation);
                if state.refresh_valid && body["refreshToken"] == current.refresh_token.as_str() {
                    let pair = mint(&mut state);
                    ok(json!({ "accessToken": pair.access_token, "refreshToken": pair.refresh_token }))
                } else {
                    ApiResponse::new(401, json!({ "message": "Invalid refresh token" }).to_string())
                }
            }
            (Method::Post, LOGOUT_ENDPOINT) => {
                state.refresh_valid = false;
                state.access_valid = false;
                ok(json!({ "message": "Logged out" }))
            }
            (Method::Post, FORGOT_PASSWORD_ENDPOINT | VERIFY_OTP_ENDPOINT | RESET_PASSWORD_ENDPOINT) => {
                ok(json!({ "message": "ok" }))
            }
            _ if !authorized(&state, request) => ApiResponse::new(401, json!({ "message": "jwt expired" }).to_string()),
            (Method::Get, ME_ENDPOINT) => ok(json!({ "user": state.user })),
            (method, endpoint) => data_route(&mut state, method, endpoint, body),
        };
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Transport for MockBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        if request.endpoint == ME_ENDPOINT {
            let gate = self.identity_gate.lock().expect("gate mutex should lock").clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
        }
        self.respond(request)
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn pair_for(generation: u32) -> TokenPair {
    TokenPair { access_token: format!("access-{generation}"), refresh_token: format!("refresh-{generation}") }
}

fn mint(state: &mut BackendState) -> TokenPair {
    state.generation += 1;
    state.access_valid = true;
    state.refresh_valid = true;
    pair_for(state.generation)
}

fn authorized(state: &BackendState, request: &ApiRequest) -> bool {
    let current = pair_for(state.generation);
    state.access_valid && request.bearer.as_deref() == Some(current.access_token.as_str())
}

fn data_route(state: &mut BackendState, method: Method, endpoint: &str, body: Value) -> ApiResponse {
    let mut segments = endpoint.trim_start_matches('/').splitn(2, '/');
    let collection = segments.next().unwrap_or_default().to_owned();
    let id = segments.next().map(str::to_owned);
    let rows = state.collections.entry(collection).or_default();

    match (method, id) {
        (Method::Get, None) => ok(Value::Array(rows.clone())),
        (Method::Get, Some(id)) => match rows.iter().find(|r| r["_id"] == id.as_str()) {
            Some(row) => ok(row.clone()),
            None => ApiResponse::new(404, json!({ "message": "not found" }).to_string()),
        },
        (Method::Post, None) => {
            let mut row = body;
            row["_id"] = json!(format!("new-{}", rows.len() + 1));
            rows.push(row.clone());
            ApiResponse::new(201, row.to_string())
        }
        (Method::Put | Method::Patch, Some(id)) => match rows.iter_mut().find(|r| r["_id"] == id.as_str()) {
            Some(row) => {
                if let (Some(target), Some(patch)) = (row.as_object_mut(), body.as_object()) {
                    for (k, v) in patch {
                        if k != "id" {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                }
                ok(row.clone())
            }
            None => ApiResponse::new(404, json!({ "message": "not found" }).to_string()),
        },
        (Method::Delete, Some(id)) => {
            let before = rows.len();
            rows.retain(|r| r["_id"] != id.as_str());
            if rows.len() < before {
                ok(json!({ "message": "deleted" }))
            } else {
                ApiResponse::new(404, json!({ "message": "not found" }).to_string())
            }
        }
        _ => ApiResponse::new(405, String::new()),
    }
}

/// Token store plus its flag, for asserting advisory-flag effects.
pub(crate) fn memory_store() -> (TokenStore, Arc<MemoryFlag>) {
    let flag = Arc::new(MemoryFlag::default());
    (TokenStore::new(Arc::new(MemoryStorage::default()), flag.clone()), flag)
}
