//! Test doubles shared by the unit tests in this crate

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

use sppg_api::{ApiRequest, ApiResponse, Transport, TransportError};
use sppg_storage::{Database, KeyValueStore};

use crate::manager::SessionManager;
use crate::user::User;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport that answers through a closure and records every request.
/// Each call yields once so concurrent callers interleave.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Transport whose server is never reachable.
    pub fn offline() -> Arc<Self> {
        Self::new(|_| Err(TransportError::Connect("connection refused".to_string())))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

pub fn ok(body: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16, body: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(code, body))
}

pub fn make_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn sample_user_json() -> Value {
    json!({
        "id": "u1",
        "username": "admin1",
        "role": "admin",
        "name": "Admin Satu",
        "sppgId": null,
        "schoolId": null
    })
}

pub fn sample_user() -> User {
    serde_json::from_value(sample_user_json()).unwrap()
}

pub fn manager_with(transport: Arc<MockTransport>) -> (SessionManager, Database) {
    let db = Database::open_in_memory().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(db.clone());
    (SessionManager::new(store, transport), db)
}
