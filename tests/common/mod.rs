//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use authgate::auth::{
    AuthService, Clock, LoginRequest, ManualClock, MemorySessionStore, Role, SessionManager,
    SessionRecord, SessionStore, SessionStoreError, StaticUserDirectory, StoredSession,
    SubscriptionStatus, TokenService, UserRecord,
};

pub const SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const PRIVATE_PEM: &str = include_str!("../fixtures/rsa_private.pem");
pub const RETIRED_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_retired_private.pem");
pub const RETIRED_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_retired_public.pem");

/// Memory store that records every delete it is asked to perform
#[derive(Clone)]
pub struct RecordingStore {
    pub inner: MemorySessionStore,
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl RecordingStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemorySessionStore::new(clock),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn create_session(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.inner.create_session(session_id, record, ttl).await
    }

    async fn read_session(&self, session_id: &str) -> Result<StoredSession, SessionStoreError> {
        self.inner.read_session(session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.deleted.lock().unwrap().push(session_id.to_string());
        self.inner.delete_session(session_id).await
    }
}

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub store: RecordingStore,
    pub clock: Arc<ManualClock>,
}

pub fn user(id: i64, email: &str, password: &str, role: Role, status: SubscriptionStatus) -> UserRecord {
    UserRecord {
        id,
        name: email.to_string(),
        email: email.to_string(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
        role,
        subscription_status: status,
    }
}

/// alice: member with an active subscription; root: admin; bob: inactive member
pub fn default_users() -> Vec<UserRecord> {
    vec![
        user(2, "alice", "correct-pw", Role::Member, SubscriptionStatus::Active),
        user(1, "root", "root-pw", Role::Admin, SubscriptionStatus::Active),
        user(3, "bob", "bob-pw", Role::Member, SubscriptionStatus::Inactive),
    ]
}

pub fn harness_with(tokens: impl FnOnce(Arc<ManualClock>) -> TokenService) -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = RecordingStore::new(clock.clone());
    let manager = SessionManager::new(
        tokens(clock.clone()),
        Arc::new(store.clone()),
        Arc::new(StaticUserDirectory::new(default_users())),
        clock.clone(),
    );
    Harness {
        manager: Arc::new(manager),
        store,
        clock,
    }
}

pub fn harness() -> Harness {
    harness_with(|clock| TokenService::shared_secret(SECRET, clock).unwrap())
}

impl Harness {
    pub async fn login(&self, username: &str, password: &str) -> String {
        self.manager
            .login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap()
            .access_token
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token)
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
