//! Session store contract and in-memory implementation
//!
//! A session record lives under its session id as a small field map
//! (`subjectId`, `role`, `subscriptionStatus`, `name`, `email`) with an expiry.
//! Older deployments stored only the subject id as a plain string; reads
//! report that shape as [`StoredSession::LegacyScalar`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use super::clock::Clock;
use super::models::SessionRecord;

pub const FIELD_SUBJECT_ID: &str = "subjectId";
pub const FIELD_ROLE: &str = "role";
pub const FIELD_SUBSCRIPTION_STATUS: &str = "subscriptionStatus";
pub const FIELD_NAME: &str = "name";
pub const FIELD_EMAIL: &str = "email";

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("session not found")]
    NotFound,

    #[error("session ttl must be positive")]
    InvalidTtl,

    #[error("corrupt session record: {0}")]
    Corrupt(String),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// What a read found under a session id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    Structured(SessionRecord),
    /// Bare subject id written by an older deployment
    LegacyScalar(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write the record and its expiry in one step, replacing any previous value
    async fn create_session(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn read_session(&self, session_id: &str) -> Result<StoredSession, SessionStoreError>;

    /// Deleting an absent session is not an error
    async fn delete_session(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

impl SessionRecord {
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_SUBJECT_ID, self.subject_id.to_string()),
            (FIELD_ROLE, self.role.to_string()),
            (FIELD_SUBSCRIPTION_STATUS, self.subscription_status.to_string()),
            (FIELD_NAME, self.name.clone().unwrap_or_default()),
            (FIELD_EMAIL, self.email.clone().unwrap_or_default()),
        ]
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, SessionStoreError> {
        let field = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| SessionStoreError::Corrupt(format!("missing field {}", name)))
        };

        let subject_id = field(FIELD_SUBJECT_ID)?
            .parse::<i64>()
            .map_err(|e| SessionStoreError::Corrupt(format!("{}: {}", FIELD_SUBJECT_ID, e)))?;
        let role = field(FIELD_ROLE)?
            .parse()
            .map_err(SessionStoreError::Corrupt)?;
        let subscription_status = field(FIELD_SUBSCRIPTION_STATUS)?
            .parse()
            .map_err(SessionStoreError::Corrupt)?;

        let optional = |name: &str| fields.get(name).filter(|v| !v.is_empty()).cloned();

        Ok(Self {
            subject_id,
            role,
            subscription_status,
            name: optional(FIELD_NAME),
            email: optional(FIELD_EMAIL),
        })
    }
}

#[derive(Debug, Clone)]
enum StoredValue {
    Fields(HashMap<String, String>),
    Scalar(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: DateTime<Utc>,
}

/// Session store for single-process deployments and tests
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Store a bare subject id the way older deployments did
    pub async fn insert_legacy(
        &self,
        session_id: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let expires_at = self.expiry(ttl)?;
        self.sessions.write().await.insert(
            session_id.to_string(),
            Entry {
                value: StoredValue::Scalar(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    /// Number of unexpired sessions
    pub async fn session_count(&self) -> usize {
        let now = self.clock.now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, SessionStoreError> {
        if ttl.is_zero() {
            return Err(SessionStoreError::InvalidTtl);
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| SessionStoreError::InvalidTtl)?;
        Ok(self.clock.now() + ttl)
    }
}

impl Clone for MemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            clock: Arc::clone(&self.clock),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let expires_at = self.expiry(ttl)?;
        let fields = record
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        self.sessions.write().await.insert(
            session_id.to_string(),
            Entry {
                value: StoredValue::Fields(fields),
                expires_at,
            },
        );
        Ok(())
    }

    async fn read_session(&self, session_id: &str) -> Result<StoredSession, SessionStoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let entry = match sessions.get(session_id) {
            Some(entry) if entry.expires_at <= now => {
                sessions.remove(session_id);
                return Err(SessionStoreError::NotFound);
            }
            Some(entry) => entry,
            None => return Err(SessionStoreError::NotFound),
        };

        match &entry.value {
            StoredValue::Fields(fields) if fields.is_empty() => Err(SessionStoreError::NotFound),
            StoredValue::Fields(fields) => {
                SessionRecord::from_fields(fields).map(StoredSession::Structured)
            }
            StoredValue::Scalar(value) => Ok(StoredSession::LegacyScalar(value.clone())),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::models::{Role, SubscriptionStatus};

    fn record() -> SessionRecord {
        SessionRecord {
            subject_id: 12,
            role: Role::Member,
            subscription_status: SubscriptionStatus::Active,
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_read_session() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        store
            .create_session("s1", &record(), Duration::from_secs(60))
            .await
            .unwrap();

        let stored = store.read_session("s1").await.unwrap();
        assert_eq!(stored, StoredSession::Structured(record()));
    }

    #[tokio::test]
    async fn test_create_overwrites() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        store
            .insert_legacy("s1", "12", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .create_session("s1", &record(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            store.read_session("s1").await.unwrap(),
            StoredSession::Structured(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_session() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        assert!(matches!(
            store.read_session("nope").await,
            Err(SessionStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        store
            .create_session("s1", &record(), Duration::from_secs(60))
            .await
            .unwrap();

        store.delete_session("s1").await.unwrap();
        store.delete_session("s1").await.unwrap();
        store.delete_session("never-existed").await.unwrap();
        assert!(matches!(
            store.read_session("s1").await,
            Err(SessionStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_session_expiration() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemorySessionStore::new(clock.clone());
        store
            .create_session("s1", &record(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.session_count().await, 1);

        clock.advance(chrono::Duration::seconds(60));
        assert!(matches!(
            store.read_session("s1").await,
            Err(SessionStoreError::NotFound)
        ));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        assert!(matches!(
            store.create_session("s1", &record(), Duration::ZERO).await,
            Err(SessionStoreError::InvalidTtl)
        ));
    }

    #[tokio::test]
    async fn test_legacy_scalar_read() {
        let store = MemorySessionStore::new(Arc::new(ManualClock::starting_now()));
        store
            .insert_legacy("old", "77", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.read_session("old").await.unwrap(),
            StoredSession::LegacyScalar("77".to_string())
        );
    }

    #[test]
    fn test_fields_round_trip_without_display_fields() {
        let mut record = record();
        record.name = None;
        record.email = None;

        let fields: HashMap<String, String> = record
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(SessionRecord::from_fields(&fields).unwrap(), record);
    }

    #[test]
    fn test_corrupt_fields() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_SUBJECT_ID.to_string(), "abc".to_string());
        fields.insert(FIELD_ROLE.to_string(), "1".to_string());
        fields.insert(FIELD_SUBSCRIPTION_STATUS.to_string(), "ACTIVE".to_string());
        assert!(matches!(
            SessionRecord::from_fields(&fields),
            Err(SessionStoreError::Corrupt(_))
        ));

        fields.insert(FIELD_SUBJECT_ID.to_string(), "1".to_string());
        fields.remove(FIELD_ROLE);
        assert!(matches!(
            SessionRecord::from_fields(&fields),
            Err(SessionStoreError::Corrupt(_))
        ));
    }
}
