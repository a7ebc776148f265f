//! Redis-backed session store
//!
//! Records are Redis hashes keyed by session id with the key's own TTL
//! carrying the expiry. Legacy sessions are plain string keys holding the
//! subject id.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::models::SessionRecord;
use super::store::{SessionStore, SessionStoreError, StoredSession};

#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a managed connection to the given Redis URL
    pub async fn connect(url: &str) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_session(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let seconds = ttl.as_secs();
        if seconds == 0 {
            return Err(SessionStoreError::InvalidTtl);
        }

        let mut conn = self.redis.clone();
        redis::pipe()
            .atomic()
            .del(session_id)
            .ignore()
            .hset_multiple(session_id, &record.to_fields())
            .ignore()
            .expire(session_id, seconds as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        debug!(session_id = %session_id, ttl_secs = seconds, "Session stored");
        Ok(())
    }

    async fn read_session(&self, session_id: &str) -> Result<StoredSession, SessionStoreError> {
        let mut conn = self.redis.clone();
        let key_type: String = redis::cmd("TYPE")
            .arg(session_id)
            .query_async(&mut conn)
            .await?;

        match key_type.as_str() {
            "none" => Err(SessionStoreError::NotFound),
            "hash" => {
                let fields: HashMap<String, String> = redis::cmd("HGETALL")
                    .arg(session_id)
                    .query_async(&mut conn)
                    .await?;
                if fields.is_empty() {
                    return Err(SessionStoreError::NotFound);
                }
                SessionRecord::from_fields(&fields).map(StoredSession::Structured)
            }
            "string" => {
                let value: Option<String> = redis::cmd("GET")
                    .arg(session_id)
                    .query_async(&mut conn)
                    .await?;
                // Key may expire between TYPE and GET
                value
                    .map(StoredSession::LegacyScalar)
                    .ok_or(SessionStoreError::NotFound)
            }
            other => Err(SessionStoreError::Corrupt(format!(
                "unexpected redis type {} for session key",
                other
            ))),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(session_id)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(session_id = %session_id, "Session deleted");
        Ok(())
    }
}
