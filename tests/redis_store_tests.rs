//! Redis session store tests
//!
//! Need a running Redis:
//! REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_store_tests -- --ignored

use std::time::Duration;

use authgate::auth::{
    RedisSessionStore, Role, SessionRecord, SessionStore, SessionStoreError, StoredSession,
    SubscriptionStatus,
};

async fn store() -> Option<(RedisSessionStore, redis::aio::ConnectionManager)> {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url.as_str()).ok()?;
    match redis::aio::ConnectionManager::new(client).await {
        Ok(manager) => Some((RedisSessionStore::new(manager.clone()), manager)),
        Err(e) => {
            println!("⚠ Redis not available: {}", e);
            None
        }
    }
}

fn record() -> SessionRecord {
    SessionRecord {
        subject_id: 99,
        role: Role::Admin,
        subscription_status: SubscriptionStatus::Inactive,
        name: Some("Redis Test".to_string()),
        email: None,
    }
}

fn key(suffix: &str) -> String {
    format!("authgate-test-{}-{}", suffix, uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn test_redis_create_read_delete() {
    let Some((store, mut conn)) = store().await else { return };
    let id = key("crud");

    store
        .create_session(&id, &record(), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(
        store.read_session(&id).await.unwrap(),
        StoredSession::Structured(record())
    );

    let ttl: i64 = redis::cmd("TTL").arg(&id).query_async(&mut conn).await.unwrap();
    assert!(ttl > 0 && ttl <= 30);

    store.delete_session(&id).await.unwrap();
    store.delete_session(&id).await.unwrap();
    assert!(matches!(
        store.read_session(&id).await,
        Err(SessionStoreError::NotFound)
    ));
}

#[tokio::test]
#[ignore]
async fn test_redis_create_replaces_legacy_value() {
    let Some((store, mut conn)) = store().await else { return };
    let id = key("replace");

    redis::cmd("SET")
        .arg(&id)
        .arg("99")
        .arg("EX")
        .arg(30)
        .query_async::<_, ()>(&mut conn)
        .await
        .unwrap();
    assert_eq!(
        store.read_session(&id).await.unwrap(),
        StoredSession::LegacyScalar("99".to_string())
    );

    store
        .create_session(&id, &record(), Duration::from_secs(30))
        .await
        .unwrap();
    assert!(matches!(
        store.read_session(&id).await.unwrap(),
        StoredSession::Structured(_)
    ));

    store.delete_session(&id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_session_expires() {
    let Some((store, _conn)) = store().await else { return };
    let id = key("expiry");

    store
        .create_session(&id, &record(), Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(matches!(
        store.read_session(&id).await,
        Err(SessionStoreError::NotFound)
    ));
}
