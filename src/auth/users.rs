//! User directory lookups

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio_postgres::{Client, NoTls, Row};

use super::models::{Role, SubscriptionStatus, UserRecord};
use crate::config::AccountConfig;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("corrupt user row: {0}")]
    Corrupt(String),
}

/// Account lookup consumed by the session manager
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;
}

/// Accounts listed in the configuration file, keyed by email
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    accounts: HashMap<String, UserRecord>,
}

impl StaticUserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            accounts: users
                .into_iter()
                .map(|user| (user.email.to_lowercase(), user))
                .collect(),
        }
    }

    pub fn from_accounts(accounts: &[AccountConfig]) -> Self {
        Self::new(accounts.iter().map(|account| UserRecord {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role,
            subscription_status: account.subscription_status,
        }))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.accounts.get(&username.to_lowercase()).cloned())
    }
}

/// Accounts in the `users` table
pub struct PostgresUserDirectory {
    client: Client,
}

impl PostgresUserDirectory {
    pub async fn connect(conn_string: &str) -> Result<Self, DirectoryError> {
        let (client, connection) = tokio_postgres::connect(conn_string, NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    fn user_from_row(row: &Row) -> Result<UserRecord, DirectoryError> {
        let role: i16 = row.try_get("role")?;
        let role = u8::try_from(role)
            .map_err(|_| DirectoryError::Corrupt(format!("role out of range: {}", role)))
            .and_then(|r| Role::try_from(r).map_err(DirectoryError::Corrupt))?;

        let status: String = row.try_get("subscription_status")?;
        let subscription_status = status
            .parse::<SubscriptionStatus>()
            .map_err(DirectoryError::Corrupt)?;

        Ok(UserRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password")?,
            role,
            subscription_status,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, name, email, password, role, subscription_status \
                 FROM users WHERE lower(email) = lower($1)",
                &[&username],
            )
            .await?;

        row.as_ref().map(Self::user_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, email: &str) -> AccountConfig {
        AccountConfig {
            id,
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: Role::Member,
            subscription_status: SubscriptionStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_static_lookup_is_case_insensitive() {
        let directory = StaticUserDirectory::from_accounts(&[account(7, "Alice@Example.com")]);
        assert_eq!(directory.len(), 1);

        let user = directory
            .find_user_by_username("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.role, Role::Member);
    }

    #[tokio::test]
    async fn test_static_lookup_missing() {
        let directory = StaticUserDirectory::default();
        assert!(directory.is_empty());
        assert!(directory
            .find_user_by_username("nobody")
            .await
            .unwrap()
            .is_none());
    }
}
