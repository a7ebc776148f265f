//! Session management
//!
//! Ties token issuance to the server-side session record. A session id is
//! live exactly while its record exists in the store; logout and TTL expiry
//! are the only ways out and neither can be undone.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::error::AuthError;
use super::jwt::{Claims, IssuedToken, TokenService};
use super::models::{
    AuthorizationContext, LoginRequest, LoginResponse, SessionRecord, SubjectProfile,
};
use super::password::{verify_dummy, verify_password};
use super::store::{SessionStore, SessionStoreError, StoredSession};
use super::users::UserDirectory;

/// Everything the HTTP layer needs from the auth subsystem
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and return the public profile of the subject
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SubjectProfile, AuthError>;

    fn create_token(&self, subject_id: i64) -> Result<IssuedToken, AuthError>;

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;

    /// Store the session record behind a freshly issued token
    async fn persist_session(
        &self,
        profile: &SubjectProfile,
        token: &IssuedToken,
    ) -> Result<(), AuthError>;

    async fn invalidate(&self, session_id: &str) -> Result<(), AuthError>;

    async fn resolve_session(&self, session_id: &str)
        -> Result<AuthorizationContext, AuthError>;

    /// Whether unknown usernames are reported as such instead of as bad credentials
    fn reveals_unknown_users(&self) -> bool {
        false
    }

    /// Authenticate, issue and persist in one step
    ///
    /// The token is only returned once its session record is stored.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let profile = match self.authenticate(&request.username, &request.password).await {
            Err(AuthError::UserNotFound) if !self.reveals_unknown_users() => {
                return Err(AuthError::InvalidCredentials)
            }
            other => other?,
        };

        let token = self.create_token(profile.id)?;
        self.persist_session(&profile, &token).await?;

        Ok(LoginResponse {
            access_token: token.token,
            expires_at: token.expires_at,
            user: profile,
        })
    }
}

pub struct SessionManager {
    tokens: TokenService,
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    reveal_unknown_users: bool,
    accept_legacy_sessions: bool,
}

impl SessionManager {
    pub fn new(
        tokens: TokenService,
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            store,
            users,
            clock,
            reveal_unknown_users: false,
            accept_legacy_sessions: true,
        }
    }

    pub fn with_reveal_unknown_users(mut self, reveal: bool) -> Self {
        self.reveal_unknown_users = reveal;
        self
    }

    pub fn with_legacy_sessions(mut self, accept: bool) -> Self {
        self.accept_legacy_sessions = accept;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

#[async_trait]
impl AuthService for SessionManager {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SubjectProfile, AuthError> {
        let user = match self.users.find_user_by_username(username).await? {
            Some(user) => user,
            None => {
                verify_dummy(password)
                    .await
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                debug!("Login attempt for unknown user");
                return Err(AuthError::UserNotFound);
            }
        };

        let matches = verify_password(password, &user.password_hash)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            debug!(subject_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user.profile())
    }

    fn create_token(&self, subject_id: i64) -> Result<IssuedToken, AuthError> {
        self.tokens.issue(subject_id)
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }

    async fn persist_session(
        &self,
        profile: &SubjectProfile,
        token: &IssuedToken,
    ) -> Result<(), AuthError> {
        let ttl = token
            .remaining_lifetime(self.clock.now())
            .to_std()
            .map_err(|_| SessionStoreError::InvalidTtl)?;

        let record = SessionRecord::from(profile);
        if let Err(e) = self
            .store
            .create_session(&token.session_id, &record, ttl)
            .await
        {
            warn!(session_id = %token.session_id, error = %e, "Failed to persist session");
            return Err(e.into());
        }

        info!(
            session_id = %token.session_id,
            subject_id = profile.id,
            "Session created"
        );
        Ok(())
    }

    async fn invalidate(&self, session_id: &str) -> Result<(), AuthError> {
        if let Err(e) = self.store.delete_session(session_id).await {
            error!(session_id = %session_id, error = %e, "Failed to delete session");
            return Err(e.into());
        }
        info!(session_id = %session_id, "Session invalidated");
        Ok(())
    }

    async fn resolve_session(
        &self,
        session_id: &str,
    ) -> Result<AuthorizationContext, AuthError> {
        match self.store.read_session(session_id).await {
            Ok(StoredSession::Structured(record)) => {
                Ok(AuthorizationContext::from_record(session_id, record))
            }
            Ok(StoredSession::LegacyScalar(value)) => {
                if !self.accept_legacy_sessions {
                    debug!(session_id = %session_id, "Rejecting legacy session");
                    return Err(AuthError::Unauthorized);
                }
                let subject_id = value.trim().parse::<i64>().map_err(|_| {
                    error!(session_id = %session_id, "Legacy session holds no subject id");
                    SessionStoreError::Corrupt(format!("legacy subject id {:?}", value))
                })?;
                debug!(session_id = %session_id, "Resolved legacy session");
                Ok(AuthorizationContext::subject_only(session_id, subject_id))
            }
            Err(SessionStoreError::NotFound) => Err(AuthError::Unauthorized),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to read session");
                Err(e.into())
            }
        }
    }

    fn reveals_unknown_users(&self) -> bool {
        self.reveal_unknown_users
    }
}
