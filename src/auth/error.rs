//! Authentication error taxonomy

use thiserror::Error;

use super::store::SessionStoreError;
use super::users::DirectoryError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing or malformed Authorization header")]
    MissingCredentials,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    ExpiredToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No live session behind an otherwise valid token
    #[error("session not found")]
    Unauthorized,

    #[error("malformed identity assertion: {0}")]
    MalformedAssertion(String),

    #[error("forbidden")]
    Forbidden,

    #[error("session store error: {0}")]
    Store(#[from] SessionStoreError),

    #[error("user directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the failure comes from the server side rather than the caller
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Store(_) | AuthError::Directory(_) | AuthError::Internal(_)
        )
    }
}
