//! Password hashing and comparison

use crate::error::{Error, Result};

/// Work factor for newly created hashes
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash compared against when the username is unknown, so both paths cost the same
const DUMMY_HASH: &str = "$2b$12$C6UzMDM.H6dfI/f/IKcEeO5Q7aS0Pb0qzq4s5XbzYc8zq3Dlae3Rm";

/// Compare a plaintext password against a bcrypt hash
///
/// A malformed hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || Ok(bcrypt::verify(&password, &hash).unwrap_or(false)))
        .await
        .map_err(|e| Error::Other(format!("password check task failed: {}", e)))?
}

/// Burn the same time as a real comparison
pub async fn verify_dummy(password: &str) -> Result<()> {
    verify_password(password, DUMMY_HASH).await.map(|_| ())
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}
