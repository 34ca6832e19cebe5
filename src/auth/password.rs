//! Password hashing
//!
//! Thin async wrappers over bcrypt. Hashing runs on the blocking pool so a
//! registration or login never stalls the async executor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Hash a raw password with a per-hash random salt.
pub async fn hash_password(raw: String) -> Result<String, PasswordError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(raw, bcrypt::DEFAULT_COST)).await??;
    Ok(hash)
}

/// Verify a raw password against a stored hash.
pub async fn verify_password(raw: String, hash: String) -> Result<bool, PasswordError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(raw, &hash)).await??;
    Ok(ok)
}
