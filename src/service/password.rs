use crate::error::app_error::AppError;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hashing primitive used for stored credentials.
#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    async fn matches(&self, password: &str, stored_hash: &str) -> Result<bool, AppError>;

    /// A well-formed hash that no supplied password is expected to match.
    /// Compared against when the identity is unknown so that both failure
    /// paths cost one full verification.
    fn placeholder_hash(&self) -> &str;
}

pub struct Argon2Hasher {
    placeholder: String,
}

impl Argon2Hasher {
    /// Hashes a random secret once to serve as the placeholder.
    pub fn new() -> Result<Self, AppError> {
        let secret = SaltString::generate(&mut OsRng);
        let placeholder = hash_blocking(secret.as_str())?;
        Ok(Self { placeholder })
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2Hasher {
    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| AppError::PasswordHash {
                message: format!("Password hashing task failed: {}", e),
            })?
    }

    async fn matches(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &stored_hash))
            .await
            .map_err(|e| AppError::PasswordHash {
                message: format!("Password verification task failed: {}", e),
            })?
    }

    fn placeholder_hash(&self) -> &str {
        &self.placeholder
    }
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::password_hash("Failed to hash password", e))?;

    Ok(hash.to_string())
}

fn verify_blocking(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::password_hash("Password verification failed", e)),
    }
}
