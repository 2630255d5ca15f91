//! Argon2id password hashing.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use once_cell::sync::OnceCell;

use super::AuthError;

const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    /// Hash with the same parameters, verified against when no account matches.
    dummy: Arc<OnceCell<String>>,
}

impl PasswordService {
    /// Argon2id with m=19456, t=2, p=1.
    pub fn new() -> Self {
        Self::with_params(Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default()))
    }

    /// Cheaper parameters, for seeding large fixtures and for tests.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Self {
        Self::with_params(Params::new(memory_kib, iterations, 1, None).unwrap_or_else(|_| Params::default()))
    }

    fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy: Arc::new(OnceCell::new()),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// `Ok(false)` on a wrong password; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }
}

impl PasswordService {
    /// `hash` on the blocking pool, off the async workers.
    pub async fn spawn_hash(&self, password: String) -> Result<String, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    /// `verify` on the blocking pool, off the async workers.
    pub async fn spawn_verify(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    /// Runs a full verification against the dummy hash and discards the result. Login calls
    /// this for unknown emails so they take as long as a wrong password.
    pub async fn spawn_verify_dummy(&self, password: String) {
        let service = self.clone();
        let _ = tokio::task::spawn_blocking(move || {
            let dummy = service.dummy.get_or_try_init(|| service.hash(DUMMY_PASSWORD))?;
            service.verify(&password, dummy)
        })
        .await;
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}
