//! Identity providers
//!
//! The identity provider is the system of record for passwords. Gatekeeper
//! never stores a password it can read back: a provider either confirms the
//! credentials and hands back who the user is, or rejects them.
//!
//! [`LocalIdentityProvider`] keeps Argon2id hashes in the same database as the
//! user directory and is what the server runs with out of the box.

use crate::db::turso::TursoClient;
use crate::types::{AppError, IdentityUser, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Message sent back for any credential mismatch.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(IdentityUser),
    /// Credentials were checked and refused; carries the provider's message.
    Rejected(String),
}

/// External authority that validates email and password.
///
/// `Err` is reserved for the provider being unreachable or broken; a wrong
/// password is `Ok(LoginOutcome::Rejected(..))`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome>;

    /// Ends the provider-side session, if the provider keeps one.
    async fn logout(&self) -> Result<()>;
}

/// Hashes a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verifies a password against a PHC-format Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::IdentityProvider(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Identity provider backed by the local `credentials` table.
///
/// Unknown emails are checked against a throwaway hash so they cost the same
/// Argon2 work as a wrong password.
pub struct LocalIdentityProvider {
    db: Arc<TursoClient>,
    dummy_hash: Option<String>,
}

impl LocalIdentityProvider {
    pub fn new(db: Arc<TursoClient>) -> Self {
        let dummy_hash = hash_password("gatekeeper-unknown-account")
            .map_err(|e| tracing::warn!(error = %e, "failed to prepare dummy password hash"))
            .ok();
        Self { db, dummy_hash }
    }

    /// Stores (or replaces) the credentials for `email`.
    pub async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::MissingCredentials);
        }

        let hash = hash_password(password)?;
        self.db.store_credentials(email, &hash, name).await?;
        tracing::info!(email = %email, "registered local credentials");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let Some((hash, name)) = self.db.get_credentials(email).await? else {
            if let Some(dummy) = &self.dummy_hash {
                verify_password(password, dummy)?;
            }
            return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &hash)? {
            return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string()));
        }

        Ok(LoginOutcome::Authenticated(IdentityUser {
            username: email.to_string(),
            email: Some(email.to_string()),
            name,
        }))
    }

    async fn logout(&self) -> Result<()> {
        // No provider-side session to end.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_local_login() {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let idp = LocalIdentityProvider::new(db);
        idp.register("ops@example.com", "s3cret-pass", Some("Ops"))
            .await
            .unwrap();

        let outcome = idp.login("ops@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Authenticated(IdentityUser {
                username: "ops@example.com".to_string(),
                email: Some("ops@example.com".to_string()),
                name: Some("Ops".to_string()),
            })
        );

        assert_eq!(
            idp.login("ops@example.com", "wrong").await.unwrap(),
            LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string())
        );
        assert_eq!(
            idp.login("nobody@example.com", "s3cret-pass").await.unwrap(),
            LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_full_verification() {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let idp = LocalIdentityProvider::new(db);
        let real = hash_password("s3cret-pass").unwrap();

        let dummy = idp.dummy_hash.as_deref().expect("dummy hash prepared");
        let dummy = PasswordHash::new(dummy).unwrap();
        let real = PasswordHash::new(&real).unwrap();
        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.params, real.params);

        // Matching the dummy's own password still gets nobody in.
        assert_eq!(
            idp.login("ghost@example.com", "gatekeeper-unknown-account")
                .await
                .unwrap(),
            LoginOutcome::Rejected(INVALID_CREDENTIALS.to_string())
        );
    }

    #[tokio::test]
    async fn test_register_requires_both_fields() {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let idp = LocalIdentityProvider::new(db);

        assert!(matches!(
            idp.register("", "pw", None).await,
            Err(AppError::MissingCredentials)
        ));
    }
}
