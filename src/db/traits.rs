//! Database abstraction traits
//!
//! This module provides the [`UserDirectory`] trait, the seam between the
//! session layer and wherever authoritative user records live, plus the
//! [`DatabaseProvider`] used to pick a backend at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatekeeper::db::DatabaseProvider;
//!
//! // In-memory database (default for development/testing)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // File-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data/gatekeeper.db".into() }.create_client().await?;
//! ```

use crate::db::turso::TursoClient;
use crate::types::{DirectoryUser, IdentityUser, Result, Role};
use async_trait::async_trait;

/// Database provider configuration
#[derive(Debug, Clone, Default)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
}

impl DatabaseProvider {
    /// Picks a provider from a configured URL; `:memory:` selects the in-memory database.
    pub fn from_url(url: &str) -> Self {
        if url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: url.to_string(),
            }
        }
    }

    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<TursoClient> {
        match self {
            DatabaseProvider::Memory => TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => TursoClient::new_local(path).await,
        }
    }
}

/// Changes an administrator may apply to a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Authoritative store of console users.
///
/// Lookups by id and email only ever return active users: an inactive
/// account is indistinguishable from a missing one to the session layer.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Creates or refreshes the record for a user the identity provider just
    /// authenticated.
    ///
    /// New users get the `super_admin` role when their email equals
    /// `super_admin_email`, `user` otherwise. Existing users keep their role and
    /// have `last_login_at` bumped.
    async fn sync_user(
        &self,
        identity: &IdentityUser,
        super_admin_email: Option<&str>,
    ) -> Result<DirectoryUser>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<DirectoryUser>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<DirectoryUser>>;

    /// Records activity for the user. Failures are logged, never returned.
    async fn update_user_activity(&self, id: &str);

    /// All users, active or not, ordered by email.
    async fn list_users(&self) -> Result<Vec<DirectoryUser>>;

    /// Applies `update`; returns the updated record or `None` for an unknown id.
    async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<Option<DirectoryUser>>;
}
