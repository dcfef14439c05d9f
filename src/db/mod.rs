//! Relational storage.
//!
//! - **Turso/SQLite**: users, local credentials, system settings and the
//!   activity log, all behind [`TursoClient`]
//! - [`UserDirectory`]: the trait the session layer talks to

#![allow(missing_docs)]

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, UserDirectory, UserUpdate};
pub use turso::TursoClient;
