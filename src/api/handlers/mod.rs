//! API request handlers.
//!
//! Handlers authenticate through the extractors in
//! [`auth::middleware`](crate::auth::middleware) and check roles against the
//! directory record, never against the role carried in the token.

/// Model catalog handler.
pub mod bedrock;
/// Session handlers (login, logout, refresh, me).
pub mod auth;
/// Admin settings handlers.
pub mod settings;
/// User administration handlers.
pub mod users;
