//! Session authentication
//!
//! This module provides the session layer of Gatekeeper: signed session
//! tokens, the cookie that carries them, the routing guard for pages and the
//! extractors API handlers use to load the current user.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - Session token issuance, verification and refresh
//! - [`auth::cookie`](crate::auth::cookie) - `session` cookie attributes
//! - [`auth::guard`](crate::auth::guard) - Page routing guard (redirect rules)
//! - [`auth::middleware`](crate::auth::middleware) - Axum extractors and role checks
//!
//! # Security Features
//!
//! - **Session tokens**: HS256 signed, 24 hour lifetime, no server-side state
//! - **Cookie**: `HttpOnly`, `SameSite=Strict`, `Secure` in production
//! - **Two-layer checks**: the guard only checks token validity; handlers
//!   re-load the user and check the current role
//!
//! # Usage
//!
//! ```ignore
//! use gatekeeper::auth::jwt::SessionTokenService;
//!
//! let tokens = SessionTokenService::new(&secret, 86_400)?;
//! let token = tokens.create_session(&subject)?;
//! let claims = tokens.verify_session(&token);
//! ```

/// `session` cookie policy.
pub mod cookie;
/// Page routing guard.
pub mod guard;
/// Session token service.
pub mod jwt;
/// Extractors and role checks for API handlers.
pub mod middleware;
