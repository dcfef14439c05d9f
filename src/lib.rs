//! # Gatekeeper
//!
//! Session authentication server for the chatbot administration console.
//!
//! Gatekeeper issues signed, expiring session tokens after an identity
//! provider has confirmed a user's credentials, carries them in an
//! `HttpOnly` cookie, and guards page routes before they are served. API
//! handlers re-load the user on every request and check the *current* role,
//! so a token minted before a demotion buys nothing.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use gatekeeper::{build_router, AppState, GatekeeperConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatekeeperConfig::load("gatekeeper.toml")?;
//!     let state = AppState::from_config(config).await?;
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `swagger-ui` | Interactive API documentation at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Session tokens, cookie, routing guard and extractors
//! - [`bedrock`] - Model catalog offered to admins
//! - [`db`] - User directory and SQLite storage
//! - [`idp`] - Identity providers
//! - [`settings`] - Admin settings and masking
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Session authentication.
pub mod auth;
/// Bedrock model catalog.
pub mod bedrock;
/// Command-line interface.
pub mod cli;
/// User directory and relational storage.
pub mod db;
/// Identity providers.
pub mod idp;
/// Admin settings.
pub mod settings;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::TursoClient;
pub use types::{AppError, Result};
pub use utils::toml_config::GatekeeperConfig;

use crate::auth::cookie::CookiePolicy;
use crate::auth::guard::{route_guard, RoutePolicy};
use crate::auth::jwt::SessionTokenService;
use crate::db::{DatabaseProvider, UserDirectory};
use crate::idp::{IdentityProvider, LocalIdentityProvider};
use crate::settings::SettingsService;
use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<GatekeeperConfig>,
    /// Database client
    pub db: Arc<TursoClient>,
    /// Authoritative user records
    pub users: Arc<dyn UserDirectory>,
    /// Credential authority
    pub identity: Arc<dyn IdentityProvider>,
    /// Session token issuance and verification
    pub sessions: Arc<SessionTokenService>,
    /// `session` cookie attributes
    pub cookies: CookiePolicy,
    /// Page routing rules
    pub route_policy: RoutePolicy,
    /// Admin settings
    pub settings: Arc<SettingsService>,
    /// Email granted `super_admin` on first login
    pub super_admin_email: Option<String>,
}

impl AppState {
    /// Wires the state from already-built parts. The directory and settings
    /// are backed by `db`.
    pub fn new(
        config: GatekeeperConfig,
        db: Arc<TursoClient>,
        identity: Arc<dyn IdentityProvider>,
        sessions: SessionTokenService,
    ) -> Self {
        let cookies = CookiePolicy::new(&sessions, config.server.is_production());
        let route_policy = RoutePolicy::from_config(&config.routes);
        let super_admin_email = config.super_admin_email();

        Self {
            users: db.clone(),
            settings: Arc::new(SettingsService::new(db.clone())),
            config: Arc::new(config),
            db,
            identity,
            sessions: Arc::new(sessions),
            cookies,
            route_policy,
            super_admin_email,
        }
    }

    /// Opens the configured database and uses the local identity provider.
    pub async fn from_config(config: GatekeeperConfig) -> Result<Self> {
        let secret = config
            .jwt_secret()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let sessions = SessionTokenService::new(&secret, config.auth.session_ttl_secs)?;

        let db = Arc::new(
            DatabaseProvider::from_url(&config.database.url)
                .create_client()
                .await?,
        );
        let identity = Arc::new(LocalIdentityProvider::new(db.clone()));

        Ok(Self::new(config, db, identity, sessions))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    // Credentialed requests need explicit origins, methods and headers.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Builds the full application router.
///
/// `/api/v1` and `/health` bypass the routing guard; every other path goes
/// through it and is then served from `server.static_dir` (404 when unset).
pub fn build_router(state: AppState) -> Router {
    let pages: Router = match &state.config.server.static_dir {
        Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
        None => Router::new().fallback(|| async { StatusCode::NOT_FOUND }),
    }
    .layer(middleware::from_fn_with_state(state.clone(), route_guard));

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::routes::create_router());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    let cors = cors_layer(&state.config.server.cors_origins);

    router
        .fallback_service(pages)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
