//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Gatekeeper, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Session (`/api/v1/auth`)
//! - `POST /api/v1/auth/login` - Check credentials, set the `session` cookie
//! - `POST /api/v1/auth/logout` - Clear the `session` cookie
//! - `POST /api/v1/auth/refresh` - Re-issue the session with a fresh expiry
//! - `GET /api/v1/auth/me` - Current user
//!
//! ## Settings (`/api/v1/settings`, super admin)
//! - `GET /api/v1/settings` - List settings, sensitive values masked
//! - `POST /api/v1/settings` - Create or overwrite a setting
//! - `PUT /api/v1/settings/{key}` - Update an existing setting
//! - `DELETE /api/v1/settings/{key}` - Delete a setting
//! - `POST /api/v1/settings/initialize` - Write missing defaults
//!
//! ## Models (`/api/v1/bedrock`, super admin)
//! - `GET /api/v1/bedrock/models` - Model catalog, filter by `category` / `provider`
//!
//! ## Users (`/api/v1/users`)
//! - `GET /api/v1/users` - List users (admin or above)
//! - `PATCH /api/v1/users/{id}` - Change role or active flag (super admin)
//!
//! # Authentication
//!
//! Requests authenticate with the `session` cookie set by login:
//! ```text
//! Cookie: session=<token>
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

use utoipa::OpenApi;

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

/// OpenAPI description of the `/api/v1` surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::settings::list_settings,
        handlers::settings::upsert_setting,
        handlers::settings::update_setting,
        handlers::settings::delete_setting,
        handlers::settings::initialize_settings,
        handlers::bedrock::list_models,
        handlers::users::list_users,
        handlers::users::update_user,
    ),
    components(schemas(
        crate::types::Role,
        crate::types::LoginRequest,
        crate::types::SessionResponse,
        crate::types::SessionUserView,
        crate::types::LogoutResponse,
        crate::types::MeResponse,
        crate::types::UserDetails,
        crate::types::UsersResponse,
        crate::types::UserResponse,
        crate::types::UpdateUserRequest,
        crate::types::MessageResponse,
        crate::settings::AdminSettingKey,
        crate::settings::AdminSettingView,
        crate::settings::SystemSetting,
        crate::settings::SettingsListResponse,
        crate::settings::UpsertSettingRequest,
        crate::settings::UpdateSettingRequest,
        crate::settings::SettingResponse,
        crate::settings::InitializeSettingsResponse,
        crate::bedrock::BedrockModel,
        crate::bedrock::ModelCatalogResponse,
    )),
    tags(
        (name = "auth", description = "Session cookie lifecycle"),
        (name = "settings", description = "System settings administration"),
        (name = "bedrock", description = "Model catalog"),
        (name = "users", description = "User administration")
    )
)]
pub struct ApiDoc;
