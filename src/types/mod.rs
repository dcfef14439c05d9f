use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============= Roles =============

/// Access level of a console user.
///
/// Ordered from least to most privileged, so `role >= Role::Admin` reads as
/// "admin or above".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

// ============= Session Types =============

/// Payload carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub is_authenticated: bool,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// The identity tuple a session is minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl From<&DirectoryUser> for SessionSubject {
    fn from(user: &DirectoryUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl From<&SessionClaims> for SessionSubject {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

// ============= Directory Types =============

/// Authoritative user record held by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login_at: Option<i64>,
}

/// User as returned by the identity provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub username: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

// ============= Authentication API Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Compact user view returned by login and refresh.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUserView {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&DirectoryUser> for SessionUserView {
    fn from(user: &DirectoryUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUserView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Full user view returned by `/auth/me` and the user admin endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDetails {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    /// RFC3339 formatted creation timestamp
    pub created_at: String,
    /// RFC3339 formatted last login timestamp
    pub last_login_at: Option<String>,
}

impl From<&DirectoryUser> for UserDetails {
    fn from(user: &DirectoryUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: rfc3339(user.created_at),
            last_login_at: user.last_login_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserDetails,
}

// ============= User Administration API Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserDetails>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserDetails,
}

/// Body of `PATCH /users/{id}`; absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Formats unix seconds as RFC3339, falling back to the epoch for out-of-range values.
pub fn rfc3339(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .unwrap_or_default()
        .to_rfc3339()
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("No session found")]
    NoSession,

    #[error("Invalid session")]
    InvalidSession,

    #[error("User not found or inactive")]
    UserNotFound,

    #[error("Access denied. {0}")]
    AccessDenied(String),

    #[error("Invalid request data: {0}")]
    Validation(String),

    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredentials => "MISSING_CREDENTIALS",
            AppError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            AppError::NoSession => "NO_SESSION",
            AppError::InvalidSession => "INVALID_SESSION",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::AccessDenied(_) => "ACCESS_DENIED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::SettingNotFound(_) => "SETTING_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_)
            | AppError::IdentityProvider(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::MissingCredentials | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationFailed(_)
            | AppError::NoSession
            | AppError::InvalidSession
            | AppError::UserNotFound => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::SettingNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::IdentityProvider(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        // Internal failures are logged in full but reported generically.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
