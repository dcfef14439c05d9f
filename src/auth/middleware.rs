use crate::auth::cookie::session_token;
use crate::types::{AppError, DirectoryUser, Role, SessionClaims};
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

/// Extractor for the verified session of the request.
///
/// Rejects with `NO_SESSION` when the cookie is missing and
/// `INVALID_SESSION` when the token does not verify.
pub struct SessionUser(pub SessionClaims);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar).ok_or(AppError::NoSession)?;

        state
            .sessions
            .verify_session(&token)
            .map(SessionUser)
            .ok_or(AppError::InvalidSession)
    }
}

/// Extractor for the authoritative, active user behind the session.
///
/// The role on this record is the current one from the directory, not the
/// one baked into the token.
pub struct CurrentUser(pub DirectoryUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(claims) = SessionUser::from_request_parts(parts, state).await?;

        state
            .users
            .get_user_by_id(&claims.sub)
            .await?
            .map(CurrentUser)
            .ok_or(AppError::UserNotFound)
    }
}

impl CurrentUser {
    /// Fails with `ACCESS_DENIED` unless the user holds at least `required`.
    pub fn require_role(&self, required: Role) -> Result<(), AppError> {
        require_role(&self.0, required)
    }
}

pub fn require_role(user: &DirectoryUser, required: Role) -> Result<(), AppError> {
    if user.role >= required {
        Ok(())
    } else {
        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            required = %required,
            "role check denied"
        );
        Err(AppError::AccessDenied(match required {
            Role::SuperAdmin => "Super admin role required.".to_string(),
            Role::Admin => "Admin role required.".to_string(),
            Role::User => "Active account required.".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> DirectoryUser {
        DirectoryUser {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            full_name: "U One".to_string(),
            role,
            is_active: true,
            created_at: 0,
            updated_at: 0,
            last_login_at: None,
        }
    }

    #[test]
    fn test_require_role_allows_equal_or_higher() {
        assert!(require_role(&user(Role::SuperAdmin), Role::Admin).is_ok());
        assert!(require_role(&user(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn test_require_role_denies_lower() {
        let err = require_role(&user(Role::Admin), Role::SuperAdmin).unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
        assert_eq!(err.code(), "ACCESS_DENIED");
    }
}
