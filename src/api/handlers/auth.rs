use crate::{
    auth::middleware::{CurrentUser, SessionUser},
    idp::LoginOutcome,
    types::{
        AppError, LoginRequest, LogoutResponse, MeResponse, Result, SessionResponse,
        SessionSubject, SessionUserView, UserDetails,
    },
    AppState,
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;

/// Login with email and password
///
/// Checks the credentials with the identity provider, syncs the user into
/// the directory and sets the `session` cookie.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = SessionResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::MissingCredentials);
    }

    let identity = match state.identity.login(email, &payload.password).await? {
        LoginOutcome::Authenticated(identity) => identity,
        LoginOutcome::Rejected(reason) => {
            tracing::info!(email = %email, "login rejected by identity provider");
            return Err(AppError::AuthenticationFailed(reason));
        }
    };

    let user = state
        .users
        .sync_user(&identity, state.super_admin_email.as_deref())
        .await?;

    if !user.is_active {
        tracing::info!(user_id = %user.id, "login refused for disabled account");
        return Err(AppError::AccessDenied(
            "Your account has been disabled.".to_string(),
        ));
    }

    let token = state.sessions.create_session(&SessionSubject::from(&user))?;
    tracing::info!(user_id = %user.id, role = %user.role, "session created");

    Ok((
        jar.add(state.cookies.session_cookie(token)),
        Json(SessionResponse {
            success: true,
            user: SessionUserView::from(&user),
        }),
    ))
}

/// Logout
///
/// Always clears the `session` cookie. A failing identity provider logout is
/// reported as a warning, not an error.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let warning = match state.identity.logout().await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(error = %e, "identity provider logout failed, clearing session");
            Some(
                "Signed out locally; the identity provider session may still be active."
                    .to_string(),
            )
        }
    };

    (
        jar.add(state.cookies.cleared_cookie()),
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully".to_string(),
            warning,
        }),
    )
}

/// Refresh the session
///
/// Issues a new token with a fresh expiry from the current directory record,
/// so role changes made since the last login are picked up.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Session refreshed, cookie replaced", body = SessionResponse),
        (status = 401, description = "No session, invalid session or unknown user")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = state
        .users
        .get_user_by_id(&claims.sub)
        .await?
        .ok_or(AppError::UserNotFound)?;

    state.users.update_user_activity(&user.id).await;

    let token = state
        .sessions
        .renew_session(&SessionSubject::from(&user), &claims)?;
    tracing::debug!(user_id = %user.id, "session refreshed");

    Ok((
        jar.add(state.cookies.session_cookie(token)),
        Json(SessionResponse {
            success: true,
            user: SessionUserView::from(&user),
        }),
    ))
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = MeResponse),
        (status = 401, description = "No session, invalid session or unknown user")
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<MeResponse> {
    state.users.update_user_activity(&user.id).await;

    Json(MeResponse {
        success: true,
        user: UserDetails::from(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::SESSION_COOKIE_NAME;
    use crate::auth::jwt::SessionTokenService;
    use crate::db::TursoClient;
    use crate::idp::MockIdentityProvider;
    use crate::GatekeeperConfig;
    use std::sync::Arc;

    const SECRET: &str = "unit-test-secret-that-is-long-enough";

    async fn state_with(idp: MockIdentityProvider) -> AppState {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let sessions = SessionTokenService::new(SECRET, 3600).unwrap();
        AppState::new(GatekeeperConfig::default(), db, Arc::new(idp), sessions)
    }

    fn login_body(email: &str, password: &str) -> Json<LoginRequest> {
        Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_when_provider_fails() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_logout()
            .times(1)
            .returning(|| Err(AppError::IdentityProvider("unreachable".to_string())));
        let state = state_with(idp).await;

        let (jar, Json(body)) = logout(State(state), CookieJar::new()).await;

        let cookie = jar.get(SESSION_COOKIE_NAME).expect("cookie overwritten");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert!(body.success);
        assert!(body.warning.is_some());
    }

    #[tokio::test]
    async fn test_logout_without_warning_on_success() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_logout().returning(|| Ok(()));
        let state = state_with(idp).await;

        let (_, Json(body)) = logout(State(state), CookieJar::new()).await;

        assert!(body.success);
        assert!(body.warning.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_blank_fields_without_calling_provider() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_login().never();
        let state = state_with(idp).await;

        let result = login(State(state), CookieJar::new(), login_body("  ", "pw")).await;

        assert!(matches!(result, Err(AppError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_login_passes_provider_rejection_through() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_login().returning(|_, _| {
            Ok(LoginOutcome::Rejected(
                "Incorrect username or password.".to_string(),
            ))
        });
        let state = state_with(idp).await;

        let result = login(
            State(state),
            CookieJar::new(),
            login_body("a@example.com", "pw"),
        )
        .await;

        match result {
            Err(AppError::AuthenticationFailed(msg)) => {
                assert_eq!(msg, "Incorrect username or password.")
            }
            _ => panic!("expected authentication failure"),
        }
    }

    #[tokio::test]
    async fn test_login_provider_outage_is_internal() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_login()
            .returning(|_, _| Err(AppError::IdentityProvider("timeout".to_string())));
        let state = state_with(idp).await;

        let err = login(State(state), CookieJar::new(), login_body("a@example.com", "pw"))
            .await
            .err()
            .expect("login should fail");

        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie_for_synced_user() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_login().returning(|email, _| {
            Ok(LoginOutcome::Authenticated(crate::types::IdentityUser {
                username: email.to_string(),
                email: Some(email.to_string()),
                name: Some("Ann".to_string()),
            }))
        });
        let state = state_with(idp).await;
        let sessions = state.sessions.clone();

        let (jar, Json(body)) = login(
            State(state),
            CookieJar::new(),
            login_body("ann@example.com", "pw"),
        )
        .await
        .unwrap();

        let cookie = jar.get(SESSION_COOKIE_NAME).expect("session cookie set");
        assert!(cookie.http_only().unwrap_or(false));
        assert!(cookie.secure().unwrap_or(false));
        let claims = sessions.verify_session(cookie.value()).expect("valid token");
        assert_eq!(claims.sub, body.user.id);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(body.user.full_name, "Ann");
    }
}
