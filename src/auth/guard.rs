//! Routing guard for page requests.
//!
//! Decides, before a page is served, whether the request proceeds or is
//! redirected based on the path and whether a valid session cookie is
//! present. Roles are not looked at here; API handlers re-check them against
//! the user directory.

use crate::auth::cookie::session_token;
use crate::utils::toml_config::RoutesConfig;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

/// Access class of a page path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Requires a valid session.
    Protected,
    /// Must not be visited with a valid session (e.g. the login page).
    AuthOnly,
    Public,
}

/// Outcome of the guard for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// Path classification and redirect targets.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    protected: Vec<String>,
    auth_only: Vec<String>,
    login_path: String,
    landing_path: String,
}

impl RoutePolicy {
    pub fn new(
        protected: Vec<String>,
        auth_only: Vec<String>,
        login_path: impl Into<String>,
        landing_path: impl Into<String>,
    ) -> Self {
        Self {
            protected,
            auth_only,
            login_path: login_path.into(),
            landing_path: landing_path.into(),
        }
    }

    pub fn from_config(config: &RoutesConfig) -> Self {
        Self::new(
            config.protected.clone(),
            config.auth_only.clone(),
            config.login_path.clone(),
            config.landing_path.clone(),
        )
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if self.protected.iter().any(|p| matches_prefix(path, p)) {
            PathClass::Protected
        } else if self.auth_only.iter().any(|p| matches_prefix(path, p)) {
            PathClass::AuthOnly
        } else {
            PathClass::Public
        }
    }

    /// Decides what happens to a request for `path`.
    ///
    /// Classification runs on the decoded, normalized path, the same one the
    /// file server resolves, so encodings and doubled slashes cannot dodge a
    /// protected prefix. The redirect target keeps the path as requested.
    pub fn decide(&self, path: &str, authenticated: bool) -> GuardDecision {
        let normalized = normalize_path(path);

        match self.classify(&normalized) {
            PathClass::Protected if authenticated => return GuardDecision::Proceed,
            PathClass::Protected => {
                return GuardDecision::Redirect(format!(
                    "{}?redirect={}",
                    self.login_path,
                    urlencoding::encode(path)
                ));
            }
            _ if is_asset(&normalized) => return GuardDecision::Proceed,
            PathClass::AuthOnly if authenticated => {
                return GuardDecision::Redirect(self.landing_path.clone());
            }
            _ => {}
        }

        if normalized == "/" {
            let target = if authenticated {
                &self.landing_path
            } else {
                &self.login_path
            };
            return GuardDecision::Redirect(target.clone());
        }

        GuardDecision::Proceed
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::from_config(&RoutesConfig::default())
    }
}

/// `prefix` matches itself and anything below it, segment-wise.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Percent-decodes `path` and drops empty and `.` segments.
fn normalize_path(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// Outside protected prefixes, static files (last segment has an extension)
/// skip the guard.
fn is_asset(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|seg| seg.contains('.'))
}

/// Middleware applying [`RoutePolicy`] to page requests.
pub async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let jar = CookieJar::from_headers(req.headers());

    let authenticated = session_token(&jar)
        .and_then(|token| state.sessions.verify_session(&token))
        .is_some();

    match state.route_policy.decide(&path, authenticated) {
        GuardDecision::Proceed => next.run(req).await,
        GuardDecision::Redirect(location) => {
            tracing::debug!(%path, %location, authenticated, "route guard redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}
