//! Cookie contract for carrying the session token.

use crate::auth::jwt::SessionTokenService;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Attributes of the session cookie.
///
/// Built from the token service so that `Max-Age` always equals the token
/// lifetime.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    secure: bool,
    max_age_secs: i64,
}

impl CookiePolicy {
    pub fn new(tokens: &SessionTokenService, secure: bool) -> Self {
        Self {
            secure,
            max_age_secs: tokens.ttl().num_seconds(),
        }
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Cookie carrying a freshly minted token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        self.build(token, self.max_age_secs)
    }

    /// Empty cookie with `Max-Age=0`, telling the browser to drop the session.
    pub fn cleared_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), 0)
    }

    fn build(&self, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }
}

/// Session token presented by the client, if any. Empty values count as absent.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
