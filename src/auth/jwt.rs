use crate::types::{AppError, Result, SessionClaims, SessionSubject};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Source of the current time for token issuance and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues, verifies and refreshes signed session tokens.
///
/// Tokens are HS256 JWTs carrying [`SessionClaims`]. The service holds no
/// per-session state: a token is valid exactly when its signature checks out
/// and its `exp` lies in the future.
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionTokenService {
    /// Creates a service signing with `secret`.
    ///
    /// Fails if the secret is shorter than [`MIN_SECRET_LEN`] bytes or the TTL
    /// is not positive. There is no fallback secret.
    pub fn new(secret: &str, ttl_secs: i64) -> Result<Self> {
        Self::with_clock(secret, ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, ttl_secs: i64, clock: Arc<dyn Clock>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Config(format!(
                "session signing secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if ttl_secs <= 0 {
            return Err(AppError::Config(
                "session TTL must be a positive number of seconds".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
            clock,
        })
    }

    /// Lifetime of every token this service mints.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mints a token for `subject`, valid from now until now + TTL.
    pub fn create_session(&self, subject: &SessionSubject) -> Result<String> {
        self.issue(subject, self.clock.now().timestamp())
    }

    /// Mints a token replacing `previous`.
    ///
    /// The new window starts at least one second after the old one, so the
    /// replacement always expires strictly later.
    pub fn renew_session(
        &self,
        subject: &SessionSubject,
        previous: &SessionClaims,
    ) -> Result<String> {
        let issued_at = self.clock.now().timestamp().max(previous.iat + 1);
        self.issue(subject, issued_at)
    }

    fn issue(&self, subject: &SessionSubject, issued_at: i64) -> Result<String> {
        let claims = SessionClaims {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            role: subject.role,
            is_authenticated: true,
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Returns the claims of a valid token, `None` for anything else.
    ///
    /// Callers cannot tell malformed, forged and expired tokens apart.
    pub fn verify_session(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against our own clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let claims = match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                return None;
            }
        };

        if claims.exp <= self.clock.now().timestamp() {
            tracing::debug!(sub = %claims.sub, "session token expired");
            return None;
        }

        if !claims.is_authenticated {
            tracing::debug!(sub = %claims.sub, "session token not marked authenticated");
            return None;
        }

        Some(claims)
    }

    /// Re-issues a valid token with a fresh validity window.
    ///
    /// Subject, email and role are copied from the old token as-is; the user
    /// directory is not consulted.
    pub fn refresh_session(&self, token: &str) -> Result<Option<String>> {
        match self.verify_session(token) {
            Some(claims) => self
                .renew_session(&SessionSubject::from(&claims), &claims)
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use std::sync::Mutex;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-chars";

    /// Clock that only moves when told to.
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn starting_now() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn subject() -> SessionSubject {
        SessionSubject {
            id: "user-123".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        }
    }

    fn create_test_service() -> SessionTokenService {
        SessionTokenService::new(SECRET, DEFAULT_SESSION_TTL_SECS).expect("valid service")
    }

    #[test]
    fn test_round_trip_preserves_identity() {
        let service = create_test_service();
        let token = service.create_session(&subject()).expect("should sign");

        let claims = service.verify_session(&token).expect("should verify");

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.is_authenticated);
    }

    #[test]
    fn test_expiry_is_24_hours_after_issue() {
        let service = create_test_service();
        let token = service.create_session(&subject()).unwrap();
        let claims = service.verify_session(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_flipped_signature_fails() {
        let service = create_test_service();
        let token = service.create_session(&subject()).unwrap();

        // A character in the middle of the signature segment.
        let mut bytes = token.into_bytes();
        let idx = bytes.len() - 10;
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(service.verify_session(&tampered).is_none());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let service = create_test_service();
        let token = service.create_session(&subject()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let other = service
            .create_session(&SessionSubject {
                role: Role::SuperAdmin,
                ..subject()
            })
            .unwrap();
        let other_payload = other.split('.').nth(1).unwrap();

        let forged = format!("{}.{}.{}", parts[0], other_payload, parts[2]);
        assert!(service.verify_session(&forged).is_none());
    }

    #[test]
    fn test_malformed_token_fails() {
        let service = create_test_service();
        assert!(service.verify_session("invalid.token.here").is_none());
        assert!(service.verify_session("").is_none());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let service1 =
            SessionTokenService::new("secret-one-that-is-32-chars-long", 900).unwrap();
        let service2 =
            SessionTokenService::new("secret-two-that-is-32-chars-long", 900).unwrap();

        let token = service1.create_session(&subject()).unwrap();
        assert!(service2.verify_session(&token).is_none());
    }

    #[test]
    fn test_expired_token_fails() {
        let clock = ManualClock::starting_now();
        let service =
            SessionTokenService::with_clock(SECRET, DEFAULT_SESSION_TTL_SECS, clock.clone())
                .unwrap();
        let token = service.create_session(&subject()).unwrap();

        clock.advance(Duration::hours(23));
        assert!(service.verify_session(&token).is_some());

        clock.advance(Duration::hours(1));
        assert!(
            service.verify_session(&token).is_none(),
            "token must be rejected at exactly exp"
        );
    }

    #[test]
    fn test_token_expired_in_real_time_fails() {
        // Issued 25 hours ago by a clock in the past, checked by the system clock.
        struct PastClock;
        impl Clock for PastClock {
            fn now(&self) -> DateTime<Utc> {
                Utc::now() - Duration::hours(25)
            }
        }

        let issuer = SessionTokenService::with_clock(
            SECRET,
            DEFAULT_SESSION_TTL_SECS,
            Arc::new(PastClock),
        )
        .unwrap();
        let token = issuer.create_session(&subject()).unwrap();

        assert!(create_test_service().verify_session(&token).is_none());
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let clock = ManualClock::starting_now();
        let service =
            SessionTokenService::with_clock(SECRET, DEFAULT_SESSION_TTL_SECS, clock.clone())
                .unwrap();
        let token = service.create_session(&subject()).unwrap();
        let original = service.verify_session(&token).unwrap();

        clock.advance(Duration::minutes(10));
        let refreshed = service
            .refresh_session(&token)
            .unwrap()
            .expect("valid token refreshes");
        let renewed = service.verify_session(&refreshed).unwrap();

        assert!(renewed.exp > original.exp);
        assert_eq!(renewed.sub, original.sub);
        assert_eq!(renewed.email, original.email);
        assert_eq!(renewed.role, original.role);
    }

    #[test]
    fn test_refresh_in_same_second_still_extends_expiry() {
        let clock = ManualClock::starting_now();
        let service =
            SessionTokenService::with_clock(SECRET, DEFAULT_SESSION_TTL_SECS, clock.clone())
                .unwrap();
        let token = service.create_session(&subject()).unwrap();
        let original = service.verify_session(&token).unwrap();

        let refreshed = service.refresh_session(&token).unwrap().unwrap();
        let renewed = service.verify_session(&refreshed).unwrap();
        assert!(renewed.exp > original.exp);

        // Chained refreshes keep moving forward.
        let again = service.refresh_session(&refreshed).unwrap().unwrap();
        assert!(service.verify_session(&again).unwrap().exp > renewed.exp);
    }

    #[test]
    fn test_refresh_rejects_invalid_and_expired() {
        let clock = ManualClock::starting_now();
        let service =
            SessionTokenService::with_clock(SECRET, DEFAULT_SESSION_TTL_SECS, clock.clone())
                .unwrap();
        let token = service.create_session(&subject()).unwrap();

        assert!(service.refresh_session("garbage").unwrap().is_none());

        clock.advance(Duration::hours(25));
        assert!(service.refresh_session(&token).unwrap().is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(SessionTokenService::new("too-short", DEFAULT_SESSION_TTL_SECS).is_err());
        assert!(SessionTokenService::new("", DEFAULT_SESSION_TTL_SECS).is_err());
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        assert!(SessionTokenService::new(SECRET, 0).is_err());
    }
}
