//! TOML-based configuration for Gatekeeper
//!
//! Infrastructure settings (listen address, session lifetime, database, page
//! routing rules, default admin settings) come from `gatekeeper.toml`.
//! Secrets never live in the file: the file names the environment variable
//! that holds them (`*_env` fields) and they are resolved at load time.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::jwt::{DEFAULT_SESSION_TTL_SECS, MIN_SECRET_LEN};

/// Root configuration structure loaded from gatekeeper.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Page routing guard rules
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Sources for the default admin settings
    #[serde(default)]
    pub settings: SettingsConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// `production` turns on the `Secure` cookie attribute
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Directory served for page requests, behind the routing guard
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            environment: default_environment(),
            static_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the session signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Session lifetime in seconds; also the cookie Max-Age
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,

    /// Environment variable name containing the bootstrap super admin email
    #[serde(default = "default_super_admin_email_env")]
    pub super_admin_email_env: String,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_session_ttl() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_super_admin_email_env() -> String {
    "SUPER_ADMIN_EMAIL".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            session_ttl_secs: default_session_ttl(),
            super_admin_email_env: default_super_admin_email_env(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "./data/gatekeeper.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

// ============= Routing Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Path prefixes that require a session
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,

    /// Path prefixes only shown to visitors without a session
    #[serde(default = "default_auth_only")]
    pub auth_only: Vec<String>,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Where authenticated users land
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
}

fn default_protected() -> Vec<String> {
    vec!["/dashboard".to_string()]
}

fn default_auth_only() -> Vec<String> {
    vec!["/login".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/dashboard".to_string()
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            protected: default_protected(),
            auth_only: default_auth_only(),
            login_path: default_login_path(),
            landing_path: default_landing_path(),
        }
    }
}

// ============= Admin Settings Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_bedrock_access_key_env")]
    pub bedrock_access_key_env: String,

    #[serde(default = "default_bedrock_secret_key_env")]
    pub bedrock_secret_key_env: String,

    #[serde(default = "default_bedrock_region_env")]
    pub bedrock_region_env: String,

    #[serde(default = "default_bedrock_region")]
    pub default_bedrock_region: String,

    #[serde(default = "default_llm_model")]
    pub default_llm_model: String,

    #[serde(default = "default_document_bucket_env")]
    pub document_bucket_env: String,

    #[serde(default = "default_document_bucket")]
    pub default_document_bucket: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_mistral_api_key_env")]
    pub mistral_api_key_env: String,
}

fn default_bedrock_access_key_env() -> String {
    "BEDROCK_AWS_ACCESS_KEY_ID".to_string()
}

fn default_bedrock_secret_key_env() -> String {
    "BEDROCK_AWS_SECRET_ACCESS_KEY".to_string()
}

fn default_bedrock_region_env() -> String {
    "BEDROCK_AWS_REGION".to_string()
}

fn default_bedrock_region() -> String {
    "us-east-1".to_string()
}

fn default_llm_model() -> String {
    "amazon.nova-micro-v1:0".to_string()
}

fn default_document_bucket_env() -> String {
    "S3_DOCUMENT_BUCKET".to_string()
}

fn default_document_bucket() -> String {
    "chatbot-documents".to_string()
}

fn default_embedding_model() -> String {
    "amazon.titan-embed-text-v1".to_string()
}

fn default_mistral_api_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            bedrock_access_key_env: default_bedrock_access_key_env(),
            bedrock_secret_key_env: default_bedrock_secret_key_env(),
            bedrock_region_env: default_bedrock_region_env(),
            default_bedrock_region: default_bedrock_region(),
            default_llm_model: default_llm_model(),
            document_bucket_env: default_document_bucket_env(),
            default_document_bucket: default_document_bucket(),
            embedding_model: default_embedding_model(),
            mistral_api_key_env: default_mistral_api_key_env(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl GatekeeperConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// The server refuses to start on error: there is no fallback signing
    /// secret.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without resolving secrets, for commands that never
    /// sign sessions.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate the configuration and the availability of its secrets
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt_secret()?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {} bytes long",
                self.auth.jwt_secret_env, MIN_SECRET_LEN
            )));
        }

        if self.auth.session_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_ttl_secs must be positive".to_string(),
            ));
        }

        if !matches!(self.server.log_format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "server.log_format must be 'pretty' or 'json', got '{}'",
                self.server.log_format
            )));
        }

        let routes = &self.routes;
        let paths = routes
            .protected
            .iter()
            .chain(routes.auth_only.iter())
            .chain([&routes.login_path, &routes.landing_path]);
        for path in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "route path '{}' must start with '/'",
                    path
                )));
            }
        }

        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Get the session signing secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.auth.jwt_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }

    /// Email that is granted `super_admin` on first login, if configured
    pub fn super_admin_email(&self) -> Option<String> {
        self.resolve_env(&self.auth.super_admin_email_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "test-secret-at-least-32-characters-long";

    fn config_with_secret_env(name: &str) -> GatekeeperConfig {
        let mut config = GatekeeperConfig::default();
        config.auth.jwt_secret_env = name.to_string();
        config
    }

    #[test]
    fn test_parse_config() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 8080
environment = "development"

[auth]
jwt_secret_env = "GK_TEST_PARSE_SECRET"
session_ttl_secs = 3600

[database]
url = ":memory:"

[routes]
protected = ["/dashboard", "/admin"]
"#;
        let config: GatekeeperConfig = toml::from_str(content).expect("Failed to parse config");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.is_production());
        assert_eq!(config.auth.session_ttl_secs, 3600);
        assert_eq!(config.routes.protected, vec!["/dashboard", "/admin"]);
        assert_eq!(config.routes.login_path, "/login");
        assert_eq!(config.settings.default_llm_model, "amazon.nova-micro-v1:0");
    }

    #[test]
    fn test_defaults() {
        let config: GatekeeperConfig = toml::from_str("").unwrap();

        assert!(config.server.is_production());
        assert_eq!(config.auth.jwt_secret_env, "JWT_SECRET");
        assert_eq!(config.auth.session_ttl_secs, 86_400);
        assert_eq!(config.routes.landing_path, "/dashboard");
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let config = config_with_secret_env("GK_TEST_SECRET_NEVER_SET");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(name)) if name == "GK_TEST_SECRET_NEVER_SET"
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("GK_TEST_SHORT_SECRET", "too-short");
        }
        let config = config_with_secret_env("GK_TEST_SHORT_SECRET");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_relative_route_rejected() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("GK_TEST_ROUTE_SECRET", SECRET);
        }
        let mut config = config_with_secret_env("GK_TEST_ROUTE_SECRET");
        assert!(config.validate().is_ok());

        config.routes.protected.push("admin".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("GK_TEST_LOAD_SECRET", SECRET);
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[auth]\njwt_secret_env = \"GK_TEST_LOAD_SECRET\"\n\n[server]\nlog_format = \"json\""
        )
        .unwrap();

        let config = GatekeeperConfig::load(file.path()).unwrap();
        assert_eq!(config.server.log_format, "json");
        assert_eq!(config.jwt_secret().unwrap(), SECRET);
    }

    #[test]
    fn test_load_missing_file() {
        let result = GatekeeperConfig::load("/nonexistent/gatekeeper.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
