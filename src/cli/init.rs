//! Init command implementation
//!
//! Writes a starter `gatekeeper.toml`, a `.env.example` listing every secret
//! the config refers to, and the `data/` directory for the SQLite file.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    Success,
    /// gatekeeper.toml exists and `--force` was not given
    AlreadyExists,
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    pub host: String,
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Gatekeeper");

    let base = &config.path;
    let config_path = base.join("gatekeeper.toml");
    if config_path.exists() && !config.force {
        output.warning("gatekeeper.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else if let Err(e) = fs::create_dir_all(&data_dir) {
        output.error(&format!("Failed to create data: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("directory", "data");
    }

    let files = [
        ("config", "gatekeeper.toml", generate_config_toml(&config)),
        ("env", ".env.example", generate_env_example()),
    ];
    for (kind, name, content) in files {
        if let Err(e) = write_file(&base.join(name), &content, config.force) {
            output.error(&format!("Failed to create {}: {}", name, e));
            return InitResult::Error(e.to_string());
        }
        output.created(kind, name);
    }

    output.success("Gatekeeper project initialized");

    output.header("Next Steps");
    output.info("1. Copy the env file and set JWT_SECRET (at least 32 characters):");
    output.command("cp .env.example .env");
    output.command("openssl rand -hex 32");
    output.info("2. Register the first account:");
    output.command("gatekeeper-server add-user admin@example.com --password '...'");
    output.info("3. Start the server:");
    output.command("gatekeeper-server");
    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_config_toml(config: &InitConfig) -> String {
    format!(
        r#"# Gatekeeper configuration

[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"
# Cookies are only marked Secure in production
environment = "production"
# static_dir = "./public"
# cors_origins = ["https://admin.example.com"]

[auth]
# Name of the environment variable holding the signing secret
jwt_secret_env = "JWT_SECRET"
# 24 hours
session_ttl_secs = 86400
super_admin_email_env = "SUPER_ADMIN_EMAIL"

[database]
url = "./data/gatekeeper.db"

[routes]
protected = ["/dashboard"]
auth_only = ["/login"]
login_path = "/login"
landing_path = "/dashboard"

[settings]
default_llm_model = "amazon.nova-micro-v1:0"
default_document_bucket = "chatbot-documents"
embedding_model = "amazon.titan-embed-text-v1"
"#,
        host = config.host,
        port = config.port
    )
}

fn generate_env_example() -> String {
    r#"# Gatekeeper Environment Variables
# Copy this file to .env and fill in the values.

# REQUIRED: session signing secret (minimum 32 characters).
# The server refuses to start while this is empty.
# Generate one with: openssl rand -hex 32
JWT_SECRET=

# Optional: this email becomes super_admin on first login
SUPER_ADMIN_EMAIL=admin@example.com

# Optional: log filter, overrides server.log_level
RUST_LOG=info,gatekeeper=debug

# Optional: sources for the default admin settings
# BEDROCK_AWS_ACCESS_KEY_ID=
# BEDROCK_AWS_SECRET_ACCESS_KEY=
# BEDROCK_AWS_REGION=us-east-1
# S3_DOCUMENT_BUCKET=chatbot-documents
# MISTRAL_API_KEY=
"#
    .to_string()
}
