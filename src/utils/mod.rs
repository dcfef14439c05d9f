//! Configuration utilities.

/// TOML configuration (`gatekeeper.toml`).
pub mod toml_config;
