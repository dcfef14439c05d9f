//! CLI module for Gatekeeper
//!
//! Provides command-line interface parsing for the gatekeeper-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gatekeeper - session authentication server for the admin console
#[derive(Parser, Debug)]
#[command(
    name = "gatekeeper-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Gatekeeper - session authentication server for the admin console",
    long_about = "Issues signed session cookies after credential checks, guards page routes\n\
                  and serves role-checked admin APIs.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a config.",
    after_help = "EXAMPLES:\n    \
                  gatekeeper-server init                         # Write gatekeeper.toml and .env.example\n    \
                  gatekeeper-server add-user a@b.com -p secret   # Register local credentials\n    \
                  gatekeeper-server                              # Start the server (requires gatekeeper.toml)\n    \
                  gatekeeper-server --config my.toml             # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "gatekeeper.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold gatekeeper.toml, .env.example and the data directory
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Register (or reset) credentials with the local identity provider
    AddUser {
        /// Login email
        email: String,

        /// Password; read from GATEKEEPER_PASSWORD when omitted
        #[arg(short, long, env = "GATEKEEPER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name used when the user first signs in
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serving() {
        let cli = Cli::try_parse_from(["gatekeeper-server"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("gatekeeper.toml"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_add_user_args() {
        let cli = Cli::try_parse_from([
            "gatekeeper-server",
            "add-user",
            "ops@example.com",
            "--password",
            "pw",
            "--name",
            "Ops",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::AddUser {
                email,
                password,
                name,
            }) => {
                assert_eq!(email, "ops@example.com");
                assert_eq!(password, "pw");
                assert_eq!(name.as_deref(), Some("Ops"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["gatekeeper-server", "config", "--validate", "-c", "x.toml"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(
            cli.command,
            Some(Commands::Config { validate: true })
        ));
    }
}
