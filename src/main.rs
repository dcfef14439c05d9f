use anyhow::Context;
use gatekeeper::{
    build_router,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    db::DatabaseProvider,
    idp::LocalIdentityProvider,
    AppState, GatekeeperConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            host,
            port,
        }) => match init::run(
            InitConfig {
                path,
                force,
                host,
                port,
            },
            &output,
        ) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
        },
        Some(Commands::AddUser {
            email,
            password,
            name,
        }) => add_user(&cli.config, &email, &password, name.as_deref(), &output).await,
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        None => serve(&cli.config, cli.verbose).await,
    }
}

fn init_tracing(config: &GatekeeperConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.server.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config = GatekeeperConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_tracing(&config, verbose);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.server.environment.clone();

    let state = AppState::from_config(config)
        .await
        .context("failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, %environment, "gatekeeper listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("gatekeeper stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn add_user(
    config_path: &Path,
    email: &str,
    password: &str,
    name: Option<&str>,
    output: &Output,
) -> anyhow::Result<()> {
    let config = GatekeeperConfig::read(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    let db = DatabaseProvider::from_url(&config.database.url)
        .create_client()
        .await
        .context("failed to open database")?;
    let idp = LocalIdentityProvider::new(Arc::new(db));

    idp.register(email, password, name)
        .await
        .context("failed to register credentials")?;

    output.success(&format!("Credentials stored for {}", email));
    Ok(())
}

fn show_config(config_path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = GatekeeperConfig::read(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    output.header("Configuration");
    output.kv("file", &config_path.display().to_string());
    output.kv(
        "listen",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv("environment", &config.server.environment);
    output.kv("database", &config.database.url);
    output.kv("session ttl", &format!("{}s", config.auth.session_ttl_secs));
    output.kv("protected", &config.routes.protected.join(", "));
    output.kv("auth only", &config.routes.auth_only.join(", "));

    if validate {
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("invalid configuration");
            }
        }
    }

    Ok(())
}
