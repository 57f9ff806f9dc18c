//! Academy - marketing site and back-office API for an adult-education provider

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use academy_api::{AppState, LogMailer, create_router};
use academy_auth::JwtManager;
use academy_db::{Database, NewUser, UserRole};
use config::{Config, Environment};

/// Academy API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "ACADEMY_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "ACADEMY_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "ACADEMY_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// `development` or `production`
    #[arg(long, env = "ACADEMY_ENV")]
    environment: Option<Environment>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if let Some(environment) = args.environment {
        config.environment = environment;
    }

    init_logging(&config.logging.level, &config.logging.format);

    info!("Starting Academy v{}", env!("CARGO_PKG_VERSION"));
    config.validate().context("Invalid configuration")?;
    if !config.environment.is_production() {
        warn!("Running in development mode; cookies are not marked Secure");
    }

    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }
    }

    let db = Database::new(&config.database_url())
        .await
        .context("Failed to open database")?;

    bootstrap_admin(&db, &config).await?;

    let purged = db.purge_expired_provider_sessions().await?;
    if purged > 0 {
        info!("Purged {} expired provider sessions", purged);
    }

    let settings = db
        .load_site_settings()
        .await
        .context("Failed to load site settings")?;

    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_hours,
    ));

    let state = AppState::new(
        db,
        jwt,
        config.auth_options()?,
        settings,
        Arc::new(LogMailer),
    );
    info!("Identity trust policy: {}", state.resolver.policy());

    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_addr, port))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the configured administrator when no users exist yet
async fn bootstrap_admin(db: &Database, config: &Config) -> Result<()> {
    if db.has_users().await? {
        return Ok(());
    }

    let Some((email, password)) = config.bootstrap.admin_credentials() else {
        warn!("No users exist and no bootstrap admin is configured");
        return Ok(());
    };

    let password_hash = academy_auth::hash_password(password)?;
    let bootstrap = &config.bootstrap;
    let admin = db
        .insert_user(NewUser {
            email: email.trim().to_lowercase(),
            first_name: bootstrap
                .admin_first_name
                .clone()
                .unwrap_or_else(|| "Site".to_string()),
            last_name: bootstrap
                .admin_last_name
                .clone()
                .unwrap_or_else(|| "Administrator".to_string()),
            phone: None,
            password_hash,
            role: UserRole::Admin,
            is_email_verified: true,
            verification_token: None,
            verification_expires_at: None,
        })
        .await
        .context("Failed to create bootstrap admin")?;

    info!("Bootstrap admin created: {}", admin.email);
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
