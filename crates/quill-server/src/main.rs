//! Quill - multi-tenant content service

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, CorsConfig, LogFormat, LoggingConfig};
use quill_api::{AppState, create_router};
use quill_auth::{TokenCodec, hash_password};
use quill_db::{Database, NewUser, UserRole};

/// Quill - multi-tenant content service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "QUILL_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "QUILL_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "QUILL_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }

    init_logging(&config.logging);
    config.validate()?;

    info!("Starting Quill v{}", env!("CARGO_PKG_VERSION"));

    // Create the database directory
    if let Some(parent) = Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url).await?;

    bootstrap_admin(&db, config.auth.bootstrap_admin_password.as_deref()).await?;

    let tokens = Arc::new(
        TokenCodec::new(
            &config.auth.jwt_secret,
            &config.auth.issuer,
            config.auth.token_ttl_secs,
        )
        .context("Invalid token configuration")?,
    );

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let state = AppState::new(db.clone(), tokens);
    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

/// Create the `admin` account on an empty database
async fn bootstrap_admin(db: &Database, password: Option<&str>) -> Result<()> {
    if db.has_users().await? {
        return Ok(());
    }

    let Some(password) = password else {
        warn!("No users exist and auth.bootstrap_admin_password is not set; no admin account was created");
        return Ok(());
    };

    let password_hash = hash_password(password)?;
    db.insert_user(NewUser {
        username: "admin".to_string(),
        password_hash,
        avatar: None,
        role: UserRole::Admin,
    })
    .await?;
    info!("Created bootstrap admin account 'admin'");
    Ok(())
}

/// Build the CORS layer from the allowed origins
fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer> {
    let origins = if cors.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let list = cors
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {}", o))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(list)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
