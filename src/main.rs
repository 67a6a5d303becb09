mod config;
mod git;
mod health;
mod http;
mod metrics;
mod repository;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::AnyPool;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::metrics::MetricsRegistry;
use crate::repository::Provisioner;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "repoforge", about = "Bare Git repository provisioning service")]
struct Cli {
    /// Optional YAML configuration file.  Flags and environment variables
    /// take precedence over values in the file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Absolute directory under which repositories are created.
    #[arg(long, env = "GIT_ROOT")]
    git_root: Option<String>,

    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Database connection string.
    #[arg(long, env = "DB_CONNINFO", hide_env_values = true)]
    db_conninfo: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            git_root: self.git_root.clone(),
            host: self.host.clone(),
            port: self.port,
            db_conninfo: self.db_conninfo.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Global state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: AnyPool,
    pub provisioner: Provisioner,
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(config: Arc<Config>, pool: AnyPool) -> Self {
        let provisioner = Provisioner::new(pool.clone(), &config.repositories);
        Self {
            config,
            pool,
            provisioner,
            metrics: MetricsRegistry::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP server (axum)
// ---------------------------------------------------------------------------

async fn run_http_server(state: AppState) -> Result<()> {
    let listen_addr = state.config.server.listen_addr();
    let app = http::handler::create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- .env (must precede CLI parsing so `env = ...` sees its values) ----
    let env_file = config::load_env_file(Path::new(".env"));

    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    match env_file {
        Ok(true) => tracing::info!("loaded environment from .env"),
        Ok(false) => tracing::debug!("no .env file found"),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid .env file");
            return Err(e);
        }
    }

    // ---- Config ----
    let config = config::load_config(cli.config.as_deref(), cli.overrides())?;
    let config = Arc::new(config);

    tracing::info!(
        git_root = %config.repositories.git_root,
        listen_addr = %config.server.listen_addr(),
        "starting repoforge"
    );

    // ---- Ensure the repository root exists ----
    tokio::fs::create_dir_all(&config.repositories.git_root)
        .await
        .with_context(|| {
            format!(
                "failed to create git root: {}",
                config.repositories.git_root
            )
        })?;

    // ---- Database ----
    let pool = store::build_db_pool(&config.database).await?;
    store::migrate(&pool).await?;

    // ---- Serve ----
    let state = AppState::new(Arc::clone(&config), pool.clone());
    let result = run_http_server(state).await;

    pool.close().await;
    tracing::info!("repoforge shut down cleanly");
    result
}
