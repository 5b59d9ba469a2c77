//! `stashd`: the record submission server binary.
//!
//! Usage:
//!   stashd [--port <port>] [--db <path>] [--jwt-secret <secret>]
//!   stashd issue-token --subject <name> [--ttl-secs <n>]
//!
//! Every flag can also be set through its environment variable (see `--help`).

mod catch_all;
mod cli;
mod rate_limit;
mod routes;
mod security;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use stash_core::{Authenticator, JwtAuthenticator, Module, ServiceConfig};
use submit::SubmitModule;
use tracing::info;

use cli::{Cli, Command};
use rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment.
    let dotenv = dotenvy::dotenv();

    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let config = cli.server.into_config();
    config.verify()?;

    match cli.command {
        Some(Command::IssueToken { subject, ttl_secs }) => {
            let token = JwtAuthenticator::new(&config.jwt_secret)
                .issue(&subject, Duration::from_secs(ttl_secs))?;
            println!("{}", token);
            Ok(())
        }
        None => serve(config).await,
    }
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    // Open the store. This handle lives until shutdown completes.
    info!("Opening store at {}", config.db_path.display());
    let kv: Arc<dyn stash_kv::KVStore> = Arc::new(
        stash_kv::RedbStore::open(&config.db_path)
            .map_err(|e| anyhow::anyhow!("failed to open store: {}", e))?,
    );

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(JwtAuthenticator::new(&config.jwt_secret));

    let submit_module = SubmitModule::new(Arc::clone(&kv), authenticator, &config);
    info!(
        hash_secrets = config.hash_secrets,
        "Submit module initialized"
    );

    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    info!(
        window_secs = config.rate_limit.window.as_secs(),
        max_requests = config.rate_limit.max_requests,
        "Rate limiting enabled"
    );

    let module_routes = vec![(submit_module.name(), submit_module.routes())];
    let app = routes::build_router(module_routes, limiter);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("App is listening on {}", config.listen);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // In-flight requests have drained; release the store last.
    drop(submit_module);
    drop(kv);
    info!("Store closed, shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining requests");
}
