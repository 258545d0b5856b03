use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catcher_api::config::{self, ServerConfig};
use catcher_api::router::build_app_router;
use catcher_api::state::AppState;
use catcher_worker::{JobService, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "catcher_api=debug,catcher_worker=debug,catcher_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        db = %config.db_path.display(),
        signed_webhooks = config.webhook_secret.is_some(),
        "Loaded server configuration",
    );

    let registry = config::load_registry(&config.config_path)?;
    if registry.is_empty() {
        tracing::warn!("No processors configured; every job will fail");
    }

    // --- Database ---
    let pool = catcher_db::create_pool(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    catcher_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    catcher_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Recovery (before the worker and listener start) ---
    let service = JobService::new(pool);
    let recovered = service
        .recover_stale()
        .await
        .context("Failed to recover stale jobs")?;
    if recovered > 0 {
        tracing::warn!(recovered, "Requeued jobs interrupted by the previous run");
    }

    // --- Worker ---
    let cancel = CancellationToken::new();
    let worker = Worker::new(service.clone(), Arc::new(registry), config.worker_config());
    let worker_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    // --- Server ---
    let shutdown_timeout = config.shutdown_timeout();
    let addr = SocketAddr::new(config.host, config.port);
    let state = AppState {
        service,
        config: Arc::new(config),
    };
    let app = build_app_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Listening for webhooks");

    let mut server_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
        })
    };

    let early_exit = tokio::select! {
        () = shutdown_signal() => None,
        result = &mut server_handle => Some(result),
    };

    // --- Shutdown ---
    cancel.cancel();

    if let Some(result) = early_exit {
        let _ = tokio::time::timeout(shutdown_timeout, worker_handle).await;
        result.context("Server task panicked")?.context("Server error")?;
        anyhow::bail!("Server stopped unexpectedly");
    }

    match tokio::time::timeout(shutdown_timeout, server_handle).await {
        Ok(Ok(Ok(()))) => tracing::info!("Server stopped accepting connections"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Err(_) => tracing::warn!("Timed out waiting for in-flight requests"),
    }

    match tokio::time::timeout(shutdown_timeout, worker_handle).await {
        Ok(Ok(())) => tracing::info!("Job worker stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Job worker panicked"),
        Err(_) => tracing::warn!("Timed out waiting for the job worker"),
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
