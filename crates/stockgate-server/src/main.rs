//! Stockgate Server - Main entry point

use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use stockgate_common::logging::{init_logging, LogConfig};
use tokio::{signal, task::JoinHandle};
use tracing::{debug, info};

use stockgate_server::{
    api::{create_router, AppState},
    audit::{describe_metrics, AuditLogger},
    config::Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("stockgate-server".to_string())
        .filter_directives("stockgate_server=debug,tower_http=debug,axum=info".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env().unwrap_or_else(|_| LogConfig::default());

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Stockgate Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    describe_metrics();
    let state = AppState::from_config(&config);
    info!(
        capacity = config.audit.capacity,
        retention_days = config.audit.retention_days,
        "Audit log initialized"
    );

    let prune_handle = spawn_prune_task(
        state.audit.clone(),
        Duration::from_secs(config.audit.prune_interval_secs),
    );

    let app = create_router(state, &config);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    prune_handle.abort();
    info!("Server shut down gracefully");

    Ok(())
}

/// Prune expired audit entries on a fixed interval
fn spawn_prune_task(audit: Arc<AuditLogger>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = audit.prune_expired();
            debug!(removed, remaining = audit.len(), "Scheduled audit prune finished");
        }
    })
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
