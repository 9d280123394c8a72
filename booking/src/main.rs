//! Imaging booking HTTP server.

use anyhow::Context;
use imaging_booking::bootstrap::Resources;
use imaging_booking::config::Config;
use imaging_booking::metrics::register_business_metrics;
use imaging_booking::server::{build_router, AppState};
use imaging_booking_runtime::metrics::install_recorder;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,imaging_booking=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting imaging booking server");

    let config = Config::from_env();
    info!(
        address = %config.server.address(),
        sandbox_gateway = config.gateway.is_sandbox(),
        smtp = config.email.smtp_host.is_some(),
        "Configuration loaded"
    );

    let metrics_handle = install_recorder().context("installing metrics recorder")?;
    register_business_metrics();

    let resources = Resources::from_config(&config)
        .await
        .context("initializing resources")?;

    let state = AppState::new(
        resources.appointments.clone(),
        resources.store.clone(),
        metrics_handle,
    );
    let app = build_router(state);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("HTTP server stopped, draining notifications");
    if let Err(e) = resources.runner.shutdown(config.shutdown_timeout()).await {
        warn!(error = %e, "Notifications still pending at shutdown");
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed the error is logged and that signal is
/// never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
