//! Server lifecycle management
//!
//! Binds the HTTP listener, serves the login router and drains in-flight
//! requests on SIGTERM or Ctrl+C.

use tokio::sync::watch;
use tracing::{error, info};

use authgate_api::http::{create_router, AppState};
use authgate_core::{bootstrap::Services, Config};

pub struct AuthGateServer {
    config: Config,
    services: Services,
}

impl AuthGateServer {
    pub const fn new(config: Config, services: Services) -> Self {
        Self { config, services }
    }

    /// Start the HTTP server and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;

        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;
        info!("HTTP server listening on {}", http_addr);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let router = create_router(AppState::from(self.services));

        let mut http_handle = tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
                return Err(anyhow::anyhow!("HTTP server stopped unexpectedly"));
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);
        if let Err(e) = http_handle.await {
            error!("HTTP server task failed: {}", e);
        }

        info!("authgate stopped");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
