//! HTTP listener lifecycle
//!
//! Runs the axum server on its own task and drains it when the shutdown
//! signal fires, bounded by a deadline.

use axum::Router;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::shutdown::ShutdownSignal;

/// How long in-flight requests get to finish after a shutdown signal
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server stopped without a shutdown request")]
    Crashed,

    #[error("server forced to shutdown: connections still open after {0:?}")]
    ForcedShutdown(Duration),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Bind the listening socket
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => info!(addr = %local, "Server listening"),
        Err(_) => info!(addr = %addr, "Server listening"),
    }
    Ok(listener)
}

/// Serve `router` until `shutdown` fires, then drain
///
/// Returns `Crashed` or `Serve` if the server ends before shutdown was
/// requested, and `ForcedShutdown` if connections are still open once
/// `drain_timeout` has elapsed.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: ShutdownSignal,
    drain_timeout: Duration,
) -> Result<(), ServerError> {
    let observer = shutdown.clone();
    let mut drain = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain.wait().await })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            let result = joined?;
            if observer.is_shutdown() {
                // Drained before this task observed the signal
                return result.map_err(ServerError::Serve);
            }
            error!("Server stopped unexpectedly");
            return Err(match result {
                Ok(()) => ServerError::Crashed,
                Err(e) => ServerError::Serve(e),
            });
        }
        _ = shutdown.wait() => {}
    }

    info!(
        timeout_secs = drain_timeout.as_secs_f64(),
        "Shutting down server..."
    );

    match tokio::time::timeout(drain_timeout, &mut server).await {
        Ok(joined) => {
            joined?.map_err(ServerError::Serve)?;
            info!("Server drained");
            Ok(())
        }
        Err(_) => {
            server.abort();
            error!(
                timeout_secs = drain_timeout.as_secs_f64(),
                "Connections still open at shutdown deadline"
            );
            Err(ServerError::ForcedShutdown(drain_timeout))
        }
    }
}
