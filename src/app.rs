//! Service lifecycle
//!
//! Startup order: database pool (optional), listener bind, serve. Shutdown
//! order: drain the listener, then close the pool. The pool is closed
//! whether or not the drain succeeded.

use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::Database;
use crate::server::{
    bind, build_router, serve, Probe, ServerError, ShutdownSignal, SHUTDOWN_TIMEOUT,
};

/// Open the pool, degrading to no database on failure
///
/// The service must come up even when the database does not.
pub async fn connect_database(url: &str) -> Option<Database> {
    match Database::open(url).await {
        Ok(db) => {
            info!("Connected to database");
            Some(db)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to database");
            warn!("Continuing without database connection...");
            None
        }
    }
}

/// Probe bound to the pool's ping, or absent without a pool
pub fn probe_for(database: Option<&Database>) -> Probe {
    match database {
        Some(db) => Probe::bound(db.clone()),
        None => Probe::Absent,
    }
}

/// Run the service until `shutdown` fires
pub async fn run(config: &Config, shutdown: ShutdownSignal) -> Result<(), ServerError> {
    let database = connect_database(&config.database.url).await;

    let result = async {
        let listener = bind(&config.server.addr()).await?;
        serve_until_shutdown(listener, database.as_ref(), shutdown, SHUTDOWN_TIMEOUT).await
    }
    .await;

    if let Some(db) = &database {
        db.close().await;
    }
    result
}

/// Serve on an already bound listener with an already opened (or absent) pool
///
/// Does not close the pool; the owner of `database` does that.
pub async fn serve_until_shutdown(
    listener: TcpListener,
    database: Option<&Database>,
    shutdown: ShutdownSignal,
    drain_timeout: Duration,
) -> Result<(), ServerError> {
    let probe = probe_for(database);
    info!(
        database_check = probe.is_bound(),
        "Health endpoint registered at /health"
    );

    serve(listener, build_router(probe), shutdown, drain_timeout).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "app_test.rs"]
mod tests;
