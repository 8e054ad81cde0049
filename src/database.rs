//! PostgreSQL connection pool
//!
//! Owns the pool policy and exposes the two operations the rest of the
//! service needs: a connectivity ping and an idempotent close.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::Connection;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::server::HealthCheck;

pub const MAX_CONNECTIONS: u32 = 25;
pub const MIN_CONNECTIONS: u32 = 5;
pub const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound on waiting for a pooled connection, including the driver's
/// connect retries against an unreachable host
///
/// Together with `DIAGNOSE_TIMEOUT` this stays under the health handler's
/// 5 second probe deadline.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on the one direct connect made to explain a pool timeout
pub const DIAGNOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to parse database URL: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("failed to ping database: {0}")]
    PingFailed(#[source] sqlx::Error),

    #[error("database connection pool is unavailable")]
    PoolUnavailable,
}

/// Handle to a verified connection pool
///
/// Clones share the same underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the pool and verify it with a single ping
    ///
    /// On ping failure the pool is closed before returning, so callers never
    /// hold a half-open handle.
    pub async fn open(url: &str) -> Result<Self, DatabaseError> {
        let options = PgConnectOptions::from_str(url).map_err(DatabaseError::InvalidUrl)?;

        let pool = pool_options().connect_lazy_with(options);

        if let Err(e) = ping(&pool).await {
            pool.close().await;
            return Err(DatabaseError::PingFailed(e));
        }

        info!(
            max_connections = MAX_CONNECTIONS,
            min_connections = MIN_CONNECTIONS,
            "Database connection pool established"
        );
        Ok(Self { pool })
    }

    /// Underlying pool, for query code
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ping the database through the pool
    ///
    /// A closed pool is reported as unavailable without touching the network.
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        if self.pool.is_closed() {
            return Err(DatabaseError::PoolUnavailable);
        }
        ping(&self.pool).await.map_err(DatabaseError::PingFailed)
    }

    /// Release every pooled connection
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub async fn close(&self) {
        if self.pool.is_closed() {
            debug!("Database pool already closed");
            return;
        }
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Pool with the production policy that has not connected yet
    #[cfg(test)]
    pub(crate) fn lazy(url: &str) -> Self {
        let options = PgConnectOptions::from_str(url).expect("test URL should parse");
        Self {
            pool: pool_options().connect_lazy_with(options),
        }
    }
}

#[async_trait]
impl HealthCheck for Database {
    async fn check(&self) -> Result<(), DatabaseError> {
        self.health_check().await
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(MIN_CONNECTIONS)
        .max_lifetime(MAX_LIFETIME)
        .idle_timeout(IDLE_TIMEOUT)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        // The explicit ping below is the liveness check
        .test_before_acquire(false)
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    match pool.acquire().await {
        Ok(mut conn) => conn.ping().await,
        Err(sqlx::Error::PoolTimedOut) => Err(diagnose_timeout(pool).await),
        Err(e) => Err(e),
    }
}

/// Find out why the pool could not hand out a connection
///
/// The pool retries refused connects until it times out and then reports
/// only `PoolTimedOut`. One direct connect surfaces the driver's own error.
/// If that connect succeeds the pool was merely exhausted.
async fn diagnose_timeout(pool: &PgPool) -> sqlx::Error {
    let options = pool.connect_options();
    let attempt = PgConnection::connect_with(&options);
    match tokio::time::timeout(DIAGNOSE_TIMEOUT, attempt).await {
        Ok(Ok(conn)) => {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Failed to close diagnostic connection");
            }
            sqlx::Error::PoolTimedOut
        }
        Ok(Err(e)) => e,
        Err(_) => sqlx::Error::PoolTimedOut,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "database_test.rs"]
mod tests;
