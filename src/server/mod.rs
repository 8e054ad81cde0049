//! HTTP server for the health endpoint
//!
//! Provides:
//! - `/health` - API liveness plus a database ping when a pool is bound
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

mod health;
mod listener;
mod probe;
pub mod shutdown;

pub use health::{build_router, health, HealthResponse, PROBE_TIMEOUT};
pub use listener::{bind, serve, ServerError, SHUTDOWN_TIMEOUT};
pub use probe::{HealthCheck, Probe, ProbeOutcome};
pub use shutdown::{
    forward_shutdown, forward_signals, shutdown_channel, wait_for_signal, ShutdownController,
    ShutdownSignal,
};

#[cfg(test)]
pub(crate) use probe::fakes;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "listener_test.rs"]
mod listener_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
