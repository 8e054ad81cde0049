//! Health probe capability
//!
//! The health handler only sees a [`Probe`]: either bound to something that
//! implements [`HealthCheck`], or explicitly absent when no database pool
//! exists.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::database::DatabaseError;

/// A single connectivity check against a downstream dependency
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), DatabaseError>;
}

/// Result of running a probe under a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No probe is bound; nothing was checked
    Skipped,
    Healthy,
    /// The check failed or missed the deadline; carries a readable cause
    Failed(String),
}

/// Health probe, bound to a checker or explicitly absent
#[derive(Clone, Default)]
pub enum Probe {
    Bound(Arc<dyn HealthCheck>),
    #[default]
    Absent,
}

impl Probe {
    pub fn bound(check: impl HealthCheck + 'static) -> Self {
        Self::Bound(Arc::new(check))
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    /// Run the probe once, giving up after `deadline`
    ///
    /// The in-flight check is dropped when the deadline fires, which cancels
    /// it along with any connection checkout it was waiting on.
    pub async fn run(&self, deadline: Duration) -> ProbeOutcome {
        let check = match self {
            Self::Absent => return ProbeOutcome::Skipped,
            Self::Bound(check) => check,
        };

        match tokio::time::timeout(deadline, check.check()).await {
            Ok(Ok(())) => ProbeOutcome::Healthy,
            Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
            Err(_) => ProbeOutcome::Failed(format!(
                "health check timed out after {}s",
                deadline.as_secs_f64()
            )),
        }
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bound(_) => f.write_str("Probe::Bound"),
            Self::Absent => f.write_str("Probe::Absent"),
        }
    }
}

/// Stand-in checkers for exercising the handler without a database
#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use tokio::sync::Notify;

    pub struct Healthy;

    #[async_trait]
    impl HealthCheck for Healthy {
        async fn check(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    /// Fails with a protocol error carrying `0`
    pub struct Failing(pub &'static str);

    #[async_trait]
    impl HealthCheck for Failing {
        async fn check(&self) -> Result<(), DatabaseError> {
            Err(DatabaseError::PingFailed(sqlx::Error::Protocol(
                self.0.to_string(),
            )))
        }
    }

    /// Never completes
    pub struct Hanging;

    #[async_trait]
    impl HealthCheck for Hanging {
        async fn check(&self) -> Result<(), DatabaseError> {
            std::future::pending().await
        }
    }

    /// Succeeds after `delay`, notifying `started` on entry
    pub struct Slow {
        pub delay: Duration,
        pub started: Arc<Notify>,
    }

    #[async_trait]
    impl HealthCheck for Slow {
        async fn check(&self) -> Result<(), DatabaseError> {
            self.started.notify_one();
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }
}
