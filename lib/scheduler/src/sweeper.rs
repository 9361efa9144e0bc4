//! Periodic expiry of idle call sessions.
//!
//! Expiry is decided by the store's clock; the period is driven by
//! `tokio::time`. Pausing tokio time and swapping in a manual clock makes the
//! whole loop deterministic.

use crate::error::SweepError;
use phone_agent_conversation::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Sweep period and retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Sessions idle for longer than this are removed.
    pub max_age: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl SweepConfig {
    /// Checks that the sweeper can run with these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero or the max age does not fit
    /// a calendar duration.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.interval.is_zero() {
            return Err(SweepError::ZeroInterval);
        }
        self.max_age_delta().map(|_| ())
    }

    fn max_age_delta(&self) -> Result<chrono::Duration, SweepError> {
        chrono::Duration::from_std(self.max_age).map_err(|_| SweepError::InvalidMaxAge {
            seconds: self.max_age.as_secs(),
        })
    }
}

/// Removes idle sessions from a store.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn SessionStore>,
    config: SweepConfig,
}

impl std::fmt::Debug for ExpirySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExpirySweeper {
    /// Creates a sweeper over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`SweepConfig::validate`].
    pub fn new(store: Arc<dyn SessionStore>, config: SweepConfig) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    #[must_use]
    pub fn config(&self) -> SweepConfig {
        self.config
    }

    /// Performs one sweep, returning how many sessions were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the max age is out of range or the store fails.
    pub async fn run_once(&self) -> Result<usize, SweepError> {
        let max_age = self.config.max_age_delta()?;
        Ok(self.store.sweep_expired(max_age).await?)
    }

    /// Starts sweeping every `interval`, first one interval from now.
    ///
    /// Failed sweeps are logged and the loop carries on. Abort the returned
    /// handle to stop.
    pub fn spawn(self) -> JoinHandle<()> {
        let period = self.config.interval;
        info!(
            interval_secs = period.as_secs(),
            max_age_secs = self.config.max_age.as_secs(),
            "starting session expiry sweeper"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "periodic session sweep");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "failed to sweep expired sessions");
                    }
                }
            }
        })
    }
}
