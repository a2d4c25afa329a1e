//! Bounded auto-recovery
//!
//! [`RetryPolicy`] wraps any fallible async operation with a fixed-delay
//! retry loop. The delay only suspends the task running the policy; other
//! triggers and the dispatcher keep going.
//!
//! ```text
//! attempt 0 ──fail──► sleep ──► attempt 1 ──fail──► ... ──► attempt N ──fail──► RecoveryExhausted
//!     │                             │                           │
//!     └──ok──► return               └──ok──► return             └──ok──► return
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::AutoRecoveryConfig;
use crate::error::{Error, Result};

/// Fixed-delay retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// When false the operation runs exactly once
    enabled: bool,

    /// Retries after the initial attempt
    max_retries: u32,

    /// Pause before each retry
    retry_interval: Duration,
}

impl RetryPolicy {
    pub fn new(enabled: bool, max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            enabled,
            max_retries,
            retry_interval,
        }
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::new(false, 0, Duration::ZERO)
    }

    pub fn from_config(config: &AutoRecoveryConfig) -> Self {
        Self::new(config.enabled, config.max_retries, config.retry_interval)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Attempts made before giving up: the first try plus every retry
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` under this policy, sleeping with `tokio::time::sleep`
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_with_delay(op, tokio::time::sleep).await
    }

    /// Run `op` under this policy with an injected delay function
    ///
    /// # Behavior
    ///
    /// - Disabled: one attempt, its error returned verbatim
    /// - Enabled: one attempt plus up to `max_retries` retries, each preceded
    ///   by `delay(retry_interval)`; the first success is returned
    /// - Terminal errors (see [`Error::is_terminal`]) are returned immediately
    /// - Exhaustion yields [`Error::RecoveryExhausted`] wrapping the last error
    pub async fn run_with_delay<T, F, Fut, D, DFut>(&self, mut op: F, mut delay: D) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        D: FnMut(Duration) -> DFut,
        DFut: Future<Output = ()>,
    {
        let first_error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !self.enabled {
            error!("Operation failed, auto-recovery disabled: {}", first_error);
            return Err(first_error);
        }
        if first_error.is_terminal() {
            error!("Operation failed with a terminal error, not retrying: {}", first_error);
            return Err(first_error);
        }

        warn!(
            "Operation failed, starting auto-recovery (max retries: {}): {}",
            self.max_retries, first_error
        );

        let mut last_error = first_error;
        for attempt in 1..=self.max_retries {
            info!(
                "Auto-recovery attempt {}/{}, waiting {:?}",
                attempt, self.max_retries, self.retry_interval
            );
            delay(self.retry_interval).await;

            match op().await {
                Ok(value) => {
                    info!("Auto-recovery succeeded on attempt {}", attempt);
                    return Ok(value);
                }
                Err(e) if e.is_terminal() => {
                    error!("Auto-recovery hit a terminal error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Auto-recovery attempt {} failed: {}", attempt, e);
                    last_error = e;
                }
            }
        }

        error!(
            "Auto-recovery exhausted after {} retries: {}",
            self.max_retries, last_error
        );
        Err(Error::recovery_exhausted(self.max_attempts(), last_error))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AutoRecoveryConfig::default())
    }
}
