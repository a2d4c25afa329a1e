//! Acceleration cycle controller
//!
//! The AccelerationController is responsible for:
//! - Reopening the acceleration entitlement via AccelerationClient
//! - Classifying the provider's reopen code
//! - Querying the entitlement and evaluating it
//! - Recording per-direction status after a successful cycle
//!
//! ## Architecture
//!
//! ```text
//!                        ┌────────────────────────┐
//!   TaskScheduler ─────► │ AccelerationController │
//!   (via RetryPolicy)    └────────────────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌──────────────────┐    ┌──────────────────────┐    ┌─────────────┐
//! │AccelerationClient│    │ EntitlementEvaluator │    │   Events    │
//! │ (reopen, query)  │    │ (available, active)  │    │  (notify)   │
//! └──────────────────┘    └──────────────────────┘    └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Reopen; transport failure fails the cycle
//! 2. Classify the reopen code (normal, accepted, fatal, unrecognized)
//! 3. Query the entitlement; transport or parse failure fails the cycle
//! 4. Evaluate; an unavailable line fails with `Error::NotEligible`
//! 5. Record both direction states and the execution time
//!
//! A cycle never retries internally. Cycles are serialized: concurrent
//! callers of [`AccelerationController::execute`] run one after another.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::{CodeDisposition, SpeedupConfig};
use crate::error::{Error, Result};
use crate::evaluator::{EntitlementEvaluator, Evaluation};
use crate::status::{AccelerationStatus, EntitlementSnapshot, Expiry, TierExpiry};
use crate::traits::AccelerationClient;

/// How a reopen response code was treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenDisposition {
    /// Code 0
    Normal,
    /// Known code that still counts as a successful reopen
    Accepted,
    /// Known code that fails the cycle
    Fatal,
    /// Nonzero code with no configured meaning; the cycle continues
    Unrecognized,
}

/// Events emitted by the AccelerationController
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// A cycle acquired the cycle lock and started
    CycleStarted,

    /// The reopen call returned a response
    ReopenResponded {
        code: i64,
        disposition: ReopenDisposition,
    },

    /// The entitlement query was decoded
    EntitlementObserved {
        ip: String,
        download_mbps: i64,
        up_h_mbps: i64,
        up_100_mbps: i64,
    },

    /// The cycle completed and status was updated
    CycleSucceeded { up_active: bool, down_active: bool },

    /// The cycle failed
    CycleFailed { error: String },
}

/// Runs acceleration cycles and owns [`AccelerationStatus`]
pub struct AccelerationController {
    /// Provisioning client
    client: Arc<dyn AccelerationClient>,

    /// Interprets query responses
    evaluator: EntitlementEvaluator,

    /// Known reopen codes
    response_codes: BTreeMap<i64, CodeDisposition>,

    /// Operator expects download acceleration
    down_acc: bool,

    /// Operator expects upload acceleration
    up_acc: bool,

    /// Whether periodic self-check is enabled
    self_check_enabled: bool,

    /// Minimum age of the last execution before a self-check is due
    self_check_interval: Duration,

    /// Held for the whole reopen → query → evaluate → update sequence
    cycle_lock: Mutex<()>,

    /// Status written at the end of each successful cycle
    status: RwLock<AccelerationStatus>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CycleEvent>,
}

impl AccelerationController {
    /// Create a new controller
    ///
    /// # Returns
    ///
    /// A tuple of (controller, event_receiver) where event_receiver yields cycle events
    pub fn new(
        client: Arc<dyn AccelerationClient>,
        config: &SpeedupConfig,
    ) -> (Self, mpsc::Receiver<CycleEvent>) {
        Self::with_evaluator(client, config, EntitlementEvaluator::new())
    }

    /// Create a controller with a custom evaluator (e.g. another time zone)
    pub fn with_evaluator(
        client: Arc<dyn AccelerationClient>,
        config: &SpeedupConfig,
        evaluator: EntitlementEvaluator,
    ) -> (Self, mpsc::Receiver<CycleEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let controller = Self {
            client,
            evaluator,
            response_codes: config.response_codes.clone(),
            down_acc: config.down_acc,
            up_acc: config.up_acc,
            self_check_enabled: config.self_check.enabled,
            self_check_interval: config.self_check.interval,
            cycle_lock: Mutex::new(()),
            status: RwLock::new(AccelerationStatus::default()),
            event_tx: tx,
        };

        (controller, rx)
    }

    /// Run one acceleration cycle
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Status updated (one or both directions may still be inactive)
    /// - `Err(Error::Network | Error::Parse)`: A provisioning call failed
    /// - `Err(Error::Api)`: The reopen code is configured as fatal
    /// - `Err(Error::NotEligible)`: The line cannot be accelerated
    pub async fn execute(&self) -> Result<()> {
        let _cycle = self.cycle_lock.lock().await;

        self.emit_event(CycleEvent::CycleStarted);
        info!("Starting acceleration cycle via {}", self.client.client_name());

        match self.run_cycle().await {
            Ok((snapshot, evaluation, executed_at)) => {
                {
                    let mut status = self.status.write().await;
                    status.up_active = evaluation.up_active;
                    status.down_active = evaluation.down_active;
                    status.last_executed = Some(executed_at);
                    status.last_snapshot = Some(snapshot);
                }

                self.report_directions(&evaluation);
                self.emit_event(CycleEvent::CycleSucceeded {
                    up_active: evaluation.up_active,
                    down_active: evaluation.down_active,
                });
                info!(
                    "Acceleration cycle complete (upload: {}, download: {})",
                    evaluation.up_active, evaluation.down_active
                );
                Ok(())
            }
            Err(e) => {
                error!("Acceleration cycle failed [{}]: {}", e.kind(), e);
                self.emit_event(CycleEvent::CycleFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Reopen, query and evaluate without touching status
    async fn run_cycle(&self) -> Result<(EntitlementSnapshot, Evaluation, DateTime<Utc>)> {
        let reopen = self.client.reopen().await?;
        let disposition = self.classify(reopen.code);
        self.emit_event(CycleEvent::ReopenResponded {
            code: reopen.code,
            disposition,
        });

        match disposition {
            ReopenDisposition::Normal => {
                info!("Reopen succeeded: {}", reopen.data.result);
            }
            ReopenDisposition::Accepted => {
                info!(
                    "Reopen rate limited but accepted (code {}): {}",
                    reopen.code, reopen.message
                );
            }
            ReopenDisposition::Fatal => {
                return Err(Error::api(reopen.code, reopen.message));
            }
            ReopenDisposition::Unrecognized => {
                warn!(
                    "Reopen returned unrecognized code {}: {}, continuing",
                    reopen.code, reopen.message
                );
            }
        }

        let query = self.client.query().await?;
        let snapshot = EntitlementSnapshot::from_response(&query)?;
        self.emit_event(CycleEvent::EntitlementObserved {
            ip: snapshot.ip.clone(),
            download_mbps: snapshot.download_bandwidth(),
            up_h_mbps: snapshot.up_h_bandwidth(),
            up_100_mbps: snapshot.up_100_bandwidth(),
        });
        self.log_snapshot(&snapshot);

        let now = Utc::now();
        let evaluation = self.evaluator.evaluate(&snapshot, now);
        if !evaluation.available && !evaluation.bandwidth_evidence {
            return Err(Error::not_eligible(format!(
                "line {} reports canSpeed=0 and no bandwidth on any tier",
                snapshot.ip
            )));
        }

        Ok((snapshot, evaluation, now))
    }

    fn classify(&self, code: i64) -> ReopenDisposition {
        if code == 0 {
            return ReopenDisposition::Normal;
        }
        match self.response_codes.get(&code) {
            Some(CodeDisposition::Accepted) => ReopenDisposition::Accepted,
            Some(CodeDisposition::Fatal) => ReopenDisposition::Fatal,
            None => ReopenDisposition::Unrecognized,
        }
    }

    fn log_snapshot(&self, snapshot: &EntitlementSnapshot) {
        info!(
            "Entitlement for {}: canSpeed={}, download {}Mbps, upH {}Mbps, up100 {}Mbps (updated {})",
            snapshot.ip,
            snapshot.capable,
            snapshot.download_bandwidth(),
            snapshot.up_h_bandwidth(),
            snapshot.up_100_bandwidth(),
            snapshot.updated_at
        );

        let tiers: [(&str, &TierExpiry); 5] = [
            ("download", &snapshot.download_expiry),
            ("upH", &snapshot.up_h_expiry),
            ("up100", &snapshot.up_100_expiry),
            ("package 1", &snapshot.package_1_expiry),
            ("package 2", &snapshot.package_2_expiry),
        ];
        for (name, tier) in tiers {
            match &tier.expiry {
                Expiry::NotProvisioned => debug!("  {} tier: not provisioned", name),
                Expiry::At(at) => info!("  {} tier expires {} ({})", name, at, tier.label),
            }
        }
    }

    fn report_directions(&self, evaluation: &Evaluation) {
        for (direction, active, expected) in [
            ("Upload", evaluation.up_active, self.up_acc),
            ("Download", evaluation.down_active, self.down_acc),
        ] {
            if active {
                continue;
            }
            if expected {
                warn!("{} acceleration is not active", direction);
            } else {
                debug!("{} acceleration is not active (not requested)", direction);
            }
        }
    }

    /// Query the entitlement without reopening it
    ///
    /// Returns whether the line is available. Status is left untouched and
    /// no cycle events are emitted.
    pub async fn query_status(&self) -> Result<bool> {
        let query = self.client.query().await?;
        let snapshot = EntitlementSnapshot::from_response(&query)?;
        Ok(self.evaluator.is_available(&snapshot))
    }

    /// Time of the last successful cycle
    pub async fn get_last_execute_time(&self) -> Option<DateTime<Utc>> {
        self.status.read().await.last_executed
    }

    /// Whether a self-check is due now
    pub async fn should_self_check(&self) -> bool {
        self.should_self_check_at(Utc::now()).await
    }

    /// Whether a self-check is due at `now`
    ///
    /// True iff self-check is enabled, a cycle has succeeded before, and at
    /// least the self-check interval has elapsed since.
    pub async fn should_self_check_at(&self, now: DateTime<Utc>) -> bool {
        if !self.self_check_enabled {
            return false;
        }
        let Some(last) = self.get_last_execute_time().await else {
            return false;
        };
        let Ok(interval) = chrono::Duration::from_std(self.self_check_interval) else {
            return false;
        };
        now.signed_duration_since(last) >= interval
    }

    /// Copy of the current status
    pub async fn status(&self) -> AccelerationStatus {
        self.status.read().await.clone()
    }

    /// Emit a cycle event
    fn emit_event(&self, event: CycleEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Event channel full, dropping event. Consider increasing event_channel_capacity."
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event channel closed, dropping event");
            }
        }
    }
}
