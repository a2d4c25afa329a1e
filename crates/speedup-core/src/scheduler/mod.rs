//! Recurring triggers
//!
//! The TaskScheduler owns three triggers and routes each firing to the
//! acceleration controller through the retry policy:
//!
//! | Trigger      | Cadence                             | Handler                                  |
//! |--------------|-------------------------------------|------------------------------------------|
//! | Heartbeat    | every `max(check_interval, 1m)`     | IP change check, then binding validation |
//! | Self-check   | Monday 00:00 (only when enabled)    | retry-wrapped cycle                      |
//! | Reopen       | `reopen_schedule` (default weekly)  | retry-wrapped cycle                      |
//!
//! Each trigger runs in its own loop task; each firing spawns its handler as
//! a separate task, so a retry delay only holds up that handler. Cycles never
//! overlap because the controller serializes them.
//!
//! `start` and `stop` are serialized by the running-state lock. `stop` ends
//! the trigger loops; handlers already in flight run to completion.

pub mod cron;

use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SpeedupConfig;
use crate::controller::AccelerationController;
use crate::error::Result;
use crate::monitor::IpMonitor;
use crate::retry::RetryPolicy;
use crate::status::SchedulerStatus;

pub use cron::CronSchedule;

/// Fixed recurrence of the self-check trigger: Monday 00:00
pub const SELF_CHECK_SCHEDULE: &str = "0 0 * * 1";

/// The scheduler's triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Heartbeat,
    SelfCheck,
    Reopen,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heartbeat => "heartbeat",
            Self::SelfCheck => "self-check",
            Self::Reopen => "reopen",
        })
    }
}

/// When a trigger fires
#[derive(Debug, Clone)]
enum Cadence {
    Every(Duration),
    Cron(CronSchedule),
}

/// Everything a trigger handler needs, cheap to clone into a task
#[derive(Clone)]
struct Handlers {
    monitor: Arc<IpMonitor>,
    controller: Arc<AccelerationController>,
    retry: RetryPolicy,
}

impl Handlers {
    async fn fire(&self, trigger: Trigger) {
        match trigger {
            Trigger::Heartbeat => self.heartbeat().await,
            Trigger::SelfCheck => {
                info!("Running weekly self-check");
                self.run_cycle("self-check").await;
            }
            Trigger::Reopen => {
                info!("Running scheduled reopen");
                self.run_cycle("scheduled reopen").await;
            }
        }
    }

    async fn heartbeat(&self) {
        debug!("Heartbeat check");

        match self.monitor.check_change().await {
            Err(e) => {
                error!("Heartbeat IP check failed: {}", e);
                return;
            }
            Ok(true) => {
                info!("Public IP changed, re-running acceleration");
                self.run_cycle("IP change").await;
                return;
            }
            Ok(false) => {}
        }

        if self.monitor.binding_enabled() {
            match self.monitor.current_ip().await {
                Ok(ip) => {
                    if let Err(e) = self.monitor.validate_binding(&ip) {
                        warn!("IP binding validation failed: {}", e);
                    }
                }
                Err(e) => error!("Failed to fetch current IP for binding check: {}", e),
            }
        }

        debug!("Heartbeat check complete");
    }

    /// One retry-wrapped cycle; the outcome is logged here
    async fn run_cycle(&self, reason: &str) {
        let controller = Arc::clone(&self.controller);
        let result = self
            .retry
            .run(move || {
                let controller = Arc::clone(&controller);
                async move { controller.execute().await }
            })
            .await;

        match result {
            Ok(()) => info!("Acceleration after {} succeeded", reason),
            Err(e) => error!("Acceleration after {} failed: {}", reason, e),
        }
    }
}

#[derive(Default)]
struct RunState {
    running: bool,
    shutdown_tx: Option<watch::Sender<bool>>,
    loops: Vec<JoinHandle<()>>,
}

/// Owns the recurring triggers
pub struct TaskScheduler {
    handlers: Handlers,

    /// Configured heartbeat interval, reported by `status`
    check_interval: Duration,

    /// Interval the heartbeat actually fires at
    heartbeat_interval: Duration,

    self_check_enabled: bool,
    self_check_schedule: CronSchedule,
    reopen_schedule: CronSchedule,

    /// Guards the running flag and the trigger loops
    state: Mutex<RunState>,
}

impl TaskScheduler {
    /// Create a scheduler
    ///
    /// Fails with `Error::Config` if `reopen_schedule` does not parse.
    pub fn new(
        monitor: Arc<IpMonitor>,
        controller: Arc<AccelerationController>,
        retry: RetryPolicy,
        config: &SpeedupConfig,
    ) -> Result<Self> {
        let reopen_schedule = CronSchedule::parse(&config.reopen_schedule)?;
        let self_check_schedule = CronSchedule::parse(SELF_CHECK_SCHEDULE)?;

        if config.check_interval < config.heartbeat_interval() {
            warn!(
                "check_interval {:?} is below the minimum, using {:?}",
                config.check_interval,
                config.heartbeat_interval()
            );
        }

        Ok(Self {
            handlers: Handlers {
                monitor,
                controller,
                retry,
            },
            check_interval: config.check_interval,
            heartbeat_interval: config.heartbeat_interval(),
            self_check_enabled: config.self_check.enabled,
            self_check_schedule,
            reopen_schedule,
            state: Mutex::new(RunState::default()),
        })
    }

    /// Start the triggers and run the initial cycle
    ///
    /// A second call while running only logs a warning. The initial cycle
    /// runs after the running-state lock is released; its failure is logged,
    /// not returned.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.running {
                warn!("Scheduler is already running");
                return Ok(());
            }

            info!("Starting scheduler");
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let mut loops = Vec::with_capacity(3);

            debug!("Heartbeat every {:?}", self.heartbeat_interval);
            loops.push(self.spawn_loop(
                Trigger::Heartbeat,
                Cadence::Every(self.heartbeat_interval),
                shutdown_rx.clone(),
            ));

            if self.self_check_enabled {
                debug!("Self-check on '{}'", self.self_check_schedule);
                loops.push(self.spawn_loop(
                    Trigger::SelfCheck,
                    Cadence::Cron(self.self_check_schedule.clone()),
                    shutdown_rx.clone(),
                ));
            } else {
                debug!("Self-check disabled, skipping");
            }

            debug!("Reopen on '{}'", self.reopen_schedule);
            loops.push(self.spawn_loop(
                Trigger::Reopen,
                Cadence::Cron(self.reopen_schedule.clone()),
                shutdown_rx,
            ));

            state.running = true;
            state.shutdown_tx = Some(shutdown_tx);
            state.loops = loops;
            info!("Scheduler started");
        }

        if let Err(e) = self.handlers.monitor.check_change().await {
            warn!("Could not establish baseline public IP: {}", e);
        }

        info!("Running initial acceleration");
        self.handlers.run_cycle("startup").await;

        Ok(())
    }

    /// Stop future trigger firings
    ///
    /// A call while stopped only logs a warning.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.running {
            warn!("Scheduler is not running");
            return Ok(());
        }

        info!("Stopping scheduler");
        if let Some(tx) = state.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for handle in state.loops.drain(..) {
            if let Err(e) = handle.await {
                warn!("Trigger loop ended abnormally: {}", e);
            }
        }
        state.running = false;
        info!("Scheduler stopped");

        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Read-only status snapshot
    pub async fn status(&self) -> SchedulerStatus {
        let running = self.state.lock().await.running;
        let monitor = &self.handlers.monitor;
        let controller = &self.handlers.controller;

        SchedulerStatus {
            running,
            last_execute: controller.get_last_execute_time().await,
            check_interval: self.check_interval,
            self_check: self.self_check_enabled,
            auto_recovery: self.handlers.retry.enabled(),
            current_ip: monitor.last_known_ip().await,
            ip_binding_enabled: monitor.binding_enabled(),
            acceleration: controller.status().await,
        }
    }

    /// Run a trigger's handler now, on the calling task
    pub async fn trigger_now(&self, trigger: Trigger) {
        info!("Manually firing {} trigger", trigger);
        self.handlers.fire(trigger).await;
    }

    fn spawn_loop(
        &self,
        trigger: Trigger,
        cadence: Cadence,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(trigger_loop(trigger, cadence, self.handlers.clone(), shutdown))
    }
}

/// Next firing of `schedule` and the delay until it
///
/// The search starts at the later of `now` and the previous target, so a
/// wake-up that lands just before its target does not fire that slot twice.
fn next_cron_firing<Tz: TimeZone>(
    schedule: &CronSchedule,
    now: &DateTime<Tz>,
    last_target: Option<&DateTime<Tz>>,
) -> Option<(DateTime<Tz>, Duration)> {
    let from = match last_target {
        Some(target) if target > now => target,
        _ => now,
    };
    let next = schedule.next_after(from)?;
    let delay = (next.clone() - now.clone()).to_std().unwrap_or(Duration::ZERO);
    Some((next, delay))
}

async fn trigger_loop(
    trigger: Trigger,
    cadence: Cadence,
    handlers: Handlers,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_target: Option<DateTime<Local>> = None;

    loop {
        let delay = match &cadence {
            Cadence::Every(period) => *period,
            Cadence::Cron(schedule) => {
                let Some((next, delay)) =
                    next_cron_firing(schedule, &Local::now(), last_target.as_ref())
                else {
                    warn!("Schedule '{}' never fires, {} trigger idle", schedule, trigger);
                    let _ = shutdown.changed().await;
                    return;
                };
                debug!("Next {} at {}", trigger, next);
                last_target = Some(next);
                delay
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                debug!("{} trigger loop stopped", trigger);
                return;
            }
        }

        debug!("{} trigger fired", trigger);
        let handlers = handlers.clone();
        tokio::spawn(async move { handlers.fire(trigger).await });
    }
}
