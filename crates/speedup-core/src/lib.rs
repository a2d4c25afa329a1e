// # speedup-core
//
// Core library for the broadband acceleration keeper.
//
// ## Architecture Overview
//
// This library keeps a line's acceleration entitlement asserted:
// - **PublicIpSource**: Trait for discovering the current public IP
// - **AccelerationClient**: Trait for the reopen/query provisioning calls
// - **IpMonitor**: Detects public IP changes against a stored baseline
// - **EntitlementEvaluator**: Decides availability and per-direction activity
// - **AccelerationController**: Runs one reopen → query → evaluate cycle
// - **RetryPolicy**: Bounded fixed-delay auto-recovery around a cycle
// - **TaskScheduler**: Heartbeat, self-check and reopen triggers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Network collaborators live in their own crates
// 2. **Serialized Cycles**: At most one cycle touches the provider at a time
// 3. **Library-First**: The daemon is a thin wrapper over this crate
// 4. **Failures Are Logged**: A failed cycle never stops the scheduler

pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod monitor;
pub mod retry;
pub mod scheduler;
pub mod status;
pub mod traits;

// Re-export core types for convenience
pub use config::{Config, LoggingConfig, SpeedupConfig};
pub use controller::{AccelerationController, CycleEvent, ReopenDisposition};
pub use error::{Error, Result};
pub use evaluator::EntitlementEvaluator;
pub use monitor::IpMonitor;
pub use retry::RetryPolicy;
pub use scheduler::{CronSchedule, TaskScheduler, Trigger};
pub use status::{AccelerationStatus, EntitlementSnapshot, SchedulerStatus};
pub use traits::{AccelerationClient, PublicIpSource};
