// # speedupd - Bandwidth Acceleration Daemon
//
// This daemon is a THIN integration layer:
// - Parses the command line
// - Loads the configuration file and initializes logging
// - Wires the HTTP IP source and the speedtest.cn client into speedup-core
// - Starts the scheduler and stops it on SIGINT/SIGTERM
//
// All acceleration, retry and scheduling logic lives in speedup-core.
//
// ## Example
//
// ```bash
// speedupd --config /etc/speedup/config.json
// speedupd --version
// ```

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use speedup_core::{
    AccelerationController, Config, CycleEvent, IpMonitor, RetryPolicy, TaskScheduler,
};
use speedup_ip_http::HttpIpSource;
use speedup_provider_speedtest::SpeedtestClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const GIT_COMMIT: &str = match option_env!("SPEEDUP_GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

const BUILD_TIME: &str = match option_env!("SPEEDUP_BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown or `--version`
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SpeedupExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<SpeedupExitCode> for ExitCode {
    fn from(code: SpeedupExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep ISP bandwidth acceleration asserted
#[derive(Debug, Parser)]
#[command(name = "speedupd", disable_version_flag = true)]
struct Cli {
    /// Path to the configuration file (JSON or YAML)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Print version and build information, then exit
    #[arg(short = 'V', long)]
    version: bool,
}

fn version_string() -> String {
    format!(
        "speedupd {} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        GIT_COMMIT,
        BUILD_TIME
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version_string());
        return SpeedupExitCode::CleanShutdown.into();
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SpeedupExitCode::ConfigError.into();
        }
    };

    if !config.speedup.enabled {
        eprintln!(
            "Acceleration is disabled in {}. Set speedup.enabled to true to run the daemon.",
            cli.config.display()
        );
        return SpeedupExitCode::ConfigError.into();
    }

    let _logging_guard = match logging::init_logging(&config.logging, config.speedup.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return SpeedupExitCode::ConfigError.into();
        }
    };

    info!("Starting {}", version_string());
    info!("Configuration loaded from {}", cli.config.display());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SpeedupExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let scheduler = match build_scheduler(&config) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return SpeedupExitCode::ConfigError;
            }
        };

        match run_daemon(scheduler).await {
            Ok(()) => SpeedupExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                SpeedupExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the components together
///
/// Must be called inside the runtime: the event drain task is spawned here.
fn build_scheduler(config: &Config) -> Result<Arc<TaskScheduler>> {
    let speedup = &config.speedup;

    let source = HttpIpSource::new().context("Failed to create IP source")?;
    let monitor = IpMonitor::with_binding(Arc::new(source), speedup.ip_binding.clone());

    let client = SpeedtestClient::from_binding(&speedup.ip_binding)
        .context("Failed to create acceleration client")?;
    let (controller, events) = AccelerationController::new(Arc::new(client), speedup);
    tokio::spawn(drain_events(events));

    let retry = RetryPolicy::from_config(&speedup.auto_recovery);
    let scheduler = TaskScheduler::new(Arc::new(monitor), Arc::new(controller), retry, speedup)
        .context("Failed to create scheduler")?;

    Ok(Arc::new(scheduler))
}

/// Log controller events until the controller is dropped
async fn drain_events(mut events: mpsc::Receiver<CycleEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            CycleEvent::CycleFailed { error } => debug!("Event: cycle failed: {}", error),
            other => debug!("Event: {:?}", other),
        }
    }
}

/// Run the scheduler until a shutdown signal arrives
async fn run_daemon(scheduler: Arc<TaskScheduler>) -> Result<()> {
    // Start runs the initial cycle, which may sit in retry delays; signals
    // must be honoured meanwhile.
    let starting = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.start().await })
    };

    let signal = wait_for_shutdown().await?;
    info!("Received {}, shutting down", signal);

    scheduler.stop().await.context("Failed to stop scheduler")?;

    if starting.is_finished() {
        match starting.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Scheduler start failed: {}", e),
            Err(e) => warn!("Scheduler start task ended abnormally: {}", e),
        }
    } else {
        info!("Initial cycle still in progress, leaving it to runtime shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
