//! Logging setup for speedupd.
//!
//! - Level comes from `logging.level`, forced to `debug` by `speedup.verbose`
//! - `RUST_LOG` overrides the configured level when set
//! - Output goes to stdout or to an appended log file

use anyhow::{Context, Result, bail};
use speedup_core::LoggingConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes the background writer.
pub struct LoggingGuard {
    _writer_guard: WorkerGuard,
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

impl LogTarget {
    /// Resolve the output target from the logging config
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        match config.output.to_lowercase().as_str() {
            "" | "stdout" => Ok(Self::Stdout),
            "file" => {
                if config.file.trim().is_empty() {
                    bail!("logging.file is required when logging.output is \"file\"");
                }
                Ok(Self::File(PathBuf::from(config.file.trim())))
            }
            other => bail!(
                "logging.output '{}' is not supported. Valid outputs: stdout, file",
                other
            ),
        }
    }
}

/// Effective level name for the given config
pub fn effective_level(config: &LoggingConfig, verbose: bool) -> Result<String> {
    if verbose {
        return Ok("debug".to_string());
    }

    let level = config.level.trim().to_lowercase();
    if level.is_empty() {
        return Ok("info".to_string());
    }
    if !VALID_LEVELS.contains(&level.as_str()) {
        bail!(
            "logging.level '{}' is not valid. Valid levels: {}",
            config.level,
            VALID_LEVELS.join(", ")
        );
    }
    Ok(level)
}

/// Open the writer for a target, creating parent directories for files
fn open_writer(target: &LogTarget) -> Result<(NonBlocking, WorkerGuard)> {
    match target {
        LogTarget::Stdout => Ok(tracing_appender::non_blocking(io::stdout())),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            Ok(tracing_appender::non_blocking(file))
        }
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// Fails on an unknown level or output, an unopenable log file, or when a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    let level = effective_level(config, verbose)?;
    let target = LogTarget::from_config(config)?;
    let (writer, guard) = open_writer(&target)?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&level)
            .with_context(|| format!("Invalid log filter '{}'", level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(target == LogTarget::Stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _writer_guard: guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: &str, output: &str, file: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            output: output.to_string(),
            file: file.to_string(),
        }
    }

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(&logging("warn", "stdout", ""), false).unwrap(), "warn");
        assert_eq!(effective_level(&logging("INFO", "stdout", ""), false).unwrap(), "info");
        assert_eq!(effective_level(&logging("", "stdout", ""), false).unwrap(), "info");
    }

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(effective_level(&logging("error", "stdout", ""), true).unwrap(), "debug");
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = effective_level(&logging("loud", "stdout", ""), false).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_target_resolution() {
        assert_eq!(
            LogTarget::from_config(&logging("info", "stdout", "")).unwrap(),
            LogTarget::Stdout
        );
        assert_eq!(
            LogTarget::from_config(&logging("info", "file", "/var/log/speedup.log")).unwrap(),
            LogTarget::File(PathBuf::from("/var/log/speedup.log"))
        );
        assert!(LogTarget::from_config(&logging("info", "file", "  ")).is_err());
        assert!(LogTarget::from_config(&logging("info", "syslog", "")).is_err());
    }

    #[test]
    fn test_log_file_created_with_parents_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/speedup.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "previous run\n").unwrap();

        drop(open_log_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n");

        let fresh = dir.path().join("a/b/fresh.log");
        drop(open_log_file(&fresh).unwrap());
        assert!(fresh.exists());
    }

    #[test]
    fn test_unopenable_log_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let err = open_log_file(&blocker.join("speedup.log")).unwrap_err();
        assert!(err.to_string().contains("Failed to create log directory"));
    }

    #[test]
    fn test_guard_structure() {
        let (writer, guard) = NonBlocking::new(io::sink());
        drop(writer);
        let _guard = LoggingGuard {
            _writer_guard: guard,
        };
    }
}
