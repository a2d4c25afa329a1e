//! Configuration types for the speedup system
//!
//! This module defines all configuration structures used throughout the crate,
//! plus loading (JSON first, YAML as fallback) and saving (pretty JSON).
//!
//! Loading never fails because an optional field is missing: every missing,
//! zero, negative or empty value is replaced with its documented default by
//! [`Config::apply_defaults`]. Loading does fail when the file cannot be read
//! or when a field is present with the wrong shape.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default heartbeat interval (10 minutes)
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Smallest heartbeat interval the scheduler will honour
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default forced-reopen recurrence: every Monday at 00:00
pub const DEFAULT_REOPEN_SCHEDULE: &str = "0 0 * * 1";

/// Default retry interval for auto-recovery (5 minutes)
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default self-check interval (7 days)
pub const DEFAULT_SELF_CHECK_INTERVAL: Duration = Duration::from_secs(168 * 60 * 60);

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INTERFACE: &str = "wan";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_OUTPUT: &str = "stdout";
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Provider code meaning "too many requests, but the reopen was accepted"
pub const CODE_RATE_LIMITED: i64 = 10002;

/// Provider code meaning "interface broken, restart required"
pub const CODE_RESTART_REQUIRED: i64 = 10021;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acceleration service settings
    pub speedup: SpeedupConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// The file is parsed as JSON first and as YAML if that fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::parse(&content)?;
        config.apply_defaults();

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text without applying defaults
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str::<Config>(content) {
            Ok(config) => Ok(config),
            Err(json_err) => serde_yaml::from_str::<Config>(content).map_err(|yaml_err| {
                Error::config(format!(
                    "Config is neither valid JSON ({}) nor valid YAML ({})",
                    json_err, yaml_err
                ))
            }),
        }
    }

    /// Save configuration to a file as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), data)?;
        Ok(())
    }

    /// Replace missing or non-positive values with their defaults
    pub fn apply_defaults(&mut self) {
        let speedup = &mut self.speedup;

        if speedup.check_interval.is_zero() {
            speedup.check_interval = DEFAULT_CHECK_INTERVAL;
        }
        if speedup.reopen_schedule.trim().is_empty() {
            speedup.reopen_schedule = DEFAULT_REOPEN_SCHEDULE.to_string();
        }
        if speedup.ip_binding.interface.is_empty() {
            speedup.ip_binding.interface = DEFAULT_INTERFACE.to_string();
        }
        if speedup.auto_recovery.max_retries == 0 {
            speedup.auto_recovery.max_retries = DEFAULT_MAX_RETRIES;
        }
        if speedup.auto_recovery.retry_interval.is_zero() {
            speedup.auto_recovery.retry_interval = DEFAULT_RETRY_INTERVAL;
        }
        if speedup.self_check.interval.is_zero() {
            speedup.self_check.interval = DEFAULT_SELF_CHECK_INTERVAL;
        }
        if speedup.event_channel_capacity == 0 {
            speedup.event_channel_capacity = DEFAULT_EVENT_CHANNEL_CAPACITY;
        }

        if self.logging.level.is_empty() {
            self.logging.level = DEFAULT_LOG_LEVEL.to_string();
        }
        if self.logging.output.is_empty() {
            self.logging.output = DEFAULT_LOG_OUTPUT.to_string();
        }
    }
}

/// Acceleration service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedupConfig {
    /// Master switch; the daemon refuses to start when false
    pub enabled: bool,

    /// Operator expects download acceleration
    pub down_acc: bool,

    /// Operator expects upload acceleration
    pub up_acc: bool,

    /// Raise log verbosity to debug
    pub verbose: bool,

    /// Heartbeat / IP poll interval
    #[serde(with = "duration_str")]
    pub check_interval: Duration,

    /// Recurrence expression for the forced reopen
    pub reopen_schedule: String,

    /// IP binding settings
    pub ip_binding: IpBindingConfig,

    /// Auto-recovery (retry) settings
    pub auto_recovery: AutoRecoveryConfig,

    /// Periodic self-check settings
    pub self_check: SelfCheckConfig,

    /// Known provider reopen codes and how to treat them
    ///
    /// Codes not listed here are logged as warnings and the cycle continues.
    pub response_codes: BTreeMap<i64, CodeDisposition>,

    /// Capacity of the controller's event channel
    ///
    /// When full, new events are dropped (with a warning log).
    pub event_channel_capacity: usize,
}

impl SpeedupConfig {
    /// Heartbeat interval, coerced up to [`MIN_CHECK_INTERVAL`]
    pub fn heartbeat_interval(&self) -> Duration {
        self.check_interval.max(MIN_CHECK_INTERVAL)
    }
}

impl Default for SpeedupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            down_acc: true,
            up_acc: true,
            verbose: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
            reopen_schedule: DEFAULT_REOPEN_SCHEDULE.to_string(),
            ip_binding: IpBindingConfig::default(),
            auto_recovery: AutoRecoveryConfig::default(),
            self_check: SelfCheckConfig::default(),
            response_codes: default_response_codes(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

fn default_response_codes() -> BTreeMap<i64, CodeDisposition> {
    BTreeMap::from([
        (CODE_RATE_LIMITED, CodeDisposition::Accepted),
        (CODE_RESTART_REQUIRED, CodeDisposition::Fatal),
    ])
}

/// How a known nonzero reopen code is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeDisposition {
    /// Logged; the cycle continues as if the reopen succeeded
    Accepted,
    /// The cycle fails with an API error
    Fatal,
}

/// IP binding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpBindingConfig {
    /// Whether binding validation is performed on each heartbeat
    pub enabled: bool,
    /// WAN interface name (e.g. "wan", "pppoe-wan")
    pub interface: String,
    /// Expected egress IP; empty disables the comparison
    pub bind_ip: String,
}

impl Default for IpBindingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interface: DEFAULT_INTERFACE.to_string(),
            bind_ip: String::new(),
        }
    }
}

/// Auto-recovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRecoveryConfig {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient_count")]
    pub max_retries: u32,
    #[serde(with = "duration_str")]
    pub retry_interval: Duration,
}

impl Default for AutoRecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Self-check configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfCheckConfig {
    pub enabled: bool,
    #[serde(with = "duration_str")]
    pub interval: Duration,
}

impl Default for SelfCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_SELF_CHECK_INTERVAL,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// "stdout" or "file"
    pub output: String,
    /// Log file path, used when output is "file"
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            output: DEFAULT_LOG_OUTPUT.to_string(),
            file: String::new(),
        }
    }
}

/// Accept any integer; negatives collapse to zero so defaults can replace them.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(value.clamp(0, u32::MAX as i64) as u32)
}

/// Parse a duration such as `"10m"`, `"1h30m"`, `"45s"` or `"500ms"`
///
/// A leading `-` yields a zero duration, which [`Config::apply_defaults`]
/// later replaces with the field's default. Values too large for a
/// `Duration` are `Error::Config`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::config("Empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let invalid = || Error::config(format!("Invalid duration: {}", input));
    let overflow = || Error::config(format!("Duration out of range: {}", input));

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_len];
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            "d" => 86_400_000_000_000,
            unit => {
                return Err(Error::config(format!(
                    "Invalid duration unit '{}' in {}",
                    unit, input
                )));
            }
        };
        rest = &rest[unit_len..];

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.contains('.') {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(nanos_per_unit).ok_or_else(overflow)?;

        // Digits past the 18th are below a nanosecond for every unit
        let fraction = &fraction[..fraction.len().min(18)];
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            let scale = 10u128.pow(fraction.len() as u32);
            nanos = nanos
                .checked_add(digits * nanos_per_unit / scale)
                .ok_or_else(overflow)?;
        }

        total_nanos = total_nanos.checked_add(nanos).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| overflow())?;
    let subsec = (total_nanos % 1_000_000_000) as u32;

    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::new(secs, subsec))
}

/// Render a duration in the compact form accepted by [`parse_duration`]
///
/// The rendering is exact down to the nanosecond.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let total_secs = duration.as_secs();
    let nanos = duration.subsec_nanos();

    let parts = [
        (total_secs / 3600, "h"),
        ((total_secs % 3600) / 60, "m"),
        (total_secs % 60, "s"),
        (u64::from(nanos / 1_000_000), "ms"),
        (u64::from((nanos / 1_000) % 1_000), "us"),
        (u64::from(nanos % 1_000), "ns"),
    ];

    parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect()
}

/// Serde adapter for durations: strings like `"10m"` or integer nanoseconds
pub mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string such as \"10m\" or integer nanoseconds")
        }

        fn visit_u64<E: de::Error>(self, nanos: u64) -> Result<Duration, E> {
            Ok(Duration::from_nanos(nanos))
        }

        fn visit_i64<E: de::Error>(self, nanos: i64) -> Result<Duration, E> {
            Ok(Duration::from_nanos(nanos.max(0) as u64))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse_duration(value).map_err(E::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();

        assert!(!cfg.speedup.enabled);
        assert!(cfg.speedup.down_acc);
        assert!(cfg.speedup.up_acc);
        assert_eq!(cfg.speedup.check_interval, Duration::from_secs(600));
        assert_eq!(cfg.speedup.reopen_schedule, "0 0 * * 1");
        assert!(!cfg.speedup.ip_binding.enabled);
        assert_eq!(cfg.speedup.ip_binding.interface, "wan");
        assert!(cfg.speedup.auto_recovery.enabled);
        assert_eq!(cfg.speedup.auto_recovery.max_retries, 3);
        assert_eq!(cfg.speedup.auto_recovery.retry_interval, Duration::from_secs(300));
        assert!(cfg.speedup.self_check.enabled);
        assert_eq!(cfg.speedup.self_check.interval, Duration::from_secs(168 * 3600));
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.output, "stdout");
        assert_eq!(
            cfg.speedup.response_codes.get(&CODE_RATE_LIMITED),
            Some(&CodeDisposition::Accepted)
        );
        assert_eq!(
            cfg.speedup.response_codes.get(&CODE_RESTART_REQUIRED),
            Some(&CodeDisposition::Fatal)
        );
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(
            r#"{
                "speedup": {
                    "enabled": true,
                    "check_interval": "20m",
                    "reopen_schedule": "30 2 * * *",
                    "ip_binding": { "enabled": true, "bind_ip": "1.2.3.4" },
                    "auto_recovery": { "max_retries": 5, "retry_interval": "1m" }
                },
                "logging": { "level": "debug", "output": "file", "file": "/tmp/speedup.log" }
            }"#,
        );

        let cfg = Config::load(file.path()).unwrap();
        assert!(cfg.speedup.enabled);
        assert_eq!(cfg.speedup.check_interval, Duration::from_secs(1200));
        assert_eq!(cfg.speedup.reopen_schedule, "30 2 * * *");
        assert!(cfg.speedup.ip_binding.enabled);
        assert_eq!(cfg.speedup.ip_binding.bind_ip, "1.2.3.4");
        assert_eq!(cfg.speedup.ip_binding.interface, "wan");
        assert_eq!(cfg.speedup.auto_recovery.max_retries, 5);
        assert_eq!(cfg.speedup.auto_recovery.retry_interval, Duration::from_secs(60));
        assert!(cfg.speedup.self_check.enabled);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.file, "/tmp/speedup.log");
    }

    #[test]
    fn test_load_accepts_nanosecond_durations() {
        let file = write_temp(r#"{ "speedup": { "check_interval": 1200000000000 } }"#);

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.speedup.check_interval, Duration::from_secs(1200));
    }

    #[test]
    fn test_load_yaml_fallback() {
        let file = write_temp(
            "speedup:\n  enabled: true\n  check_interval: 15m\n  self_check:\n    enabled: false\nlogging:\n  level: warn\n",
        );

        let cfg = Config::load(file.path()).unwrap();
        assert!(cfg.speedup.enabled);
        assert_eq!(cfg.speedup.check_interval, Duration::from_secs(900));
        assert!(!cfg.speedup.self_check.enabled);
        assert_eq!(cfg.speedup.self_check.interval, DEFAULT_SELF_CHECK_INTERVAL);
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.output, "stdout");
    }

    #[test]
    fn test_non_positive_values_replaced_with_defaults() {
        let file = write_temp(
            r#"{
                "speedup": {
                    "check_interval": -60000000000,
                    "reopen_schedule": "",
                    "ip_binding": { "interface": "" },
                    "auto_recovery": { "max_retries": -1, "retry_interval": "0s" },
                    "self_check": { "interval": "-5m" },
                    "event_channel_capacity": 0
                },
                "logging": { "level": "", "output": "" }
            }"#,
        );

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.speedup.check_interval, DEFAULT_CHECK_INTERVAL);
        assert_eq!(cfg.speedup.reopen_schedule, DEFAULT_REOPEN_SCHEDULE);
        assert_eq!(cfg.speedup.ip_binding.interface, "wan");
        assert_eq!(cfg.speedup.auto_recovery.max_retries, 3);
        assert_eq!(cfg.speedup.auto_recovery.retry_interval, DEFAULT_RETRY_INTERVAL);
        assert_eq!(cfg.speedup.self_check.interval, DEFAULT_SELF_CHECK_INTERVAL);
        assert_eq!(cfg.speedup.event_channel_capacity, 64);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.output, "stdout");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/speedup/config.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let file = write_temp(r#"{ "speedup": { "enabled": true "#);
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_wrong_shape_fails() {
        let file = write_temp(r#"{ "speedup": { "auto_recovery": { "max_retries": "three" } } }"#);
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_empty_object_is_all_defaults() {
        let file = write_temp("{}");
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut cfg = Config::default();
        cfg.speedup.enabled = true;
        cfg.speedup.up_acc = false;
        cfg.speedup.verbose = true;
        cfg.speedup.check_interval = Duration::from_secs(90 * 60);
        cfg.speedup.reopen_schedule = "15 3 * * 0".to_string();
        cfg.speedup.ip_binding = IpBindingConfig {
            enabled: true,
            interface: "pppoe-wan".to_string(),
            bind_ip: "100.64.1.2".to_string(),
        };
        cfg.speedup.auto_recovery.max_retries = 7;
        cfg.speedup.self_check.interval = Duration::new(72 * 3600, 1_500_250);
        cfg.speedup.auto_recovery.retry_interval = Duration::new(600, 1);
        cfg.speedup.response_codes.insert(10003, CodeDisposition::Fatal);
        cfg.logging.level = "debug".to_string();
        cfg.logging.output = "file".to_string();
        cfg.logging.file = "/var/log/speedup.log".to_string();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_heartbeat_interval_is_coerced() {
        let mut cfg = SpeedupConfig::default();
        cfg.check_interval = Duration::from_secs(10);
        assert_eq!(cfg.heartbeat_interval(), MIN_CHECK_INTERVAL);

        cfg.check_interval = Duration::from_secs(300);
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("168h").unwrap(), Duration::from_secs(604800));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("-5m").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse_duration("10m1ns").unwrap(),
            Duration::new(600, 1)
        );
        assert_eq!(parse_duration("1.000000001s").unwrap(), Duration::new(1, 1));
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration(".s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range_is_config_error() {
        for input in [
            "99999999999999999999h",
            "5124095576030432h",
            "999999999999999999999999999999999999999999s",
        ] {
            let err = parse_duration(input).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{input:?} should be rejected");
        }
    }

    #[test]
    fn test_load_oversized_duration_is_config_error() {
        let file = write_temp(r#"{ "speedup": { "check_interval": "99999999999999999999h" } }"#);

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(604800)), "168h");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
        assert_eq!(format_duration(Duration::from_millis(20)), "20ms");
        assert_eq!(format_duration(Duration::new(600, 1)), "10m1ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1us500ns");
    }
}
