//! Public IP change detection
//!
//! [`IpMonitor`] owns the last observed egress IP. The first successful
//! observation establishes a baseline and is never reported as a change;
//! every later observation that differs byte-for-byte from the stored IP is
//! reported exactly once.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::IpBindingConfig;
use crate::error::{Error, Result};
use crate::traits::PublicIpSource;

/// Four dot-separated groups of 1-3 digits
static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").expect("dotted quad pattern is valid")
});

/// Trim a discovery response and check it is a dotted-quad IPv4 string
pub fn validate_ip(raw: &str) -> Result<String> {
    let ip = raw.trim();
    if DOTTED_QUAD.is_match(ip) {
        Ok(ip.to_string())
    } else {
        Err(Error::parse(format!("Invalid public IP format: {:?}", ip)))
    }
}

/// Tracks the public IP across polls
pub struct IpMonitor {
    /// Discovery collaborator
    source: Arc<dyn PublicIpSource>,

    /// IP binding settings used by [`IpMonitor::validate_binding`]
    binding: IpBindingConfig,

    /// Last observed IP; `None` until a baseline is established
    last_known_ip: Mutex<Option<String>>,
}

impl IpMonitor {
    /// Create a monitor with IP binding disabled
    pub fn new(source: Arc<dyn PublicIpSource>) -> Self {
        Self::with_binding(source, IpBindingConfig::default())
    }

    /// Create a monitor that also validates against a bind IP
    pub fn with_binding(source: Arc<dyn PublicIpSource>, binding: IpBindingConfig) -> Self {
        Self {
            source,
            binding,
            last_known_ip: Mutex::new(None),
        }
    }

    /// Fetch and validate the current public IP
    ///
    /// Transport failures surface as `Error::Network`; a body that is not a
    /// dotted quad after trimming is `Error::Parse`.
    pub async fn current_ip(&self) -> Result<String> {
        let body = self.source.fetch().await.map_err(|e| match e {
            Error::Network(_) => e,
            other => Error::network(format!(
                "{} lookup failed: {}",
                self.source.source_name(),
                other
            )),
        })?;

        let ip = validate_ip(&body)?;
        debug!("Current public IP via {}: {}", self.source.source_name(), ip);
        Ok(ip)
    }

    /// Poll the current IP and report whether it changed
    ///
    /// The first successful poll stores a baseline and returns `false`.
    /// The stored IP is only written on baseline establishment or change.
    pub async fn check_change(&self) -> Result<bool> {
        let current = self.current_ip().await?;
        let mut last = self.last_known_ip.lock().await;

        match last.as_deref() {
            None => {
                info!("Baseline public IP: {}", current);
                *last = Some(current);
                Ok(false)
            }
            Some(previous) if previous != current => {
                info!("Public IP changed: {} -> {}", previous, current);
                *last = Some(current);
                Ok(true)
            }
            Some(_) => {
                debug!("Public IP unchanged: {}", current);
                Ok(false)
            }
        }
    }

    /// Forget the stored IP so the next poll re-establishes a baseline
    pub async fn reset(&self) {
        *self.last_known_ip.lock().await = None;
        info!("Public IP baseline reset");
    }

    /// Last observed IP, if a baseline exists
    pub async fn last_known_ip(&self) -> Option<String> {
        self.last_known_ip.lock().await.clone()
    }

    /// Whether heartbeat binding validation is configured
    pub fn binding_enabled(&self) -> bool {
        self.binding.enabled
    }

    /// Compare an IP against the configured bind IP
    ///
    /// Passes when binding is disabled or no bind IP is set.
    pub fn validate_binding(&self, ip: &str) -> Result<()> {
        if !self.binding.enabled {
            debug!("IP binding disabled, skipping validation");
            return Ok(());
        }

        if !self.binding.bind_ip.is_empty() && ip != self.binding.bind_ip {
            warn!(
                "Egress IP {} does not match bind IP {} on {}",
                ip, self.binding.bind_ip, self.binding.interface
            );
            return Err(Error::binding(format!(
                "current IP {} != bind IP {}",
                ip, self.binding.bind_ip
            )));
        }

        debug!("IP binding validated");
        Ok(())
    }
}
