// # HTTP Public IP Source
//
// This crate provides the HTTP implementation of `PublicIpSource`.
//
// ## Architecture
//
// Asks plain-text IP echo services for the caller's public IP, in order,
// and returns the first body that looks like an IPv4 address, verbatim.
// A 2xx answer that is not an address (captive portal, error page) counts
// as a failed service.
//
// - ✅ Ordered failover across services
// - ✅ HTTP timeout configured (10 seconds)
// - ❌ NO polling (owned by TaskScheduler)
// - ❌ NO change detection (owned by IpMonitor)

use async_trait::async_trait;
use speedup_core::monitor::validate_ip;
use speedup_core::traits::PublicIpSource;
use speedup_core::{Error, Result};
use std::time::Duration;

/// Default IP echo services, tried in order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://ipinfo.io/ip/",
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

/// User-Agent sent with every request
const USER_AGENT: &str = "SpeedTestUp/1.0";

/// Default timeout for each lookup (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// Services to ask, in order
    urls: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source using [`DEFAULT_IP_SERVICES`]
    pub fn new() -> Result<Self> {
        Self::with_urls(DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect())
    }

    /// Create a source with a custom service list
    ///
    /// # Errors
    ///
    /// `Error::Config` if `urls` is empty.
    pub fn with_urls(urls: Vec<String>) -> Result<Self> {
        if urls.is_empty() {
            return Err(Error::config("At least one IP service URL is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { urls, client })
    }

    /// Services this source asks, in order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    async fn fetch_from(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(format!("{}: request failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!("{}: HTTP {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("{}: body read failed: {}", url, e)))?;

        validate_ip(&body).map_err(|e| Error::network(format!("{}: {}", url, e)))?;
        Ok(body)
    }
}

#[async_trait]
impl PublicIpSource for HttpIpSource {
    async fn fetch(&self) -> Result<String> {
        let mut last_error = None;

        for url in &self.urls {
            match self.fetch_from(url).await {
                Ok(body) => {
                    tracing::debug!("Public IP lookup answered by {}", url);
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!("Public IP lookup failed, trying next service: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => Error::network(format!("All IP services failed, last: {}", e)),
            None => Error::network("No IP services configured"),
        })
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
