// # speedtest.cn Acceleration Client
//
// This crate provides the speedtest.cn implementation of `AccelerationClient`.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation (the retry policy handles recovery)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Optional binding of the outbound socket to a local IP
// - ❌ NO retry logic (owned by RetryPolicy)
// - ❌ NO response code interpretation (owned by AccelerationController)
// - ❌ NO entitlement evaluation (owned by EntitlementEvaluator)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (Acceleration Client)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the two provisioning endpoints only
// - ✅ Decode provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Sleep, back off or retry
// - ❌ Cache responses beyond a single call
//
// ## API Reference
//
// - Reopen: GET `https://tisu-api.speedtest.cn/api/v2/speedup/reopen`
// - Query:  GET `https://tisu-api-v3.speedtest.cn/speedUp/query`
//
// Both answer `{ "code": ..., "message": ..., "data": { ... } }` with HTTP 200.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use speedup_core::config::IpBindingConfig;
use speedup_core::traits::{AccelerationClient, QueryResponse, ReopenResponse};
use speedup_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Reopen-entitlement endpoint
pub const REOPEN_URL: &str = "https://tisu-api.speedtest.cn/api/v2/speedup/reopen";

/// Query-entitlement endpoint
pub const QUERY_URL: &str = "https://tisu-api-v3.speedtest.cn/speedUp/query";

/// User-Agent sent with every request
pub const USER_AGENT: &str = "SpeedTestUp/1.0";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// speedtest.cn acceleration client
///
/// # Trust Level: Untrusted
///
/// This client is stateless and single-shot. All coordination (retries,
/// scheduling, serialization of cycles) is owned by speedup-core.
pub struct SpeedtestClient {
    /// HTTP client for API requests
    client: reqwest::Client,

    reopen_url: String,
    query_url: String,

    /// Local address outbound sockets are bound to, if any
    bind_ip: Option<IpAddr>,
}

impl std::fmt::Debug for SpeedtestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedtestClient")
            .field("reopen_url", &self.reopen_url)
            .field("query_url", &self.query_url)
            .field("bind_ip", &self.bind_ip)
            .finish()
    }
}

impl SpeedtestClient {
    /// Create a client against the production endpoints
    ///
    /// # Parameters
    ///
    /// - `bind_ip`: Local address to bind outbound sockets to (`None` for the OS default)
    pub fn new(bind_ip: Option<IpAddr>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT);
        if let Some(ip) = bind_ip {
            builder = builder.local_address(ip);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            reopen_url: REOPEN_URL.to_string(),
            query_url: QUERY_URL.to_string(),
            bind_ip,
        })
    }

    /// Create a client honouring the IP binding settings
    ///
    /// Binding applies only when enabled with a non-empty bind IP. A bind IP
    /// that does not parse is logged and ignored.
    pub fn from_binding(binding: &IpBindingConfig) -> Result<Self> {
        let bind_ip = if binding.enabled && !binding.bind_ip.is_empty() {
            match binding.bind_ip.parse::<IpAddr>() {
                Ok(ip) => {
                    tracing::info!("Binding provisioning requests to {}", ip);
                    Some(ip)
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unparseable bind IP {:?}: {}",
                        binding.bind_ip,
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Self::new(bind_ip)
    }

    /// Point the client at other endpoints (mirrors, tests)
    pub fn with_endpoints(
        mut self,
        reopen_url: impl Into<String>,
        query_url: impl Into<String>,
    ) -> Self {
        self.reopen_url = reopen_url.into();
        self.query_url = query_url.into();
        self
    }

    /// Local address outbound sockets are bound to
    pub fn bind_ip(&self) -> Option<IpAddr> {
        self.bind_ip
    }

    /// GET `url` and decode its JSON body
    ///
    /// # Errors
    ///
    /// - `Error::Network`: transport failure, timeout or non-success HTTP status
    /// - `Error::Parse`: body is not the expected JSON
    async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &str) -> Result<T> {
        tracing::debug!("{} request: GET {}", operation, url);

        let response = self
            .client
            .get(url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::network(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::network(format!(
                "{} returned HTTP {}: {}",
                operation, status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("{} response read failed: {}", operation, e)))?;

        serde_json::from_str(&body).map_err(|e| {
            Error::parse(format!("Failed to decode {} response: {}", operation, e))
        })
    }
}

#[async_trait]
impl AccelerationClient for SpeedtestClient {
    /// Reopen the entitlement
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /api/v2/speedup/reopen
    /// User-Agent: SpeedTestUp/1.0
    /// ```
    async fn reopen(&self) -> Result<ReopenResponse> {
        let response: ReopenResponse = self.get_json(&self.reopen_url, "Reopen").await?;
        tracing::debug!(
            "Reopen answered code {} ({})",
            response.code,
            response.message
        );
        Ok(response)
    }

    /// Query the entitlement
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /speedUp/query
    /// User-Agent: SpeedTestUp/1.0
    /// ```
    async fn query(&self) -> Result<QueryResponse> {
        let response: QueryResponse = self.get_json(&self.query_url, "Query").await?;
        tracing::debug!(
            "Query answered code {} for {}",
            response.code,
            response.data.ip
        );
        Ok(response)
    }

    fn client_name(&self) -> &'static str {
        "speedtest.cn"
    }
}
