// # Public IP Source Trait
//
// Defines the interface for discovering the current public (egress) IP.
//
// ## Implementations
//
// - HTTP echo services: `speedup-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use speedup_core::PublicIpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* PublicIpSource implementation */;
//
//     // Raw body; validation is done by IpMonitor
//     let body = source.fetch().await?;
//     println!("echo service said: {body:?}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for public IP source implementations
///
/// A source only fetches. It returns whatever the discovery service answered
/// and leaves trimming and dotted-quad validation to
/// [`IpMonitor`](crate::monitor::IpMonitor), which owns the last observed IP.
///
/// # Forbidden Capabilities
/// - ❌ Caching the last IP (owned by `IpMonitor`)
/// - ❌ Retry or polling loops (owned by `RetryPolicy` and `TaskScheduler`)
/// - ❌ Deciding whether the IP changed
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Fetch the raw public IP response body
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The untrimmed body returned by the discovery service
    /// - `Err(Error)`: Transport failure, reported as `Error::Network`
    async fn fetch(&self) -> Result<String, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
