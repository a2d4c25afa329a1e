//! Test doubles and common utilities for contract tests
//!
//! These doubles script the two network collaborators and count every call
//! so tests can assert exactly how often the core reached the network.

#![allow(dead_code)]

use chrono::{FixedOffset, Utc};
use speedup_core::config::SpeedupConfig;
use speedup_core::error::{Error, Result};
use speedup_core::traits::{
    AccelerationClient, PublicIpSource, QueryData, QueryResponse, ReopenData, ReopenResponse,
};
use speedup_core::{AccelerationController, CycleEvent};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// A public IP source whose answer the test can change at any time
pub struct ScriptedIpSource {
    /// `Ok(body)` or `Err(message)` for the next fetches
    answer: Mutex<std::result::Result<String, String>>,
    /// Call counter for fetch()
    fetch_count: AtomicUsize,
}

impl ScriptedIpSource {
    pub fn new(ip: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(ip.to_string())),
            fetch_count: AtomicUsize::new(0),
        })
    }

    /// Answer later fetches with `ip`
    pub fn set_ip(&self, ip: &str) {
        *self.answer.lock().unwrap() = Ok(ip.to_string());
    }

    /// Fail later fetches with a network error
    pub fn fail(&self, message: &str) {
        *self.answer.lock().unwrap() = Err(message.to_string());
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PublicIpSource for ScriptedIpSource {
    async fn fetch(&self) -> Result<String> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .map_err(Error::network)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// An acceleration client with scripted responses and call tracking
pub struct ScriptedClient {
    /// Code returned by successful reopens
    reopen_code: Mutex<i64>,
    /// Number of upcoming reopens that fail with a network error
    failing_reopens: AtomicUsize,
    /// Payload returned by query()
    query_data: Mutex<QueryData>,
    /// Time spent inside reopen(), to widen race windows
    reopen_delay: Mutex<Duration>,

    reopen_count: AtomicUsize,
    query_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    /// A client whose line is capable but holds no active tier
    pub fn new() -> Arc<Self> {
        Self::with_query(capable_data())
    }

    pub fn with_query(data: QueryData) -> Arc<Self> {
        Arc::new(Self {
            reopen_code: Mutex::new(0),
            failing_reopens: AtomicUsize::new(0),
            query_data: Mutex::new(data),
            reopen_delay: Mutex::new(Duration::ZERO),
            reopen_count: AtomicUsize::new(0),
            query_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_reopen_code(&self, code: i64) {
        *self.reopen_code.lock().unwrap() = code;
    }

    /// Fail the next `n` reopens with a network error
    pub fn fail_next_reopens(&self, n: usize) {
        self.failing_reopens.store(n, Ordering::SeqCst);
    }

    /// Fail every reopen from now on
    pub fn fail_always(&self) {
        self.fail_next_reopens(usize::MAX);
    }

    pub fn set_query(&self, data: QueryData) {
        *self.query_data.lock().unwrap() = data;
    }

    pub fn set_reopen_delay(&self, delay: Duration) {
        *self.reopen_delay.lock().unwrap() = delay;
    }

    /// Get the number of times reopen() was called
    pub fn reopen_count(&self) -> usize {
        self.reopen_count.load(Ordering::SeqCst)
    }

    /// Get the number of times query() was called
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever in progress at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AccelerationClient for ScriptedClient {
    async fn reopen(&self) -> Result<ReopenResponse> {
        self.reopen_count.fetch_add(1, Ordering::SeqCst);
        self.enter();

        let delay = *self.reopen_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_reopens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let code = *self.reopen_code.lock().unwrap();
        self.exit();

        if failing {
            return Err(Error::network("connection refused"));
        }
        Ok(ReopenResponse {
            code,
            message: format!("code {}", code),
            data: ReopenData {
                result: "ok".to_string(),
            },
        })
    }

    async fn query(&self) -> Result<QueryResponse> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.enter();
        let data = self.query_data.lock().unwrap().clone();
        self.exit();

        Ok(QueryResponse {
            code: 0,
            message: "ok".to_string(),
            data,
        })
    }

    fn client_name(&self) -> &'static str {
        "scripted"
    }
}

/// A line that reports `canSpeed = 1` and nothing else
pub fn capable_data() -> QueryData {
    QueryData {
        ip: "100.64.1.2".to_string(),
        updated_at: "2024-05-01 10:00:00".to_string(),
        can_speed: 1,
        ..Default::default()
    }
}

/// A line with no capability flag and no bandwidth on any tier
pub fn ineligible_data() -> QueryData {
    QueryData {
        ip: "100.64.1.2".to_string(),
        can_speed: 0,
        down_expire_t: Some("false".to_string()),
        up_h_expire_t: Some("false".to_string()),
        up_100_expire_t: Some("false".to_string()),
        package_1_expire_t: Some("false".to_string()),
        package_2_expire_t: Some("false".to_string()),
        ..Default::default()
    }
}

/// Render `now + offset` the way the provider does (UTC+8 civil time)
pub fn provider_time(offset: chrono::Duration) -> String {
    let zone = FixedOffset::east_opt(8 * 3600).unwrap();
    (Utc::now() + offset)
        .with_timezone(&zone)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Default config with fast retries
pub fn test_config() -> SpeedupConfig {
    let mut config = SpeedupConfig::default();
    config.auto_recovery.max_retries = 3;
    config.auto_recovery.retry_interval = Duration::from_secs(1);
    config
}

/// Build a controller around a scripted client
pub fn controller(
    client: &Arc<ScriptedClient>,
    config: &SpeedupConfig,
) -> (Arc<AccelerationController>, mpsc::Receiver<CycleEvent>) {
    let (controller, rx) = AccelerationController::new(client.clone(), config);
    (Arc::new(controller), rx)
}

/// Drain every event currently buffered
pub fn drain(rx: &mut mpsc::Receiver<CycleEvent>) -> Vec<CycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
