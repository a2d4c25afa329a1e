//! Status and state model
//!
//! - [`EntitlementSnapshot`]: immutable result of one entitlement query
//! - [`AccelerationStatus`]: derived per-direction state, owned by the controller
//! - [`SchedulerStatus`]: read-only view returned by `TaskScheduler::status`

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::error::Result;
use crate::evaluator::parse_expiry;
use crate::traits::QueryResponse;

/// Expiry of one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "at")]
pub enum Expiry {
    /// The tier was never provisioned for this line
    NotProvisioned,
    /// Civil time in the provider zone at which the tier lapses
    At(NaiveDateTime),
}

/// Parsed expiry plus the provider's human-readable rendering of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierExpiry {
    pub expiry: Expiry,
    pub label: String,
}

/// Result of one entitlement query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementSnapshot {
    /// Egress IP as seen by the provider
    pub ip: String,
    /// Provider-reported start of the current grant
    pub updated_at: String,
    /// `canSpeed == 1`
    pub capable: bool,

    pub download_mbps: i64,
    pub target_up_h_kbps: i64,
    pub target_up_100_kbps: i64,

    pub download_expiry: TierExpiry,
    pub up_h_expiry: TierExpiry,
    pub up_100_expiry: TierExpiry,
    /// Package 1 covers both directions
    pub package_1_expiry: TierExpiry,
    /// Package 2 covers both directions
    pub package_2_expiry: TierExpiry,
}

impl EntitlementSnapshot {
    /// Build a snapshot from a query response
    ///
    /// Fails with `Error::Parse` if any expiry is neither a timestamp nor the
    /// "not provisioned" sentinel.
    pub fn from_response(response: &QueryResponse) -> Result<Self> {
        let data = &response.data;
        let tier = |raw: &Option<String>, label: &str| -> Result<TierExpiry> {
            Ok(TierExpiry {
                expiry: parse_expiry(raw.as_deref())?,
                label: label.to_string(),
            })
        };

        Ok(Self {
            ip: data.ip.clone(),
            updated_at: data.updated_at.clone(),
            capable: data.can_speed == 1,
            download_mbps: data.download,
            target_up_h_kbps: data.target_up_h,
            target_up_100_kbps: data.target_up_100,
            download_expiry: tier(&data.down_expire_t, &data.down_expire)?,
            up_h_expiry: tier(&data.up_h_expire_t, &data.up_h_expire)?,
            up_100_expiry: tier(&data.up_100_expire_t, &data.up_100_expire)?,
            package_1_expiry: tier(&data.package_1_expire_t, &data.package_1_expire)?,
            package_2_expiry: tier(&data.package_2_expire_t, &data.package_2_expire)?,
        })
    }

    /// Download bandwidth in Mbps
    pub fn download_bandwidth(&self) -> i64 {
        self.download_mbps
    }

    /// Upstream tier-H bandwidth in Mbps
    pub fn up_h_bandwidth(&self) -> i64 {
        self.target_up_h_kbps / 1024
    }

    /// Upstream tier-100 bandwidth in Mbps
    pub fn up_100_bandwidth(&self) -> i64 {
        self.target_up_100_kbps / 1024
    }

    /// Whether any tier reports a strictly positive bandwidth
    pub fn has_bandwidth_evidence(&self) -> bool {
        self.download_mbps > 0 || self.target_up_h_kbps > 0 || self.target_up_100_kbps > 0
    }
}

/// Per-direction acceleration state
///
/// Only mutated at the end of a successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccelerationStatus {
    pub up_active: bool,
    pub down_active: bool,
    pub last_executed: Option<DateTime<Utc>>,
    pub last_snapshot: Option<EntitlementSnapshot>,
}

/// Read-only scheduler status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_execute: Option<DateTime<Utc>>,
    #[serde(with = "crate::config::duration_str")]
    pub check_interval: Duration,
    pub self_check: bool,
    pub auto_recovery: bool,
    pub current_ip: Option<String>,
    pub ip_binding_enabled: bool,
    pub acceleration: AccelerationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::traits::QueryData;

    fn response(data: QueryData) -> QueryResponse {
        QueryResponse {
            code: 0,
            message: String::new(),
            data,
        }
    }

    #[test]
    fn test_bandwidth_conversion() {
        let snap = EntitlementSnapshot::from_response(&response(QueryData {
            download: 100,
            target_up_h: 2048,
            target_up_100: 5120,
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(snap.download_bandwidth(), 100);
        assert_eq!(snap.up_h_bandwidth(), 2);
        assert_eq!(snap.up_100_bandwidth(), 5);
    }

    #[test]
    fn test_kbps_conversion_truncates() {
        let snap = EntitlementSnapshot::from_response(&response(QueryData {
            target_up_h: 1023,
            target_up_100: 3000,
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(snap.up_h_bandwidth(), 0);
        assert_eq!(snap.up_100_bandwidth(), 2);
        assert!(snap.has_bandwidth_evidence());
    }

    #[test]
    fn test_from_response_keeps_labels_and_flag() {
        let snap = EntitlementSnapshot::from_response(&response(QueryData {
            ip: "100.64.1.2".to_string(),
            can_speed: 1,
            down_expire: "2030-01-01".to_string(),
            down_expire_t: Some("2030-01-01 00:00:00".to_string()),
            up_h_expire_t: Some("false".to_string()),
            ..Default::default()
        }))
        .unwrap();

        assert!(snap.capable);
        assert_eq!(snap.download_expiry.label, "2030-01-01");
        assert!(matches!(snap.download_expiry.expiry, Expiry::At(_)));
        assert_eq!(snap.up_h_expiry.expiry, Expiry::NotProvisioned);
        assert_eq!(snap.package_2_expiry.expiry, Expiry::NotProvisioned);
    }

    #[test]
    fn test_from_response_rejects_malformed_expiry() {
        let err = EntitlementSnapshot::from_response(&response(QueryData {
            package_2_expire_t: Some("next week".to_string()),
            ..Default::default()
        }))
        .unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
    }
}
