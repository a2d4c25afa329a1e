//! Entitlement evaluation
//!
//! Pure functions that turn an [`EntitlementSnapshot`] and an evaluation
//! instant into availability and per-direction activity. All tier
//! "is it still active" logic lives here and nowhere else.
//!
//! Expiry timestamps are civil times in the provisioning service's home zone
//! (UTC+08:00), not in the zone of the machine running the evaluator.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::status::{EntitlementSnapshot, Expiry};

/// Wire format of every `...ExpireT` timestamp
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel meaning "this tier is not provisioned"
pub const NOT_PROVISIONED: &str = "false";

/// UTC offset of the provisioning service's home zone, in seconds
const PROVIDER_UTC_OFFSET_SECS: i32 = 8 * 60 * 60;

/// Parse a raw `...ExpireT` value
///
/// `None` and the `"false"` sentinel mean "not provisioned". Anything else,
/// blank strings included, must match [`EXPIRY_FORMAT`] or the cycle fails
/// with a parse error.
pub fn parse_expiry(raw: Option<&str>) -> Result<Expiry> {
    let Some(raw) = raw else {
        return Ok(Expiry::NotProvisioned);
    };
    if raw == NOT_PROVISIONED {
        return Ok(Expiry::NotProvisioned);
    }

    NaiveDateTime::parse_from_str(raw, EXPIRY_FORMAT)
        .map(Expiry::At)
        .map_err(|e| Error::parse(format!("Invalid expiry timestamp '{}': {}", raw, e)))
}

/// Outcome of evaluating one snapshot at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub available: bool,
    pub bandwidth_evidence: bool,
    pub up_active: bool,
    pub down_active: bool,
}

/// Interprets entitlement snapshots
#[derive(Debug, Clone, Copy)]
pub struct EntitlementEvaluator {
    zone: FixedOffset,
}

impl EntitlementEvaluator {
    /// Evaluator using the provisioning service's home zone
    ///
    /// Falls back to the local offset if the provider offset cannot be built.
    pub fn new() -> Self {
        let zone = FixedOffset::east_opt(PROVIDER_UTC_OFFSET_SECS).unwrap_or_else(|| {
            tracing::warn!("Provider time zone unavailable, comparing expiries in local time");
            *Local::now().offset()
        });
        Self { zone }
    }

    /// Evaluator interpreting expiries in an explicit zone
    pub fn with_zone(zone: FixedOffset) -> Self {
        Self { zone }
    }

    /// Zone expiries are interpreted in
    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Whether the line can be (or already is) accelerated
    ///
    /// A positive bandwidth counts even when `canSpeed` reads 0: the provider
    /// reports "not capable" for lines that already hold an active grant.
    pub fn is_available(&self, snapshot: &EntitlementSnapshot) -> bool {
        snapshot.capable || snapshot.has_bandwidth_evidence()
    }

    /// Download is active if the direct tier or either package is unexpired
    pub fn is_download_active(&self, snapshot: &EntitlementSnapshot, now: DateTime<Utc>) -> bool {
        [
            &snapshot.download_expiry,
            &snapshot.package_1_expiry,
            &snapshot.package_2_expiry,
        ]
        .into_iter()
        .any(|tier| self.is_unexpired(&tier.expiry, now))
    }

    /// Upload is active if either upstream tier or either package is unexpired
    pub fn is_upload_active(&self, snapshot: &EntitlementSnapshot, now: DateTime<Utc>) -> bool {
        [
            &snapshot.up_h_expiry,
            &snapshot.up_100_expiry,
            &snapshot.package_1_expiry,
            &snapshot.package_2_expiry,
        ]
        .into_iter()
        .any(|tier| self.is_unexpired(&tier.expiry, now))
    }

    /// Evaluate everything at once
    pub fn evaluate(&self, snapshot: &EntitlementSnapshot, now: DateTime<Utc>) -> Evaluation {
        Evaluation {
            available: self.is_available(snapshot),
            bandwidth_evidence: snapshot.has_bandwidth_evidence(),
            up_active: self.is_upload_active(snapshot, now),
            down_active: self.is_download_active(snapshot, now),
        }
    }

    /// Absolute instant of a civil expiry time in the provider zone
    pub fn expiry_instant(&self, expiry: &NaiveDateTime) -> Option<DateTime<Utc>> {
        self.zone
            .from_local_datetime(expiry)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn is_unexpired(&self, expiry: &Expiry, now: DateTime<Utc>) -> bool {
        match expiry {
            Expiry::NotProvisioned => false,
            Expiry::At(naive) => self
                .expiry_instant(naive)
                .is_some_and(|instant| now < instant),
        }
    }
}

impl Default for EntitlementEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
