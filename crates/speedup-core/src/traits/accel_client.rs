// # Acceleration Client Trait
//
// Defines the interface for the two provisioning calls made on every cycle:
// reopening the entitlement and querying its current state.
//
// ## Implementations
//
// - speedtest.cn: `speedup-provider-speedtest` crate
//
// ## Usage
//
// ```rust,ignore
// use speedup_core::AccelerationClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* AccelerationClient implementation */;
//
//     let reopen = client.reopen().await?;
//     println!("reopen code: {}", reopen.code);
//
//     let query = client.query().await?;
//     println!("egress ip: {}", query.data.ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response of the reopen-entitlement call
///
/// `{ "code": 0, "message": "...", "data": { "result": "..." } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReopenResponse {
    /// 0 on success; nonzero codes are classified by the controller
    pub code: i64,
    pub message: String,
    pub data: ReopenData,
}

/// Payload of [`ReopenResponse`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReopenData {
    pub result: String,
}

/// Response of the query-entitlement call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub code: i64,
    pub message: String,
    pub data: QueryData,
}

/// Payload of [`QueryResponse`]
///
/// Bandwidths: `download` is in Mbps, `targetUpH` / `targetUp100` in Kbps.
/// Every tier carries a human-readable expiry plus a machine `...ExpireT`
/// field that is either a `YYYY-MM-DD HH:MM:SS` string or the "not
/// provisioned" sentinel (`"false"`, `false`, `null` or absent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryData {
    pub ip: String,
    pub updated_at: String,
    pub can_speed: i64,

    pub download: i64,
    pub down_expire: String,
    #[serde(deserialize_with = "expiry_field")]
    pub down_expire_t: Option<String>,

    pub target_up_h: i64,
    pub up_h_expire: String,
    #[serde(rename = "upHExpireT", deserialize_with = "expiry_field")]
    pub up_h_expire_t: Option<String>,

    #[serde(rename = "targetUp100")]
    pub target_up_100: i64,
    #[serde(rename = "up100Expire")]
    pub up_100_expire: String,
    #[serde(rename = "up100ExpireT", deserialize_with = "expiry_field")]
    pub up_100_expire_t: Option<String>,

    /// Package 1: combined upstream + downstream
    #[serde(rename = "downUp50Expire")]
    pub package_1_expire: String,
    #[serde(rename = "downUp50ExpireT", deserialize_with = "expiry_field")]
    pub package_1_expire_t: Option<String>,

    /// Package 2: combined upstream + downstream
    #[serde(rename = "downUpExpire")]
    pub package_2_expire: String,
    #[serde(rename = "downUpExpireT", deserialize_with = "expiry_field")]
    pub package_2_expire_t: Option<String>,
}

/// Accept a string, a number, `false` or `null` for an `...ExpireT` field.
///
/// `false` and `null` map to `None`; strings and numbers are kept verbatim so
/// the evaluator can reject anything that is not a timestamp or the sentinel.
fn expiry_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ExpiryVisitor;

    impl<'de> Visitor<'de> for ExpiryVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an expiry timestamp string, false, or null")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
            if value {
                Ok(Some("true".to_string()))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(ExpiryVisitor)
}

/// Trait for acceleration provisioning clients
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS calls to the provisioning endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the retry policy handles recovery)
///
/// ## Forbidden Capabilities
/// - ❌ Retry, back off or sleep (owned by `RetryPolicy`)
/// - ❌ Spawn tasks
/// - ❌ Interpret entitlement state (owned by `EntitlementEvaluator`)
/// - ❌ Classify response codes (owned by `AccelerationController`)
#[async_trait]
pub trait AccelerationClient: Send + Sync {
    /// Reopen (re-assert) the acceleration entitlement for the current egress IP
    ///
    /// # Returns
    ///
    /// - `Ok(ReopenResponse)`: The decoded response, whatever its `code`
    /// - `Err(Error::Network)`: Transport failure or non-success HTTP status
    /// - `Err(Error::Parse)`: Body was not the expected JSON
    async fn reopen(&self) -> Result<ReopenResponse, crate::Error>;

    /// Query the current acceleration entitlement
    ///
    /// # Returns
    ///
    /// - `Ok(QueryResponse)`: The decoded response
    /// - `Err(Error::Network)`: Transport failure or non-success HTTP status
    /// - `Err(Error::Parse)`: Body was not the expected JSON
    async fn query(&self) -> Result<QueryResponse, crate::Error>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_decodes_wire_names() {
        let body = r#"{
            "code": 0,
            "message": "ok",
            "data": {
                "ip": "100.64.1.2",
                "updatedAt": "2024-05-01 10:00:00",
                "canSpeed": 1,
                "download": 100,
                "downExpire": "2024-05-08",
                "downExpireT": "2024-05-08 10:00:00",
                "targetUpH": 2048,
                "upHExpire": "2024-05-08",
                "upHExpireT": false,
                "targetUp100": 5120,
                "up100Expire": "",
                "up100ExpireT": "false",
                "downUp50Expire": "",
                "downUp50ExpireT": null,
                "downUpExpire": ""
            }
        }"#;

        let resp: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.ip, "100.64.1.2");
        assert_eq!(resp.data.can_speed, 1);
        assert_eq!(resp.data.download, 100);
        assert_eq!(resp.data.target_up_h, 2048);
        assert_eq!(resp.data.target_up_100, 5120);
        assert_eq!(resp.data.down_expire_t.as_deref(), Some("2024-05-08 10:00:00"));
        assert_eq!(resp.data.up_h_expire_t, None);
        assert_eq!(resp.data.up_100_expire_t.as_deref(), Some("false"));
        assert_eq!(resp.data.package_1_expire_t, None);
        assert_eq!(resp.data.package_2_expire_t, None);
    }

    #[test]
    fn test_reopen_response_decodes() {
        let resp: ReopenResponse =
            serde_json::from_str(r#"{"code":10002,"message":"too frequent","data":{"result":""}}"#)
                .unwrap();
        assert_eq!(resp.code, 10002);
        assert_eq!(resp.message, "too frequent");
    }

    #[test]
    fn test_reopen_response_tolerates_missing_data() {
        let resp: ReopenResponse = serde_json::from_str(r#"{"code":0}"#).unwrap();
        assert_eq!(resp.code, 0);
        assert!(resp.data.result.is_empty());
    }
}
