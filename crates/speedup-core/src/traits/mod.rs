//! Core traits for the speedup system
//!
//! This module defines the abstract interfaces to the external collaborators.
//!
//! - [`PublicIpSource`]: Discover the current public IP
//! - [`AccelerationClient`]: Reopen and query the acceleration entitlement

pub mod ip_source;
pub mod accel_client;

pub use ip_source::PublicIpSource;
pub use accel_client::{AccelerationClient, QueryData, QueryResponse, ReopenData, ReopenResponse};
