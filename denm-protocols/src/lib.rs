//! # DENM Protocol Layer
//!
//! Wire codec for Decentralized Environmental Notification Messages and the
//! transport primitives (single-hop and geo-area broadcast) they travel on.

pub mod btp;
pub mod denm;

pub use btp::{DataIndication, DataRequest, TrafficClass, TransportType, DENM_PORT, RELAY_PORT};
pub use denm::{
    Alert, AlertPayload, CauseCode, DenmEncoder, DenmParseError, DenmParser, Severity,
};
