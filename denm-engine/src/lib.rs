//! # DENM Engine
//!
//! Alert lifecycle services on top of detection, codec and reaction:
//!
//! - `services`: per-family senders (collision, lane change, drowsiness, speed)
//! - `disseminator`: single-hop for vehicles, geo-area for relays
//! - `receiver`: decode, relevance gate, cooldown, reaction, telemetry
//! - `relay`: roadside forwarding to an enlarged area
//!
//! Services never own the vehicle, the tracker or the transport. They get
//! them per call through [`Facilities`] or as explicit arguments.

pub mod context;
pub mod disseminator;
pub mod error;
pub mod receiver;
pub mod records;
pub mod relay;
pub mod relevance;
pub mod services;
pub mod transport;

pub use context::{Facilities, TelemetrySinks};
pub use disseminator::AlertDisseminator;
pub use error::ServiceError;
pub use receiver::{AlertReceiverService, ReceiveOutcome};
pub use relay::{RelayDecision, RelayService};
pub use relevance::{CooldownTracker, Relevance, RelevanceFilter};
pub use services::{
    AlertService, CollisionWarningService, DrowsinessDetectionService, FileSpeedLog,
    LaneChangePlan, LaneChangeWarningService, SpeedLogSource, SpeedMonitoringService,
};
pub use transport::{Origin, Transport};
