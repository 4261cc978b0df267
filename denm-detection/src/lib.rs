//! # DENM Detection
//!
//! Turns tracked objects, host state and external telemetry into hazard
//! decisions: time-to-collision, composite lane-change risk, drowsiness level
//! and speed violations, each mapped to a DENM severity.

pub mod drowsiness;
pub mod estimator;
pub mod history;
pub mod severity;
pub mod speed;
pub mod tracker;

pub use drowsiness::{DrowsinessMonitor, DrowsinessReading};
pub use estimator::{HostKinematics, RiskEstimator, TtcEstimate};
pub use history::ObjectHistory;
pub use speed::{SpeedAssessment, SpeedLogEntry, SpeedLogError, SpeedMonitor};
pub use tracker::{ObjectTracker, SensorDetection, TrackedObject};
