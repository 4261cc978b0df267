//! # DENM Telemetry
//!
//! Logging, metrics and CSV recording for alert services. Every handle is an
//! explicit instance owned by the service that writes to it.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod recorder;

pub use error::TelemetryError;
pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
pub use recorder::{
    fixed3, run_stamp, serialize_display_or_na, serialize_fixed3, serialize_fixed3_or_na,
    CsvRecorder, NOT_AVAILABLE,
};
