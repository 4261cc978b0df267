use thiserror::Error;

use denm_core::IdentityError;
use denm_telemetry::TelemetryError;

/// Failures that prevent a service instance from starting.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Telemetry setup failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Station setup failed: {0}")]
    Station(#[from] IdentityError),
}
