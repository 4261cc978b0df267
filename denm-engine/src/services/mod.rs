//! Alert-producing services, one per hazard family.
//!
//! Each service is driven by the periodic tick through [`AlertService`].
//! It reads host state and tracked objects from [`Facilities`], decides a
//! severity and broadcasts at most one alert per tick (the speed monitor
//! may announce one per offending vehicle).

mod collision;
mod drowsiness;
mod lane_change;
mod speed_monitor;

pub use collision::CollisionWarningService;
pub use drowsiness::DrowsinessDetectionService;
pub use lane_change::{LaneChangePlan, LaneChangeWarningService};
pub use speed_monitor::{FileSpeedLog, SpeedLogSource, SpeedMonitoringService};

use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_core::vehicle::VehicleController;
use denm_detection::HostKinematics;
use denm_protocols::{Alert, AlertPayload, Severity};
use denm_telemetry::CsvRecorder;
use serde::Serialize;
use tracing::warn;

use crate::context::{Facilities, TelemetrySinks};
use crate::disseminator::AlertDisseminator;
use crate::error::ServiceError;
use crate::transport::{Origin, Transport};

pub trait AlertService {
    fn name(&self) -> &'static str;

    /// Evaluate the hazard at `ctx.now`. Returns the alerts handed to the
    /// transport during this call.
    fn trigger(&mut self, ctx: &mut Facilities<'_>) -> Vec<Alert>;
}

/// Host state copied out of the vehicle at the start of a tick.
#[derive(Debug, Clone)]
pub(crate) struct HostSnapshot {
    pub(crate) station: StationId,
    pub(crate) mobility_id: String,
    pub(crate) position: Position,
    pub(crate) speed: f64,
    pub(crate) heading: f64,
    pub(crate) lane: u8,
    pub(crate) is_emergency: bool,
}

impl HostSnapshot {
    pub(crate) fn capture(vehicle: &dyn VehicleController) -> Self {
        Self {
            station: vehicle.station_id(),
            mobility_id: vehicle.mobility_id().to_string(),
            position: vehicle.position(),
            speed: vehicle.speed(),
            heading: vehicle.heading(),
            lane: vehicle.lane(),
            is_emergency: vehicle.is_emergency(),
        }
    }

    pub(crate) fn origin(&self) -> Origin {
        Origin {
            station: self.station,
            position: self.position,
        }
    }

    pub(crate) fn kinematics(&self) -> HostKinematics {
        HostKinematics {
            position: self.position,
            speed: self.speed,
        }
    }

    /// Alert located at the host with its current kinematics.
    pub(crate) fn alert(&self, now: f64, severity: Severity, payload: AlertPayload) -> Alert {
        Alert::new(
            self.station,
            now,
            severity,
            self.position,
            self.speed,
            self.heading,
            payload,
        )
    }
}

/// Broadcast shared by every sender: encode, hand over, count, log.
pub(crate) struct AlertEmitter {
    disseminator: AlertDisseminator,
    telemetry: TelemetrySinks,
}

impl AlertEmitter {
    pub(crate) fn new(telemetry: TelemetrySinks) -> Self {
        Self {
            disseminator: AlertDisseminator::new(),
            telemetry,
        }
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySinks {
        &self.telemetry
    }

    pub(crate) fn emit(
        &self,
        origin: Origin,
        sender: &str,
        alert: &Alert,
        transport: &mut dyn Transport,
    ) {
        self.disseminator.alert_broadcast(origin, alert, transport);
        self.telemetry.alert_sent(alert, sender);
    }

    /// Open `<file_name>` in the CSV directory when one is configured.
    pub(crate) fn recorder<R: Serialize>(
        &self,
        file_name: &str,
    ) -> Result<Option<CsvRecorder<R>>, ServiceError> {
        match &self.telemetry.csv_dir {
            Some(dir) => Ok(Some(CsvRecorder::create(dir, file_name)?)),
            None => Ok(None),
        }
    }
}

/// Append a row, logging instead of failing.
pub(crate) fn row_append<R: Serialize>(recorder: &mut Option<CsvRecorder<R>>, row: &R) {
    if let Some(recorder) = recorder {
        if let Err(err) = recorder.record_append(row) {
            warn!(path = %recorder.path().display(), error = %err, "Row not written");
        }
    }
}
