//! Per-tick facilities handed to services and the telemetry handles they own.

use std::path::PathBuf;

use opentelemetry::KeyValue;

use denm_core::vehicle::VehicleController;
use denm_detection::ObjectTracker;
use denm_protocols::Alert;
use denm_telemetry::{EventLogger, MetricsRecorder};

use crate::transport::Transport;

/// What a service can reach during one `trigger` call.
///
/// A missing vehicle or tracker puts the service in degraded mode: it logs
/// once and treats every risk as `+inf`.
pub struct Facilities<'a> {
    pub now: f64,
    pub vehicle: Option<&'a mut dyn VehicleController>,
    pub tracker: Option<&'a dyn ObjectTracker>,
    pub transport: &'a mut dyn Transport,
}

/// Metrics and CSV destination shared by the services of one run.
#[derive(Clone, Default)]
pub struct TelemetrySinks {
    pub metrics: Option<MetricsRecorder>,
    /// CSV files are written here when set.
    pub csv_dir: Option<PathBuf>,
}

impl TelemetrySinks {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub(crate) fn alert_sent(&self, alert: &Alert, sender: &str) {
        let family = alert.cause().family();
        if let Some(metrics) = &self.metrics {
            metrics.inc_sent(family);
        }
        EventLogger::log_event(
            "alert_sent",
            vec![
                KeyValue::new("family", family),
                KeyValue::new("sender", sender.to_string()),
                KeyValue::new("station", i64::from(alert.station_id.raw())),
                KeyValue::new("sub_cause", i64::from(alert.severity.as_u8())),
            ],
        );
    }

    pub(crate) fn with_metrics(&self, f: impl FnOnce(&MetricsRecorder)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

/// Logs the first time a facility is missing, then stays quiet.
#[derive(Debug, Default)]
pub(crate) struct DegradedLatch {
    reported: bool,
}

impl DegradedLatch {
    pub(crate) fn report(&mut self, service: &'static str, facility: &'static str) {
        if !self.reported {
            tracing::warn!(service, facility, "Facility unavailable, running degraded");
            self.reported = true;
        }
    }
}
