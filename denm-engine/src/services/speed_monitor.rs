//! Speed monitoring from an external speed log.
//!
//! Each tick reads the lines appended since the previous read, keeps those
//! newer than the last processed timestamp and collapses them to the latest
//! entry per vehicle. Vehicles
//! over the zone limit are announced with their station id, resolved
//! through the shared identity registry.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use denm_config::SpeedConfig;
use denm_core::identity::IdentityRegistry;
use denm_detection::severity::kmh_to_mps;
use denm_detection::speed::parse_speed_log;
use denm_detection::{SpeedLogEntry, SpeedMonitor};
use denm_protocols::{Alert, AlertPayload, Severity};
use denm_telemetry::CsvRecorder;

use super::{row_append, AlertEmitter, AlertService, HostSnapshot};
use crate::context::{DegradedLatch, Facilities, TelemetrySinks};
use crate::error::ServiceError;
use crate::records::SpeedViolationRow;

/// Where the speed log comes from.
pub trait SpeedLogSource: Send {
    /// Lines appended since the previous call.
    fn read_log(&mut self) -> io::Result<String>;
}

/// Log file written by an external process, followed with a byte cursor.
#[derive(Debug, Clone)]
pub struct FileSpeedLog {
    path: PathBuf,
    offset: u64,
}

impl FileSpeedLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }
}

impl SpeedLogSource for FileSpeedLog {
    fn read_log(&mut self) -> io::Result<String> {
        let mut file = File::open(&self.path)?;
        if file.metadata()?.len() < self.offset {
            debug!(path = %self.path.display(), "Speed log truncated, reading from start");
            self.offset = 0;
        }
        file.seek(SeekFrom::Start(self.offset))?;

        let mut tail = String::new();
        file.read_to_string(&mut tail)?;
        // A partial last line is left for the next read.
        let complete = tail.rfind('\n').map_or(0, |end| end + 1);
        tail.truncate(complete);
        self.offset += complete as u64;
        Ok(tail)
    }
}

pub struct SpeedMonitoringService {
    monitor: SpeedMonitor,
    source: Box<dyn SpeedLogSource>,
    identities: Arc<IdentityRegistry>,
    processed_until: f64,
    emitter: AlertEmitter,
    violations_csv: Option<CsvRecorder<SpeedViolationRow>>,
    degraded: DegradedLatch,
}

impl SpeedMonitoringService {
    pub fn new(
        config: SpeedConfig,
        source: Box<dyn SpeedLogSource>,
        identities: Arc<IdentityRegistry>,
        telemetry: TelemetrySinks,
        vehicle_id: &str,
    ) -> Result<Self, ServiceError> {
        let emitter = AlertEmitter::new(telemetry);
        let violations_csv = emitter.recorder(&format!("speed_violations_{vehicle_id}.csv"))?;
        Ok(Self {
            monitor: SpeedMonitor::new(config),
            source,
            identities,
            processed_until: f64::NEG_INFINITY,
            emitter,
            violations_csv,
            degraded: DegradedLatch::default(),
        })
    }

    pub fn monitor(&self) -> &SpeedMonitor {
        &self.monitor
    }

    /// Entries newer than the last processed line, latest per vehicle.
    fn fresh_entries(&mut self, contents: &str) -> BTreeMap<String, SpeedLogEntry> {
        let mut latest = BTreeMap::new();
        let mut newest = self.processed_until;
        for entry in parse_speed_log(contents) {
            if entry.timestamp <= self.processed_until {
                continue;
            }
            newest = newest.max(entry.timestamp);
            latest.insert(entry.vehicle_id.clone(), entry);
        }
        self.processed_until = newest;
        latest
    }
}

impl AlertService for SpeedMonitoringService {
    fn name(&self) -> &'static str {
        "speed_monitoring"
    }

    #[instrument(level = "debug", skip_all, fields(now = ctx.now))]
    fn trigger(&mut self, ctx: &mut Facilities<'_>) -> Vec<Alert> {
        let Some(host) = ctx.vehicle.as_deref().map(HostSnapshot::capture) else {
            self.degraded.report(self.name(), "vehicle");
            return Vec::new();
        };

        let purged = self.monitor.stale_purge(ctx.now);
        if purged > 0 {
            debug!(purged, "Stale speed records dropped");
        }

        let contents = match self.source.read_log() {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "Speed log unreadable");
                return Vec::new();
            }
        };

        let mut alerts = Vec::new();
        for (vehicle_id, entry) in self.fresh_entries(&contents) {
            if vehicle_id == host.mobility_id {
                continue;
            }
            let assessment = self.monitor.entry_assess(&entry, ctx.now);
            if assessment.severity == Severity::None {
                continue;
            }
            let Some(offender) = self.identities.station_of(&vehicle_id) else {
                debug!(vehicle = %vehicle_id, "Offender has no station id, skipping");
                continue;
            };

            let alert = Alert::new(
                host.station,
                ctx.now,
                assessment.severity,
                entry.position,
                entry.speed,
                entry.heading,
                AlertPayload::Speed {
                    offending_vehicle: offender,
                    current_speed: entry.speed,
                    speed_limit: kmh_to_mps(assessment.limit_kmh),
                },
            );
            debug!(
                offender = %offender,
                limit_kmh = assessment.limit_kmh,
                excess_pct = assessment.excess_pct,
                "Speed violation"
            );
            self.emitter
                .emit(host.origin(), &host.mobility_id, &alert, ctx.transport);
            row_append(
                &mut self.violations_csv,
                &SpeedViolationRow {
                    time: ctx.now,
                    sender_id: host.mobility_id.clone(),
                    offender_id: vehicle_id,
                    offender_station: offender,
                    detected_speed: entry.speed,
                    pos_x: entry.position.x,
                    pos_y: entry.position.y,
                    violation: assessment.severity.label(),
                },
            );
            alerts.push(alert);
        }
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denm_core::station::StationId;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    use crate::services::testing::{RecordingTransport, TestVehicle};

    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Option<String>>>);

    impl SharedLog {
        fn set(&self, contents: Option<&str>) {
            *self.0.lock() = contents.map(str::to_string);
        }
    }

    impl SpeedLogSource for SharedLog {
        fn read_log(&mut self) -> io::Result<String> {
            self.0
                .lock()
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log"))
        }
    }

    fn service(log: &SharedLog) -> SpeedMonitoringService {
        let identities = Arc::new(IdentityRegistry::in_memory());
        identities.identity_register("car9", StationId(9)).unwrap();
        identities.identity_register("police", StationId(100)).unwrap();
        SpeedMonitoringService::new(
            SpeedConfig::default(),
            Box::new(log.clone()),
            identities,
            TelemetrySinks::disabled(),
            "police",
        )
        .unwrap()
    }

    fn police() -> TestVehicle {
        let mut vehicle = TestVehicle::new(100, 0.0);
        vehicle.mobility_id = "police".to_string();
        vehicle
    }

    fn tick(
        svc: &mut SpeedMonitoringService,
        now: f64,
        vehicle: &mut TestVehicle,
        transport: &mut RecordingTransport,
    ) -> Vec<Alert> {
        svc.trigger(&mut Facilities {
            now,
            vehicle: Some(vehicle),
            tracker: None,
            transport,
        })
    }

    #[test]
    fn speeding_vehicle_is_announced_once() {
        let log = SharedLog::default();
        // Near the origin the limit is 30 km/h; 12 m/s is 44% over.
        log.set(Some("1.0,car9,12.0,90.0,0.0,0.0\n"));
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();

        let alerts = tick(&mut svc, 1.0, &mut vehicle, &mut transport);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].station_id, StationId(100));
        assert_eq!(alerts[0].offender(), StationId(9));
        match alerts[0].payload {
            AlertPayload::Speed {
                current_speed,
                speed_limit,
                ..
            } => {
                assert_eq!(current_speed, 12.0);
                assert!((speed_limit - 30.0 / 3.6).abs() < 1e-9);
            }
            ref other => panic!("unexpected payload {other:?}"),
        }

        // Same line again: already processed.
        assert!(tick(&mut svc, 2.0, &mut vehicle, &mut transport).is_empty());
        assert_eq!(transport.sent.len(), 1);
    }

    #[test]
    fn latest_line_per_vehicle_wins() {
        let log = SharedLog::default();
        log.set(Some(
            "1.0,car9,12.0,90.0,0.0,0.0\n2.0,car9,9.5,90.0,0.0,0.0\n3.0,car7,20.0,90.0,0.0,0.0\n",
        ));
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();

        let alerts = tick(&mut svc, 3.0, &mut vehicle, &mut transport);
        // car9 at 34.2 km/h is 14% over: warning. car7 has no station id.
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(svc.monitor().last_speed("car9"), Some(9.5));
        assert_eq!(svc.monitor().last_speed("car7"), Some(20.0));
    }

    #[test]
    fn own_entries_and_compliant_vehicles_are_quiet() {
        let log = SharedLog::default();
        log.set(Some("1.0,police,40.0,0.0,0.0,0.0\n1.0,car9,8.0,0.0,0.0,0.0\n"));
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();
        assert!(tick(&mut svc, 1.0, &mut vehicle, &mut transport).is_empty());
        assert_eq!(svc.monitor().last_speed("police"), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let log = SharedLog::default();
        log.set(Some("garbage\n1.0,car9,abc,0.0,0.0,0.0\n2.0,car9,12.0,0.0,0.0,0.0\n"));
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();
        assert_eq!(tick(&mut svc, 2.0, &mut vehicle, &mut transport).len(), 1);
    }

    #[traced_test]
    #[test]
    fn unreadable_log_continues() {
        let log = SharedLog::default();
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();

        assert!(tick(&mut svc, 1.0, &mut vehicle, &mut transport).is_empty());
        assert!(logs_contain("Speed log unreadable"));

        log.set(Some("2.0,car9,12.0,0.0,0.0,0.0\n"));
        assert_eq!(tick(&mut svc, 2.0, &mut vehicle, &mut transport).len(), 1);
    }

    #[test]
    fn stale_records_expire() {
        let log = SharedLog::default();
        log.set(Some("1.0,car9,8.0,0.0,0.0,0.0\n"));
        let mut svc = service(&log);
        let mut vehicle = police();
        let mut transport = RecordingTransport::default();
        tick(&mut svc, 1.0, &mut vehicle, &mut transport);
        assert_eq!(svc.monitor().tracked(), 1);
        tick(&mut svc, 12.0, &mut vehicle, &mut transport);
        assert_eq!(svc.monitor().tracked(), 0);
    }

    #[test]
    fn file_source_returns_only_new_lines() {
        use std::fs::{self, OpenOptions};
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speed.log");
        let mut source = FileSpeedLog::new(&path);
        assert!(source.read_log().is_err());

        fs::write(&path, "1.0,car9,12.0,0.0,0.0,0.0\n2.0,car9,1").unwrap();
        assert_eq!(source.read_log().unwrap(), "1.0,car9,12.0,0.0,0.0,0.0\n");
        assert_eq!(source.read_log().unwrap(), "");

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"2.5,0.0,0.0,0.0\n").unwrap();
        assert_eq!(source.read_log().unwrap(), "2.0,car9,12.5,0.0,0.0,0.0\n");

        fs::write(&path, "3.0,car7,8.0,0.0,0.0,0.0\n").unwrap();
        assert_eq!(source.read_log().unwrap(), "3.0,car7,8.0,0.0,0.0,0.0\n");
    }
}
