//! Forward collision warning.
//!
//! Every tracked object gets a TTC estimate; the smallest TTC decides the
//! severity of the single alert sent per tick.

use tracing::{debug, instrument};

use denm_config::{CollisionConfig, EstimatorConfig, TtcThresholds};
use denm_detection::severity::ttc_severity;
use denm_detection::{RiskEstimator, TtcEstimate};
use denm_protocols::{Alert, AlertPayload, Severity};
use denm_telemetry::CsvRecorder;

use super::{row_append, AlertEmitter, AlertService, HostSnapshot};
use crate::context::{DegradedLatch, Facilities, TelemetrySinks};
use crate::error::ServiceError;
use crate::records::{CollisionSenderRow, SenderRecord};

pub struct CollisionWarningService {
    estimator: RiskEstimator,
    thresholds: TtcThresholds,
    emitter: AlertEmitter,
    sender_csv: Option<CsvRecorder<CollisionSenderRow>>,
    degraded: DegradedLatch,
}

impl CollisionWarningService {
    pub fn new(
        estimator: EstimatorConfig,
        collision: &CollisionConfig,
        telemetry: TelemetrySinks,
        vehicle_id: &str,
    ) -> Result<Self, ServiceError> {
        let emitter = AlertEmitter::new(telemetry);
        let sender_csv = emitter.recorder(&format!("collision_sender_{vehicle_id}.csv"))?;
        Ok(Self {
            estimator: RiskEstimator::new(estimator),
            thresholds: collision.thresholds.clone(),
            emitter,
            sender_csv,
            degraded: DegradedLatch::default(),
        })
    }

    pub fn estimator(&self) -> &RiskEstimator {
        &self.estimator
    }
}

impl AlertService for CollisionWarningService {
    fn name(&self) -> &'static str {
        "collision_warning"
    }

    #[instrument(level = "debug", skip_all, fields(now = ctx.now))]
    fn trigger(&mut self, ctx: &mut Facilities<'_>) -> Vec<Alert> {
        let Some(host) = ctx.vehicle.as_deref().map(HostSnapshot::capture) else {
            self.degraded.report(self.name(), "vehicle");
            return Vec::new();
        };
        let Some(tracker) = ctx.tracker else {
            self.degraded.report(self.name(), "tracker");
            return Vec::new();
        };

        let kinematics = host.kinematics();
        let mut closest: Option<TtcEstimate> = None;
        for object in tracker.objects() {
            let estimate = self
                .estimator
                .time_to_collision(ctx.now, &kinematics, &object, tracker);
            if !estimate.is_resolved() {
                continue;
            }
            let severity = ttc_severity(estimate.ttc, &self.thresholds);
            row_append(
                &mut self.sender_csv,
                &CollisionSenderRow::from(SenderRecord {
                    time: ctx.now,
                    vehicle_id: host.mobility_id.clone(),
                    speed: host.speed,
                    object_id: object.id.clone(),
                    distance: estimate.distance,
                    metric: estimate.ttc,
                    sub_cause: severity.as_u8(),
                }),
            );
            if closest.map_or(true, |best| estimate.ttc < best.ttc) {
                closest = Some(estimate);
            }
        }

        let Some(closest) = closest else {
            return Vec::new();
        };
        let severity = ttc_severity(closest.ttc, &self.thresholds);
        if severity == Severity::None {
            debug!(ttc = closest.ttc, "No collision risk");
            return Vec::new();
        }

        self.emitter
            .telemetry()
            .with_metrics(|m| m.observe_ttc(closest.ttc));
        let alert = host.alert(
            ctx.now,
            severity,
            AlertPayload::Collision {
                time_to_collision: closest.ttc,
            },
        );
        self.emitter
            .emit(host.origin(), &host.mobility_id, &alert, ctx.transport);
        vec![alert]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denm_core::geo::Position;
    use denm_protocols::{CauseCode, DenmParser, DENM_PORT};
    use denm_telemetry::MetricsRecorder;
    use tracing_test::traced_test;

    use crate::services::testing::{RecordingTransport, StaticTracker, TestVehicle};

    fn service(telemetry: TelemetrySinks) -> CollisionWarningService {
        CollisionWarningService::new(
            EstimatorConfig::default(),
            &CollisionConfig::default(),
            telemetry,
            "veh0",
        )
        .unwrap()
    }

    #[test]
    fn imminent_object_raises_critical_alert() {
        let metrics = MetricsRecorder::new().unwrap();
        let mut svc = service(TelemetrySinks {
            metrics: Some(metrics.clone()),
            csv_dir: None,
        });
        let mut vehicle = TestVehicle::new(0, 20.0);
        let tracker = StaticTracker::with(&[("obj", Position::new(20.0, 0.0))]);
        let mut transport = RecordingTransport::default();

        let alerts = svc.trigger(&mut Facilities {
            now: 1.0,
            vehicle: Some(&mut vehicle),
            tracker: Some(&tracker),
            transport: &mut transport,
        });

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.cause(), CauseCode::Collision);
        assert_eq!(alert.severity, Severity::Critical);
        match alert.payload {
            AlertPayload::Collision { time_to_collision } => {
                assert!((time_to_collision - 1.0).abs() < 1e-9)
            }
            ref other => panic!("unexpected payload {other:?}"),
        }

        let (_, request, frame) = &transport.sent[0];
        assert_eq!(request.destination_port, DENM_PORT);
        assert_eq!(frame.len(), 64);
        assert_eq!(&DenmParser::new().parse(frame).unwrap(), alert);
        assert_eq!(MetricsRecorder::count(&metrics.alerts_sent, "collision"), 1);
    }

    #[test]
    fn distant_object_stays_silent() {
        let mut svc = service(TelemetrySinks::disabled());
        let mut vehicle = TestVehicle::new(0, 20.0);
        let tracker = StaticTracker::with(&[("obj", Position::new(200.0, 0.0))]);
        let mut transport = RecordingTransport::default();

        let alerts = svc.trigger(&mut Facilities {
            now: 1.0,
            vehicle: Some(&mut vehicle),
            tracker: Some(&tracker),
            transport: &mut transport,
        });
        assert!(alerts.is_empty());
        assert!(transport.sent.is_empty());
        assert_eq!(svc.estimator().tracked_count(), 1);
    }

    #[test]
    fn closest_object_decides() {
        let mut svc = service(TelemetrySinks::disabled());
        let mut vehicle = TestVehicle::new(0, 20.0);
        let tracker = StaticTracker::with(&[
            ("far", Position::new(50.0, 0.0)),
            ("near", Position::new(40.0, 0.0)),
        ]);
        let mut transport = RecordingTransport::default();

        let alerts = svc.trigger(&mut Facilities {
            now: 1.0,
            vehicle: Some(&mut vehicle),
            tracker: Some(&tracker),
            transport: &mut transport,
        });
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(
            alerts[0].payload,
            AlertPayload::Collision {
                time_to_collision: 2.0
            }
        );
    }

    #[traced_test]
    #[test]
    fn missing_tracker_degrades_once() {
        let mut svc = service(TelemetrySinks::disabled());
        let mut vehicle = TestVehicle::new(0, 20.0);
        let mut transport = RecordingTransport::default();
        for now in [1.0, 2.0] {
            let alerts = svc.trigger(&mut Facilities {
                now,
                vehicle: Some(&mut vehicle),
                tracker: None,
                transport: &mut transport,
            });
            assert!(alerts.is_empty());
        }
        assert!(logs_contain("Facility unavailable, running degraded"));
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("running degraded"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one degraded report, got {n}")),
            }
        });
    }

    #[test]
    fn sender_rows_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(TelemetrySinks {
            metrics: None,
            csv_dir: Some(dir.path().to_path_buf()),
        });
        let mut vehicle = TestVehicle::new(0, 20.0);
        let tracker = StaticTracker::with(&[("obj", Position::new(20.0, 0.0))]);
        let mut transport = RecordingTransport::default();
        svc.trigger(&mut Facilities {
            now: 1.0,
            vehicle: Some(&mut vehicle),
            tracker: Some(&tracker),
            transport: &mut transport,
        });

        let csv = std::fs::read_to_string(dir.path().join("collision_sender_veh0.csv")).unwrap();
        assert_eq!(
            csv,
            "Time,VehicleID,Speed,ObjectID,Distance,TTC,SubCauseCode\n\
             1.000,veh0,20.000,obj,20.000,1.000,2\n"
        );
    }
}
