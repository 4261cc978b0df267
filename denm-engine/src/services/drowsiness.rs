//! Driver drowsiness detection.

use tracing::{debug, instrument};

use denm_config::DrowsinessConfig;
use denm_detection::{DrowsinessMonitor, DrowsinessReading};
use denm_protocols::{Alert, AlertPayload, Severity};

use super::{AlertEmitter, AlertService, HostSnapshot};
use crate::context::{DegradedLatch, Facilities, TelemetrySinks};

pub struct DrowsinessDetectionService {
    monitor: DrowsinessMonitor,
    emitter: AlertEmitter,
    last_reading: Option<DrowsinessReading>,
    degraded: DegradedLatch,
}

impl DrowsinessDetectionService {
    /// `seed` drives the level noise; the model starts at sim time zero.
    pub fn new(config: DrowsinessConfig, seed: u64, telemetry: TelemetrySinks) -> Self {
        Self {
            monitor: DrowsinessMonitor::new(config, seed, 0.0),
            emitter: AlertEmitter::new(telemetry),
            last_reading: None,
            degraded: DegradedLatch::default(),
        }
    }

    pub fn last_reading(&self) -> Option<DrowsinessReading> {
        self.last_reading
    }
}

impl AlertService for DrowsinessDetectionService {
    fn name(&self) -> &'static str {
        "drowsiness_detection"
    }

    #[instrument(level = "debug", skip_all, fields(now = ctx.now))]
    fn trigger(&mut self, ctx: &mut Facilities<'_>) -> Vec<Alert> {
        let Some(host) = ctx.vehicle.as_deref().map(HostSnapshot::capture) else {
            self.degraded.report(self.name(), "vehicle");
            return Vec::new();
        };

        let reading = self.monitor.level_update(ctx.now);
        self.last_reading = Some(reading);
        debug!(
            level = reading.level,
            reaction_time = reading.reaction_time,
            "Drowsiness level updated"
        );
        if reading.severity == Severity::None {
            return Vec::new();
        }

        let alert = host.alert(
            ctx.now,
            reading.severity,
            AlertPayload::Drowsiness {
                drowsiness_level: reading.level,
                reaction_time: reading.reaction_time,
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
    use denm_protocols::{CauseCode, DenmParser};

    use crate::services::testing::{RecordingTransport, TestVehicle};

    fn quiet_config() -> DrowsinessConfig {
        DrowsinessConfig {
            noise_max: 0.0,
            ..DrowsinessConfig::default()
        }
    }

    fn tick(
        svc: &mut DrowsinessDetectionService,
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
    fn alert_levels_follow_driving_time() {
        let mut svc = DrowsinessDetectionService::new(quiet_config(), 7, TelemetrySinks::disabled());
        let mut vehicle = TestVehicle::new(3, 25.0);
        let mut transport = RecordingTransport::default();

        assert!(tick(&mut svc, 30.0, &mut vehicle, &mut transport).is_empty());

        let warning = tick(&mut svc, 70.0, &mut vehicle, &mut transport);
        assert_eq!(warning[0].severity, Severity::Warning);
        assert_eq!(warning[0].cause(), CauseCode::AnomalousDriving);

        let critical = tick(&mut svc, 90.0, &mut vehicle, &mut transport);
        assert_eq!(critical[0].severity, Severity::Critical);
        match critical[0].payload {
            AlertPayload::Drowsiness {
                drowsiness_level,
                reaction_time,
            } => {
                assert!((drowsiness_level - 0.9).abs() < 1e-9);
                assert!((reaction_time - 2.3).abs() < 1e-9);
            }
            ref other => panic!("unexpected payload {other:?}"),
        }

        let (_, _, frame) = &transport.sent[1];
        assert_eq!(DenmParser::new().parse(frame).unwrap(), critical[0]);
    }

    #[test]
    fn same_seed_same_levels() {
        let run = |seed| {
            let mut svc =
                DrowsinessDetectionService::new(DrowsinessConfig::default(), seed, TelemetrySinks::disabled());
            let mut vehicle = TestVehicle::new(3, 25.0);
            let mut transport = RecordingTransport::default();
            (1..=20)
                .map(|step| {
                    tick(&mut svc, f64::from(step), &mut vehicle, &mut transport);
                    svc.last_reading().map(|r| r.level).unwrap_or_default()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }
}
