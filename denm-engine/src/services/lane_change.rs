//! Lane-change warning.
//!
//! The manoeuvre is announced `lane_change_delay_s` after the first tick,
//! towards the next lane up. From then on every tick scores all tracked
//! objects and announces the riskiest one if it clears `risk_threshold`.

use tracing::{debug, info, instrument};

use denm_config::{EstimatorConfig, LaneChangeConfig};
use denm_detection::severity::lane_change_severity;
use denm_detection::RiskEstimator;
use denm_protocols::{Alert, AlertPayload};
use denm_telemetry::CsvRecorder;

use super::{row_append, AlertEmitter, AlertService, HostSnapshot};
use crate::context::{DegradedLatch, Facilities, TelemetrySinks};
use crate::error::ServiceError;
use crate::records::{LaneChangeSenderRow, SenderRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneChangePlan {
    pub current_lane: u8,
    pub target_lane: u8,
}

pub struct LaneChangeWarningService {
    estimator: RiskEstimator,
    config: LaneChangeConfig,
    emitter: AlertEmitter,
    sender_csv: Option<CsvRecorder<LaneChangeSenderRow>>,
    started_at: Option<f64>,
    plan: Option<LaneChangePlan>,
    degraded: DegradedLatch,
}

impl LaneChangeWarningService {
    pub fn new(
        estimator: EstimatorConfig,
        config: LaneChangeConfig,
        telemetry: TelemetrySinks,
        vehicle_id: &str,
    ) -> Result<Self, ServiceError> {
        let emitter = AlertEmitter::new(telemetry);
        let sender_csv = emitter.recorder(&format!("lane_change_sender_{vehicle_id}.csv"))?;
        Ok(Self {
            estimator: RiskEstimator::new(estimator),
            config,
            emitter,
            sender_csv,
            started_at: None,
            plan: None,
            degraded: DegradedLatch::default(),
        })
    }

    /// Lane change in progress, once initiated.
    pub fn plan(&self) -> Option<LaneChangePlan> {
        self.plan
    }
}

impl AlertService for LaneChangeWarningService {
    fn name(&self) -> &'static str {
        "lane_change_warning"
    }

    #[instrument(level = "debug", skip_all, fields(now = ctx.now))]
    fn trigger(&mut self, ctx: &mut Facilities<'_>) -> Vec<Alert> {
        let Some(host) = ctx.vehicle.as_deref().map(HostSnapshot::capture) else {
            self.degraded.report(self.name(), "vehicle");
            return Vec::new();
        };

        let started_at = *self.started_at.get_or_insert(ctx.now);
        if ctx.now - started_at < self.config.lane_change_delay_s {
            return Vec::new();
        }
        let plan = *self.plan.get_or_insert_with(|| {
            let plan = LaneChangePlan {
                current_lane: host.lane,
                target_lane: host.lane.saturating_add(1),
            };
            info!(
                vehicle = %host.mobility_id,
                from = plan.current_lane,
                to = plan.target_lane,
                "Lane change initiated"
            );
            plan
        });

        let Some(tracker) = ctx.tracker else {
            self.degraded.report(self.name(), "tracker");
            return Vec::new();
        };

        let kinematics = host.kinematics();
        let mut max_risk: Option<f64> = None;
        for object in tracker.objects() {
            let estimate = self
                .estimator
                .time_to_collision(ctx.now, &kinematics, &object, tracker);
            if !estimate.is_resolved() {
                continue;
            }
            let risk = self.estimator.composite_risk(&estimate, &self.config);
            row_append(
                &mut self.sender_csv,
                &LaneChangeSenderRow::from(SenderRecord {
                    time: ctx.now,
                    vehicle_id: host.mobility_id.clone(),
                    speed: host.speed,
                    object_id: object.id.clone(),
                    distance: estimate.distance,
                    metric: risk,
                    sub_cause: lane_change_severity(risk, &self.config).as_u8(),
                }),
            );
            max_risk = Some(max_risk.map_or(risk, |max| max.max(risk)));
        }

        let Some(risk) = max_risk.filter(|risk| *risk > self.config.risk_threshold) else {
            debug!(risk = max_risk, "Lane change clear");
            return Vec::new();
        };

        let alert = host.alert(
            ctx.now,
            lane_change_severity(risk, &self.config),
            AlertPayload::LaneChange {
                current_lane: plan.current_lane,
                target_lane: plan.target_lane,
                risk_score: risk,
                // Not observable from the tracker feed.
                lateral_speed: 0.0,
                is_emergency_vehicle: host.is_emergency,
            },
        );
        self.emitter
            .emit(host.origin(), &host.mobility_id, &alert, ctx.transport);
        vec![alert]
    }
}
