//! ## denm-engine::receiver
//! **Alert receiver: decode, gate, react, record**
//!
//! One instance per vehicle and alert family. Two entry points, never
//! overlapping for the same instance: `indicate` for each inbound payload
//! and `trigger` on the periodic tick.
//!
//! Gate order for a decoded alert:
//! 1. cause code must match the family, otherwise `Ignored`
//! 2. cooldown per offender, otherwise `Suppressed` regardless of distance
//! 3. distance strictly below the family radius, otherwise `Ignored`
//!
//! Speed alerts about another vehicle use the tighter bystander radius.

use bytes::Bytes;
use opentelemetry::KeyValue;
use tracing::{debug, info, instrument, warn};

use denm_config::{ReactionConfig, ReceiverConfig, RelevanceConfig};
use denm_core::vehicle::VehicleController;
use denm_protocols::{Alert, CauseCode, DataIndication, DenmParser};
use denm_reaction::{ReactionAction, ReactionOutcome, ReactionPolicy, ReactionState};
use denm_telemetry::EventLogger;

use crate::context::TelemetrySinks;
use crate::error::ServiceError;
use crate::records::{receiver_sink_create, ReceiverRecord, ReceiverSink};
use crate::relevance::{CooldownTracker, Relevance, RelevanceFilter};

/// What happened to one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// Not a DENM frame.
    Dropped,
    Ignored { distance: Option<f64> },
    Suppressed,
    Reacted(ReactionOutcome),
}

impl ReceiveOutcome {
    pub fn action(&self) -> Option<ReactionAction> {
        match self {
            ReceiveOutcome::Dropped => None,
            ReceiveOutcome::Ignored { .. } => Some(ReactionAction::Ignored),
            ReceiveOutcome::Suppressed => Some(ReactionAction::Suppressed),
            ReceiveOutcome::Reacted(outcome) => Some(outcome.action),
        }
    }
}

pub struct AlertReceiverService {
    vehicle_id: String,
    filter: RelevanceFilter,
    bystander_radius_m: Option<f64>,
    cooldown: CooldownTracker,
    policy: ReactionPolicy,
    parser: DenmParser,
    retained: Option<Alert>,
    sink: Option<Box<dyn ReceiverSink>>,
    telemetry: TelemetrySinks,
}

impl AlertReceiverService {
    /// Build the receiver for `cause`. Failing to open its CSV is fatal.
    pub fn new(
        cause: CauseCode,
        receiver: &ReceiverConfig,
        reaction: ReactionConfig,
        telemetry: TelemetrySinks,
        vehicle_id: &str,
    ) -> Result<Self, ServiceError> {
        let relevance = relevance_for(cause, receiver);
        let bystander_radius_m =
            (cause == CauseCode::SpeedViolation).then_some(receiver.speed_bystander_radius_m);

        let sink = match &telemetry.csv_dir {
            Some(dir) => Some(receiver_sink_create(cause, dir, vehicle_id)?),
            None => None,
        };
        if let Some(sink) = &sink {
            debug!(vehicle = vehicle_id, path = %sink.path().display(), "Receiver CSV opened");
        }

        Ok(Self {
            vehicle_id: vehicle_id.to_string(),
            filter: RelevanceFilter::new(cause, relevance.radius_m),
            bystander_radius_m,
            cooldown: CooldownTracker::from(relevance),
            policy: ReactionPolicy::new(reaction),
            parser: DenmParser::new(),
            retained: None,
            sink,
            telemetry,
        })
    }

    pub fn cause(&self) -> CauseCode {
        self.filter.expected()
    }

    pub fn state(&self) -> ReactionState {
        self.policy.state()
    }

    /// Alert accepted since the last tick, if any.
    pub fn retained(&self) -> Option<&Alert> {
        self.retained.as_ref()
    }

    #[instrument(level = "debug", skip_all, fields(vehicle = %self.vehicle_id, source = %indication.source_station))]
    pub fn indicate(
        &mut self,
        now: f64,
        indication: &DataIndication,
        payload: &Bytes,
        vehicle: &mut dyn VehicleController,
    ) -> ReceiveOutcome {
        let alert = match self.parser.parse(payload) {
            Ok(alert) => alert,
            Err(err) => {
                debug!(error = %err, bytes = payload.len(), "Dropping non-DENM payload");
                return ReceiveOutcome::Dropped;
            }
        };
        let family = alert.cause().family();
        self.telemetry.with_metrics(|m| m.inc_received(family));

        if !self.filter.cause_matches(&alert) {
            return self.ignore(now, vehicle, alert, None);
        }

        let offender = alert.offender();
        if !self.cooldown.admit(offender, now) {
            debug!(offender = %offender, "Alert suppressed by cooldown");
            self.telemetry.with_metrics(|m| m.inc_suppressed(family));
            self.row_write(now, vehicle, Some(alert), None, ReactionAction::Suppressed);
            return ReceiveOutcome::Suppressed;
        }

        let own_position = vehicle.position();
        let relevance = match self.bystander_radius_m {
            Some(radius) if offender != vehicle.station_id() => {
                self.filter.assess_within(&alert, &own_position, radius)
            }
            _ => self.filter.assess(&alert, &own_position),
        };
        let Relevance::Relevant { distance } = relevance else {
            return self.ignore(now, vehicle, alert, relevance.distance());
        };

        self.cooldown.accept(offender, now);
        let outcome = self.policy.alert_react(&alert, vehicle);
        self.telemetry
            .with_metrics(|m| m.inc_reaction(family, outcome.action.label()));
        EventLogger::log_event(
            "reaction_taken",
            vec![
                KeyValue::new("family", family),
                KeyValue::new("receiver", self.vehicle_id.clone()),
                KeyValue::new("sender", i64::from(alert.station_id.raw())),
                KeyValue::new("action", outcome.action.label()),
                KeyValue::new("distance", distance),
            ],
        );

        self.row_write(now, vehicle, Some(alert.clone()), Some(distance), outcome.action);
        self.retained = Some(alert);
        ReceiveOutcome::Reacted(outcome)
    }

    /// Periodic tick. Writes a `NoAlert` row unless an alert arrived since
    /// the previous tick; that retention is cleared either way.
    pub fn trigger(&mut self, now: f64, vehicle: &mut dyn VehicleController) {
        if self.retained.take().is_some() {
            return;
        }
        self.policy.idle_tick();
        self.row_write(now, vehicle, None, None, ReactionAction::NoAlert);
    }

    fn ignore(
        &mut self,
        now: f64,
        vehicle: &mut dyn VehicleController,
        alert: Alert,
        distance: Option<f64>,
    ) -> ReceiveOutcome {
        debug!(
            cause = alert.cause().as_u8(),
            expected = self.filter.expected().as_u8(),
            distance,
            "Alert not relevant"
        );
        let family = alert.cause().family();
        self.telemetry.with_metrics(|m| m.inc_ignored(family));
        self.row_write(now, vehicle, Some(alert), distance, ReactionAction::Ignored);
        ReceiveOutcome::Ignored { distance }
    }

    fn row_write(
        &mut self,
        now: f64,
        vehicle: &dyn VehicleController,
        alert: Option<Alert>,
        distance: Option<f64>,
        action: ReactionAction,
    ) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let record = ReceiverRecord {
            time: now,
            vehicle_id: self.vehicle_id.clone(),
            speed: vehicle.speed(),
            alert,
            distance,
            action,
        };
        if let Err(err) = sink.row_write(record) {
            warn!(vehicle = %self.vehicle_id, error = %err, "Receiver row not written");
        }
    }
}

fn relevance_for(cause: CauseCode, receiver: &ReceiverConfig) -> &RelevanceConfig {
    match cause {
        CauseCode::Collision => &receiver.collision,
        CauseCode::AnomalousDriving => &receiver.drowsiness,
        CauseCode::DangerousLaneChange => &receiver.lane_change,
        CauseCode::SpeedViolation => &receiver.speed,
    }
}

impl Drop for AlertReceiverService {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            info!(vehicle = %self.vehicle_id, path = %sink.path().display(), "Receiver CSV closed");
        }
    }
}
