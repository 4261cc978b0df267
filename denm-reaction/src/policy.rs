//! ## denm-reaction::policy
//! **Severity-driven actuation state machine**
//!
//! `Nominal -> Warned -> Critical`, back to `Nominal` on the first evaluation
//! tick without a live alert. Magnitudes are family specific:
//!
//! | family      | warning         | critical        |
//! |-------------|-----------------|-----------------|
//! | collision   | x0.7            | stop            |
//! | lane change | x0.7            | stop            |
//! | drowsiness  | x0.8            | x0.5            |
//! | speed       | x0.8 (offender) | x0.5 (offender) |
//!
//! A speed alert about another vehicle never actuates; the receiver only
//! widens its following distance.

use std::fmt;

use tracing::{debug, info};

use denm_config::ReactionConfig;
use denm_core::vehicle::VehicleController;
use denm_protocols::{Alert, AlertPayload, CauseCode, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionState {
    #[default]
    Nominal,
    Warned,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    EmergencyBraking,
    SpeedReduction,
    SpeedReductionLaneChange,
    CriticalSpeedReduction,
    SlightSpeedReduction,
    IncreasedVigilance,
    IncreaseSafetyDistance,
    Ignored,
    Suppressed,
    NoAlert,
}

impl ReactionAction {
    /// Label written to telemetry.
    pub fn label(self) -> &'static str {
        match self {
            ReactionAction::EmergencyBraking => "EmergencyBraking",
            ReactionAction::SpeedReduction => "SpeedReduction",
            ReactionAction::SpeedReductionLaneChange => "SpeedReduction_LaneChange",
            ReactionAction::CriticalSpeedReduction => "CriticalSpeedReduction",
            ReactionAction::SlightSpeedReduction => "SlightSpeedReduction",
            ReactionAction::IncreasedVigilance => "IncreasedVigilance",
            ReactionAction::IncreaseSafetyDistance => "IncreaseSafetyDistance",
            ReactionAction::Ignored => "Ignored",
            ReactionAction::Suppressed => "Suppressed",
            ReactionAction::NoAlert => "NoAlert",
        }
    }

    pub fn actuates(self) -> bool {
        matches!(
            self,
            ReactionAction::EmergencyBraking
                | ReactionAction::SpeedReduction
                | ReactionAction::SpeedReductionLaneChange
                | ReactionAction::CriticalSpeedReduction
                | ReactionAction::SlightSpeedReduction
        )
    }
}

impl fmt::Display for ReactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionOutcome {
    pub action: ReactionAction,
    pub previous_speed: f64,
    pub new_speed: f64,
    pub state: ReactionState,
}

/// What to do with the vehicle's speed.
enum SpeedCommand {
    Stop,
    Scale(f64),
    Hold,
}

pub struct ReactionPolicy {
    config: ReactionConfig,
    state: ReactionState,
}

impl ReactionPolicy {
    pub fn new(config: ReactionConfig) -> Self {
        Self {
            config,
            state: ReactionState::Nominal,
        }
    }

    pub fn state(&self) -> ReactionState {
        self.state
    }

    /// React to an alert that already passed relevance and cooldown.
    pub fn alert_react(
        &mut self,
        alert: &Alert,
        vehicle: &mut dyn VehicleController,
    ) -> ReactionOutcome {
        let previous_speed = vehicle.speed();
        let (action, command) = self.decide(alert, vehicle);

        let new_speed = match command {
            SpeedCommand::Stop => 0.0,
            SpeedCommand::Scale(factor) => previous_speed * factor,
            SpeedCommand::Hold => previous_speed,
        };
        if action.actuates() {
            vehicle.set_speed(new_speed);
            self.state = match alert.severity {
                Severity::Critical => ReactionState::Critical,
                _ => ReactionState::Warned,
            };
            info!(
                station = %vehicle.station_id(),
                cause = alert.cause().family(),
                action = %action,
                previous_speed,
                new_speed,
                "Reaction applied"
            );
        } else {
            debug!(
                station = %vehicle.station_id(),
                cause = alert.cause().family(),
                action = %action,
                "Reaction without actuation"
            );
        }

        ReactionOutcome {
            action,
            previous_speed,
            new_speed,
            state: self.state,
        }
    }

    /// Evaluation tick without a live alert.
    pub fn idle_tick(&mut self) {
        if self.state != ReactionState::Nominal {
            debug!(previous = ?self.state, "Reaction state reset");
        }
        self.state = ReactionState::Nominal;
    }

    fn decide(
        &self,
        alert: &Alert,
        vehicle: &dyn VehicleController,
    ) -> (ReactionAction, SpeedCommand) {
        let cfg = &self.config;
        match (alert.cause(), alert.severity) {
            (CauseCode::Collision, Severity::Critical) => {
                (ReactionAction::EmergencyBraking, SpeedCommand::Stop)
            }
            (CauseCode::Collision, Severity::Warning) => (
                ReactionAction::SpeedReduction,
                SpeedCommand::Scale(cfg.collision_warning_factor),
            ),

            (CauseCode::DangerousLaneChange, Severity::Critical) => {
                (ReactionAction::EmergencyBraking, SpeedCommand::Stop)
            }
            (CauseCode::DangerousLaneChange, Severity::Warning) => {
                let same_lane = matches!(
                    alert.payload,
                    AlertPayload::LaneChange { current_lane, .. } if current_lane == vehicle.lane()
                );
                let action = if same_lane {
                    ReactionAction::SpeedReductionLaneChange
                } else {
                    ReactionAction::SpeedReduction
                };
                (action, SpeedCommand::Scale(cfg.lane_change_warning_factor))
            }
            (CauseCode::DangerousLaneChange, Severity::None) => {
                (ReactionAction::IncreasedVigilance, SpeedCommand::Hold)
            }

            (CauseCode::AnomalousDriving, Severity::Critical) => (
                ReactionAction::CriticalSpeedReduction,
                SpeedCommand::Scale(cfg.drowsiness_critical_factor),
            ),
            (CauseCode::AnomalousDriving, Severity::Warning) => (
                ReactionAction::SlightSpeedReduction,
                SpeedCommand::Scale(cfg.drowsiness_warning_factor),
            ),

            (CauseCode::SpeedViolation, severity) => {
                if alert.offender() != vehicle.station_id() {
                    return (ReactionAction::IncreaseSafetyDistance, SpeedCommand::Hold);
                }
                match severity {
                    Severity::Critical => (
                        ReactionAction::CriticalSpeedReduction,
                        SpeedCommand::Scale(cfg.speed_critical_factor),
                    ),
                    Severity::Warning => (
                        ReactionAction::SpeedReduction,
                        SpeedCommand::Scale(cfg.speed_warning_factor),
                    ),
                    Severity::None => (ReactionAction::Ignored, SpeedCommand::Hold),
                }
            }

            (_, Severity::None) => (ReactionAction::Ignored, SpeedCommand::Hold),
        }
    }
}
