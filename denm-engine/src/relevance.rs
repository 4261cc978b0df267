//! ## denm-engine::relevance
//! **Receiver-side relevance gate and per-offender cooldown**
//!
//! Distances are flat Euclidean on the local x/y plane. The radius bound
//! is exclusive: an alert exactly at the radius is not relevant.

use std::collections::HashMap;

use denm_config::RelevanceConfig;
use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_protocols::{Alert, CauseCode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relevance {
    Relevant { distance: f64 },
    WrongCause,
    OutOfRange { distance: f64 },
}

impl Relevance {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Relevance::Relevant { .. })
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            Relevance::Relevant { distance } | Relevance::OutOfRange { distance } => {
                Some(*distance)
            }
            Relevance::WrongCause => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    expected: CauseCode,
    radius_m: f64,
}

impl RelevanceFilter {
    pub fn new(expected: CauseCode, radius_m: f64) -> Self {
        Self { expected, radius_m }
    }

    pub fn expected(&self) -> CauseCode {
        self.expected
    }

    pub fn cause_matches(&self, alert: &Alert) -> bool {
        alert.cause() == self.expected
    }

    pub fn assess(&self, alert: &Alert, own_position: &Position) -> Relevance {
        self.assess_within(alert, own_position, self.radius_m)
    }

    /// Same gate with a narrower radius, used for third-party speed alerts.
    pub fn assess_within(&self, alert: &Alert, own_position: &Position, radius_m: f64) -> Relevance {
        if !self.cause_matches(alert) {
            return Relevance::WrongCause;
        }
        let distance = own_position.distance_to(&alert.event_position);
        if distance < radius_m.min(self.radius_m) {
            Relevance::Relevant { distance }
        } else {
            Relevance::OutOfRange { distance }
        }
    }
}

/// Last accepted alert time per offender.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    window_s: f64,
    last_accepted: HashMap<StationId, f64>,
}

impl CooldownTracker {
    pub fn new(window_s: f64) -> Self {
        Self {
            window_s,
            last_accepted: HashMap::new(),
        }
    }

    /// Whether an alert about `offender` at `now` may be accepted.
    pub fn admit(&self, offender: StationId, now: f64) -> bool {
        self.last_accepted
            .get(&offender)
            .map_or(true, |last| now - last >= self.window_s)
    }

    pub fn accept(&mut self, offender: StationId, now: f64) {
        self.last_accepted.insert(offender, now);
    }

    pub fn last_accepted(&self, offender: StationId) -> Option<f64> {
        self.last_accepted.get(&offender).copied()
    }
}

impl From<&RelevanceConfig> for CooldownTracker {
    fn from(config: &RelevanceConfig) -> Self {
        Self::new(config.cooldown_s)
    }
}
