//! Outcome of one simulation run.

use std::collections::BTreeMap;
use std::fmt;

use denm_core::station::StationId;
use denm_protocols::Alert;
use denm_reaction::ReactionAction;
use denm_telemetry::fixed3;

use crate::radio::RadioStats;

#[derive(Debug, Clone, PartialEq)]
pub struct SentAlert {
    pub time: f64,
    pub sender: String,
    pub alert: Alert,
}

/// An alert that passed relevance and cooldown at a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRecord {
    pub time: f64,
    pub vehicle: String,
    pub family: &'static str,
    pub sender: StationId,
    pub action: ReactionAction,
    pub previous_speed: f64,
    pub new_speed: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub scenario: String,
    pub seed: u64,
    pub ticks: u64,
    pub sent: Vec<SentAlert>,
    pub reactions: Vec<ReactionRecord>,
    /// Receiver outcomes by action label, `Dropped` for non-DENM frames.
    pub outcomes: BTreeMap<&'static str, u64>,
    pub relayed: u64,
    pub radio: RadioStats,
    pub final_speeds: BTreeMap<String, f64>,
    /// BLAKE3 over every delivery decision and vehicle state, hex encoded.
    pub digest: String,
}

impl SimulationReport {
    pub fn sent_by_family(&self) -> BTreeMap<&'static str, u64> {
        let mut counts = BTreeMap::new();
        for sent in &self.sent {
            *counts.entry(sent.alert.cause().family()).or_default() += 1;
        }
        counts
    }

    pub fn reactions_of<'a>(&'a self, vehicle: &'a str) -> impl Iterator<Item = &'a ReactionRecord> {
        self.reactions.iter().filter(move |r| r.vehicle == vehicle)
    }

    pub fn outcome_count(&self, action: ReactionAction) -> u64 {
        self.outcomes.get(action.label()).copied().unwrap_or_default()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "scenario {} (seed {}, {} ticks)",
            self.scenario, self.seed, self.ticks
        )?;
        writeln!(f, "alerts sent:")?;
        for (family, count) in self.sent_by_family() {
            writeln!(f, "  {family:<12} {count}")?;
        }
        writeln!(
            f,
            "radio: {} transmitted, {} delivered, {} lost, {} overflow, {} relayed",
            self.radio.transmitted,
            self.radio.delivered,
            self.radio.lost,
            self.radio.overflow,
            self.relayed
        )?;
        writeln!(f, "receiver outcomes:")?;
        for (label, count) in &self.outcomes {
            writeln!(f, "  {label:<26} {count}")?;
        }
        writeln!(f, "reactions:")?;
        for r in &self.reactions {
            writeln!(
                f,
                "  {} {} {} from {}: {} ({} -> {})",
                fixed3(r.time),
                r.vehicle,
                r.family,
                r.sender,
                r.action,
                fixed3(r.previous_speed),
                fixed3(r.new_speed)
            )?;
        }
        writeln!(f, "final speeds:")?;
        for (vehicle, speed) in &self.final_speeds {
            writeln!(f, "  {vehicle:<12} {}", fixed3(*speed))?;
        }
        write!(f, "digest {}", self.digest)
    }
}
