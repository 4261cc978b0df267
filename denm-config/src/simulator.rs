//! Discrete-event harness defaults; scenario files override them.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Seed for deterministic simulation.
    pub seed: u64,

    /// Length of one discrete step.
    #[validate(range(min = 0.001, max = 10.0))]
    pub tick_s: f64,

    /// Default number of ticks to run.
    #[validate(range(min = 1))]
    pub ticks: u64,

    /// Capacity of the in-flight transmission queue.
    #[validate(range(min = 16, max = 1048576))]
    pub event_bus_capacity: usize,

    /// Range of the ground-truth perception stand-in.
    #[validate(range(min = 1.0))]
    pub sensor_range_m: f64,

    /// Network emulation parameters.
    #[validate(nested)]
    pub network: NetworkModelConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_s: 0.1,
            ticks: 200,
            event_bus_capacity: 4096,
            sensor_range_m: 150.0,
            network: NetworkModelConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct NetworkModelConfig {
    /// Fixed latency in milliseconds.
    pub latency_ms: u64,

    /// Maximum jitter in milliseconds.
    pub jitter_ms: u64,

    /// Probability a single delivery is dropped (0.0 to 1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    pub packet_loss: f64,

    /// Single-hop radio range.
    #[validate(range(min = 1.0))]
    pub radio_range_m: f64,
}

impl Default for NetworkModelConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            jitter_ms: 0,
            packet_loss: 0.0,
            radio_range_m: 500.0,
        }
    }
}
