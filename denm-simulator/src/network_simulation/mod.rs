//! ## denm-simulator::network_simulation
//! **Link conditions applied to every radio delivery**
//!
//! ### Key Submodules:
//! - `latency`: fixed propagation delay
//! - `jitter`: seeded uniform jitter
//! - `packet_loss`: seeded probabilistic loss
//!
//! ### Future:
//! - Distance-dependent loss

pub mod jitter;
pub mod latency;
pub mod packet_loss;

use std::time::Duration;

use denm_config::NetworkModelConfig;

use crate::ScenarioError;
use jitter::{JitterModel, NoJitterModel, RandomJitterModel};
use latency::{FixedLatencyModel, LatencyModel, NoLatencyModel};
use packet_loss::{NoPacketLossModel, PacketLossModel, ProbabilisticLossModel};

/// Latency, jitter and loss of the shared radio channel.
pub struct LinkModel {
    latency: Box<dyn LatencyModel>,
    jitter: Box<dyn JitterModel>,
    loss: Box<dyn PacketLossModel>,
}

impl LinkModel {
    pub fn new(
        latency: Box<dyn LatencyModel>,
        jitter: Box<dyn JitterModel>,
        loss: Box<dyn PacketLossModel>,
    ) -> Self {
        Self {
            latency,
            jitter,
            loss,
        }
    }

    /// Lossless link delivering in the next tick.
    pub fn ideal() -> Self {
        Self::new(
            Box::new(NoLatencyModel),
            Box::new(NoJitterModel),
            Box::new(NoPacketLossModel),
        )
    }

    /// Models for `config`. Jitter and loss draw from independent streams
    /// derived from `seed`.
    pub fn from_config(config: &NetworkModelConfig, seed: u64) -> Result<Self, ScenarioError> {
        let latency: Box<dyn LatencyModel> = match config.latency_ms {
            0 => Box::new(NoLatencyModel),
            ms => Box::new(FixedLatencyModel::new(ms)),
        };
        let jitter: Box<dyn JitterModel> = match config.jitter_ms {
            0 => Box::new(NoJitterModel),
            ms => Box::new(RandomJitterModel::new(ms, seed)),
        };
        let loss: Box<dyn PacketLossModel> = if config.packet_loss > 0.0 {
            Box::new(ProbabilisticLossModel::new(
                config.packet_loss,
                seed.rotate_left(32) ^ 0x5eed,
            )?)
        } else {
            Box::new(NoPacketLossModel)
        };
        Ok(Self::new(latency, jitter, loss))
    }

    /// Delay of one delivery, or `None` when it is lost.
    pub fn delivery_delay(&mut self) -> Option<Duration> {
        if self.loss.should_drop() {
            return None;
        }
        let delay = self.latency.apply_latency(Duration::ZERO);
        Some(self.jitter.apply_jitter(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_link_delivers_immediately() {
        let mut link = LinkModel::ideal();
        assert_eq!(link.delivery_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn configured_link_combines_models() {
        let config = NetworkModelConfig {
            latency_ms: 20,
            jitter_ms: 5,
            ..NetworkModelConfig::default()
        };
        let mut link = LinkModel::from_config(&config, 9).unwrap();
        for _ in 0..100 {
            let delay = link.delivery_delay().unwrap();
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(25));
        }
    }

    #[test]
    fn total_loss_delivers_nothing() {
        let config = NetworkModelConfig {
            packet_loss: 1.0,
            ..NetworkModelConfig::default()
        };
        let mut link = LinkModel::from_config(&config, 9).unwrap();
        assert!((0..50).all(|_| link.delivery_delay().is_none()));
    }
}
