//! Per-delivery loss. Each receiver of a broadcast draws independently.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ScenarioError;

pub trait PacketLossModel: Send {
    fn should_drop(&mut self) -> bool;
}

#[derive(Debug)]
pub struct ProbabilisticLossModel {
    drop_probability: f64,
    rng: SmallRng,
}

impl ProbabilisticLossModel {
    /// Fails unless `drop_probability` lies in `[0, 1]`.
    pub fn new(drop_probability: f64, seed: u64) -> Result<Self, ScenarioError> {
        if !(0.0..=1.0).contains(&drop_probability) {
            return Err(ScenarioError::Invalid(format!(
                "packet loss {drop_probability} outside [0, 1]"
            )));
        }
        Ok(Self {
            drop_probability,
            rng: SmallRng::seed_from_u64(seed),
        })
    }
}

impl PacketLossModel for ProbabilisticLossModel {
    #[inline]
    fn should_drop(&mut self) -> bool {
        self.rng.random_bool(self.drop_probability)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoPacketLossModel;

impl PacketLossModel for NoPacketLossModel {
    #[inline]
    fn should_drop(&mut self) -> bool {
        false
    }
}
