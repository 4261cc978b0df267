//! Roadside relay parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RelayConfig {
    /// Radius of the geo-area a relay rebroadcasts to.
    #[validate(range(min = 1.0))]
    pub transmission_range_m: f64,

    /// Cause codes a relay forwards; empty forwards every DENM.
    #[serde(default)]
    pub causes: Vec<u8>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            transmission_range_m: 1000.0,
            causes: Vec::new(),
        }
    }
}
