//! # DENM Configuration System
//!
//! Hierarchical configuration for every alert family, receiver, relay and
//! the simulation harness.
//!
//! ## Features
//! - **Unified Configuration**: one tree shared by detection, reaction and telemetry
//! - **Validation**: field ranges through `validator`, threshold ordering checked after load
//! - **Environment Awareness**: `DENM_ENV` selects an override file, `DENM_*` variables win

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod detection;
mod error;
mod receiver;
mod relay;
mod simulator;
mod telemetry;
mod validation;

pub use detection::{
    CollisionConfig, DetectionConfig, DrowsinessConfig, EstimatorConfig, LaneChangeConfig,
    RiskWeights, SpeedConfig, SpeedZone, TtcThresholds,
};
pub use error::ConfigError;
pub use receiver::{ReactionConfig, ReceiverConfig, RelevanceConfig};
pub use relay::RelayConfig;
pub use simulator::{NetworkModelConfig, SimulatorConfig};
pub use telemetry::{IdentityConfig, TelemetryConfig};

const BASE_FILE: &str = "config/denm.yaml";
const ENV_PREFIX: &str = "DENM_";

/// Top‑level configuration container for all DENM components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct DenmConfig {
    /// Risk estimation and per-family severity parameters.
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Relevance radii and cooldowns.
    #[validate(nested)]
    pub receiver: ReceiverConfig,

    /// Speed factors applied by the reaction policy.
    #[validate(nested)]
    pub reaction: ReactionConfig,

    /// Roadside relay parameters.
    #[validate(nested)]
    pub relay: RelayConfig,

    /// Logging, CSV and metrics output.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// Identity map persistence.
    #[validate(nested)]
    pub identity: IdentityConfig,

    /// Discrete-event harness parameters.
    #[validate(nested)]
    pub simulator: SimulatorConfig,
}

impl DenmConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/denm.yaml` - base settings, skipped when missing.
    /// 3. `config/<DENM_ENV>.yaml` - environment‑specific overrides.
    /// 4. `DENM_*` environment variables, nested with `__`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(DenmConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("DENM_ENV").unwrap_or_else(|_| "simulation".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific path on top of the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Self::finish(
            Figment::from(Serialized::defaults(DenmConfig::default())).merge(Yaml::file(path)),
        )
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                config.check_consistency()?;
                Ok(config)
            })
    }

    /// Cross-field checks `validator` cannot express per field.
    pub fn check_consistency(&self) -> Result<(), ConfigError> {
        self.detection
            .check_consistency()
            .map_err(ConfigError::Inconsistent)
    }
}
