//! Observability configuration.
//!
//! - Tracing level
//! - CSV telemetry output
//! - Metrics collection

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(custom(function = validation::validate_log_level))]
    pub log_level: String,

    /// Directory CSV files are written to; created on demand.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write per-tick and per-alert CSV rows.
    #[serde(default)]
    pub csv_enabled: bool,

    /// Register prometheus metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            csv_enabled: false,
            metrics_enabled: default_true(),
        }
    }
}

/// Identity map persistence.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct IdentityConfig {
    /// File of `"<mobility id> <station id>"` lines; in-memory when unset.
    #[serde(default)]
    pub store: Option<PathBuf>,
}
