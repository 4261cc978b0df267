use std::path::PathBuf;

use thiserror::Error;

use denm_core::IdentityError;
use denm_engine::ServiceError;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Scenario file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error("Unknown alert family: {0}")]
    UnknownFamily(String),

    #[error("Service setup failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Identity registry error: {0}")]
    Identity(#[from] IdentityError),
}
