use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("State digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
