use thiserror::Error;

/// Failures of the station identity registry.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid mobility id {0:?}: must be non-empty without whitespace")]
    InvalidMobilityId(String),

    #[error("Identity store I/O error: {0}")]
    Store(#[from] std::io::Error),
}
