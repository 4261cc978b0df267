use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Cannot open telemetry file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("CSV row rejected: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tracing subscriber setup failed: {0}")]
    Subscriber(String),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}
