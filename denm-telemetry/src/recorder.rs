//! ## denm-telemetry::recorder
//! **Append-only CSV recorder**
//!
//! Rows are `serde` structs; the header comes from their field names and is
//! written with the first row. Rows are flushed as they are appended so a
//! crashed run still leaves its data. Failing to create the file is fatal
//! to the owning service; failing to append is not.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::error::TelemetryError;

/// Placeholder for columns that do not apply to a row.
pub const NOT_AVAILABLE: &str = "N/A";

pub struct CsvRecorder<R> {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
    _record: PhantomData<R>,
}

impl<R: Serialize> CsvRecorder<R> {
    /// Create `dir` if needed and truncate `dir/file_name`.
    pub fn create(dir: &Path, file_name: &str) -> Result<Self, TelemetryError> {
        let path = dir.join(file_name);
        fs::create_dir_all(dir).map_err(|source| TelemetryError::Open {
            path: path.clone(),
            source,
        })?;
        let writer = csv::Writer::from_path(&path).map_err(|err| TelemetryError::Open {
            path: path.clone(),
            source: io::Error::from(err),
        })?;

        Ok(Self {
            path,
            writer,
            rows: 0,
            _record: PhantomData,
        })
    }

    pub fn record_append(&mut self, record: &R) -> Result<(), TelemetryError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

/// Fixed three-decimal float; non-finite values print as `inf`/`nan`.
pub fn fixed3(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value:.3}")
    }
}

/// `serialize_with` helper printing through [`fixed3`].
pub fn serialize_fixed3<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&fixed3(*value))
}

/// Like [`serialize_fixed3`], `N/A` when absent.
pub fn serialize_fixed3_or_na<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&fixed3(*value)),
        None => serializer.serialize_str(NOT_AVAILABLE),
    }
}

pub fn serialize_display_or_na<T: fmt::Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_str(NOT_AVAILABLE),
    }
}

/// Wall-clock stamp used to keep files of separate runs apart.
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
