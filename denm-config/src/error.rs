use std::fmt::Write;
use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// A field is outside its allowed range.
    #[error("Invalid configuration:\n{}", field_report(.0))]
    Validation(#[from] ValidationErrors),

    /// Fields are valid alone but contradict each other, such as TTC
    /// thresholds out of order.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),
}

/// One line per offending field, `detection.collision.ttc: range`.
fn field_report(errors: &ValidationErrors) -> String {
    let mut out = String::new();
    collect(errors, "", &mut out);
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut String) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_deref()
                        .unwrap_or(&*error.code);
                    let _ = writeln!(out, "  {path}: {message}");
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            validator::ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
