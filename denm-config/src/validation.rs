//! Custom validation functions for configuration.

use validator::ValidationError;

use crate::detection::SpeedZone;

/// Zone breakpoints must be strictly descending so the first match wins.
pub fn validate_speed_zones(zones: &[SpeedZone]) -> Result<(), ValidationError> {
    let descending = zones
        .windows(2)
        .all(|pair| pair[0].min_distance_m > pair[1].min_distance_m);
    let positive = zones.iter().all(|z| z.limit_kmh > 0.0 && z.min_distance_m >= 0.0);
    if descending && positive {
        Ok(())
    } else {
        Err(ValidationError::new("speed_zones_not_descending"))
    }
}

/// Validate tracing level names.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"].contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Ensure a severity pair where larger values are more severe is ordered.
pub(crate) fn check_ascending(name: &str, warning: f64, critical: f64) -> Result<(), String> {
    if warning < critical {
        Ok(())
    } else {
        Err(format!(
            "{name}: warning ({warning}) must be below critical ({critical})"
        ))
    }
}

/// Ensure a severity pair where smaller values are more severe is ordered.
pub(crate) fn check_descending(name: &str, warning: f64, critical: f64) -> Result<(), String> {
    if critical < warning {
        Ok(())
    } else {
        Err(format!(
            "{name}: critical ({critical}) must be below warning ({warning})"
        ))
    }
}
