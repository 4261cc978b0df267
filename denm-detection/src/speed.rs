//! ## denm-detection::speed
//! **Speed-violation detection from an external speed log**
//!
//! Log lines have the form `timestamp,vehicleId,speed,heading,longitude,latitude`
//! with speed in m/s and coordinates in degrees. Lines that do not parse
//! are skipped; the rest of the log is still processed.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use denm_config::SpeedConfig;
use denm_core::geo::{GeoPosition, Position};
use denm_protocols::Severity;

use crate::severity::{speed_excess_pct, speed_limit_kmh, speed_severity};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeedLogError {
    #[error("Empty line")]
    Empty,
    #[error("Malformed line: {0}")]
    Malformed(String),
    #[error("Missing vehicle id")]
    MissingVehicle,
    #[error("Non-finite value in field '{0}'")]
    NonFinite(&'static str),
}

impl From<csv::Error> for SpeedLogError {
    fn from(err: csv::Error) -> Self {
        SpeedLogError::Malformed(err.to_string())
    }
}

/// One log line as written, matched by position.
#[derive(Debug, Deserialize)]
struct SpeedLogLine {
    timestamp: f64,
    vehicle_id: String,
    speed: f64,
    heading: f64,
    longitude: f64,
    latitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedLogEntry {
    pub timestamp: f64,
    pub vehicle_id: String,
    pub speed: f64,
    pub heading: f64,
    pub position: Position,
}

impl SpeedLogEntry {
    pub fn parse_line(line: &str) -> Result<Self, SpeedLogError> {
        let raw = log_reader(line)
            .deserialize::<SpeedLogLine>()
            .next()
            .ok_or(SpeedLogError::Empty)??;
        Self::try_from(raw)
    }
}

impl TryFrom<SpeedLogLine> for SpeedLogEntry {
    type Error = SpeedLogError;

    fn try_from(raw: SpeedLogLine) -> Result<Self, Self::Error> {
        if raw.vehicle_id.is_empty() {
            return Err(SpeedLogError::MissingVehicle);
        }
        let fields = [
            ("timestamp", raw.timestamp),
            ("speed", raw.speed),
            ("heading", raw.heading),
            ("longitude", raw.longitude),
            ("latitude", raw.latitude),
        ];
        if let Some((name, _)) = fields.into_iter().find(|(_, value)| !value.is_finite()) {
            return Err(SpeedLogError::NonFinite(name));
        }

        let geo = GeoPosition {
            latitude: raw.latitude,
            longitude: raw.longitude,
        };
        Ok(Self {
            timestamp: raw.timestamp,
            vehicle_id: raw.vehicle_id,
            speed: raw.speed,
            heading: raw.heading,
            position: geo.to_flat(),
        })
    }
}

/// Headerless reader; records may have any length so one bad line does not
/// poison the rest.
fn log_reader(contents: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes())
}

/// Parse every well-formed line of a log, skipping the rest.
pub fn parse_speed_log(contents: &str) -> Vec<SpeedLogEntry> {
    log_reader(contents)
        .deserialize::<SpeedLogLine>()
        .filter_map(|result| {
            match result
                .map_err(SpeedLogError::from)
                .and_then(SpeedLogEntry::try_from)
            {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "Skipping speed log line");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedAssessment {
    pub limit_kmh: f64,
    pub excess_pct: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpeedRecord {
    speed: f64,
    seen_at: f64,
}

/// Latest observed speed per vehicle with time-based expiry.
pub struct SpeedMonitor {
    config: SpeedConfig,
    records: HashMap<String, SpeedRecord>,
}

impl SpeedMonitor {
    pub fn new(config: SpeedConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    /// Record the observation and classify it against the zone limit.
    pub fn entry_assess(&mut self, entry: &SpeedLogEntry, now: f64) -> SpeedAssessment {
        self.records.insert(
            entry.vehicle_id.clone(),
            SpeedRecord {
                speed: entry.speed,
                seen_at: now,
            },
        );

        let limit_kmh = speed_limit_kmh(&entry.position, &self.config);
        let excess_pct = speed_excess_pct(entry.speed, limit_kmh);
        SpeedAssessment {
            limit_kmh,
            excess_pct,
            severity: speed_severity(excess_pct, &self.config),
        }
    }

    /// Drop records older than the configured TTL. Returns how many went.
    pub fn stale_purge(&mut self, now: f64) -> usize {
        let ttl = self.config.record_ttl_s;
        let before = self.records.len();
        self.records.retain(|_, record| now - record.seen_at <= ttl);
        before - self.records.len()
    }

    pub fn last_speed(&self, vehicle_id: &str) -> Option<f64> {
        self.records.get(vehicle_id).map(|record| record.speed)
    }

    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denm_core::geo::METERS_PER_DEGREE;
    use tracing_test::traced_test;

    fn line(t: f64, id: &str, speed: f64, x: f64) -> String {
        format!("{t},{id},{speed},90.0,0.0,{}", x / METERS_PER_DEGREE)
    }

    #[test]
    fn parses_well_formed_line() {
        let entry = SpeedLogEntry::parse_line(&line(1.5, "veh3", 12.0, 500.0)).unwrap();
        assert_eq!(entry.vehicle_id, "veh3");
        assert_eq!(entry.speed, 12.0);
        assert!((entry.position.x - 500.0).abs() < 1e-6);
    }

    #[test]
    fn reports_field_errors() {
        assert!(matches!(
            SpeedLogEntry::parse_line("1.0,veh1,12.0"),
            Err(SpeedLogError::Malformed(_))
        ));
        assert!(matches!(
            SpeedLogEntry::parse_line("1.0,veh1,fast,0,0,0"),
            Err(SpeedLogError::Malformed(_))
        ));
        assert_eq!(
            SpeedLogEntry::parse_line("1.0,veh1,inf,0,0,0"),
            Err(SpeedLogError::NonFinite("speed"))
        );
        assert_eq!(
            SpeedLogEntry::parse_line("1.0, ,12.0,0,0,0"),
            Err(SpeedLogError::MissingVehicle)
        );
        assert_eq!(SpeedLogEntry::parse_line(""), Err(SpeedLogError::Empty));
    }

    #[test]
    fn padded_fields_are_trimmed() {
        let entry = SpeedLogEntry::parse_line(" 2.0 , car9 , 12.5 , 90 , 0 , 0 ").unwrap();
        assert_eq!(entry.vehicle_id, "car9");
        assert_eq!(entry.speed, 12.5);
    }

    #[traced_test]
    #[test]
    fn malformed_lines_are_skipped() {
        let log = format!(
            "{}\ngarbage\n\n1.0,veh2,NaN,0,0,0\n{}\n",
            line(1.0, "veh1", 10.0, 100.0),
            line(2.0, "veh2", 20.0, 100.0)
        );
        let entries = parse_speed_log(&log);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].vehicle_id, "veh2");
        assert!(logs_contain("Skipping speed log line"));
    }

    #[test]
    fn assessment_uses_zone_limit() {
        let mut monitor = SpeedMonitor::new(SpeedConfig::default());
        // 30 km/h zone, 12 m/s = 43.2 km/h: 44% over.
        let entry = SpeedLogEntry::parse_line(&line(0.0, "veh1", 12.0, 50.0)).unwrap();
        let assessment = monitor.entry_assess(&entry, 0.0);
        assert_eq!(assessment.limit_kmh, 30.0);
        assert_eq!(assessment.severity, Severity::Critical);

        // 110 km/h zone, 30 m/s = 108 km/h: below the limit.
        let entry = SpeedLogEntry::parse_line(&line(0.0, "veh2", 30.0, 2000.0)).unwrap();
        assert_eq!(monitor.entry_assess(&entry, 0.0).severity, Severity::None);
        assert_eq!(monitor.tracked(), 2);
    }

    #[test]
    fn stale_records_are_purged() {
        let mut monitor = SpeedMonitor::new(SpeedConfig::default());
        let old = SpeedLogEntry::parse_line(&line(0.0, "veh1", 10.0, 0.0)).unwrap();
        let fresh = SpeedLogEntry::parse_line(&line(0.0, "veh2", 10.0, 0.0)).unwrap();
        monitor.entry_assess(&old, 0.0);
        monitor.entry_assess(&fresh, 5.0);

        assert_eq!(monitor.stale_purge(10.0), 0);
        assert_eq!(monitor.stale_purge(10.5), 1);
        assert_eq!(monitor.last_speed("veh1"), None);
        assert_eq!(monitor.last_speed("veh2"), Some(10.0));
    }
}
