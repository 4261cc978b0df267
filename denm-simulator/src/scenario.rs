//! ## denm-simulator::scenario
//! **YAML description of one simulated road situation**
//!
//! A scenario places vehicles, silent obstacles and roadside relays, and
//! says which alert families each vehicle sends and listens for. Optional
//! fields fall back to the `simulator` section of the configuration.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use denm_config::NetworkModelConfig;
use denm_core::geo::Position;
use denm_protocols::CauseCode;

use crate::ScenarioError;

const COLLISION: &str = include_str!("../scenarios/collision.yaml");
const DROWSINESS: &str = include_str!("../scenarios/drowsiness.yaml");
const LANE_CHANGE: &str = include_str!("../scenarios/lane_change.yaml");
const SPEED: &str = include_str!("../scenarios/speed.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFamily {
    Collision,
    Drowsiness,
    LaneChange,
    Speed,
}

impl AlertFamily {
    pub const ALL: [AlertFamily; 4] = [
        AlertFamily::Collision,
        AlertFamily::Drowsiness,
        AlertFamily::LaneChange,
        AlertFamily::Speed,
    ];

    pub fn cause(self) -> CauseCode {
        match self {
            AlertFamily::Collision => CauseCode::Collision,
            AlertFamily::Drowsiness => CauseCode::AnomalousDriving,
            AlertFamily::LaneChange => CauseCode::DangerousLaneChange,
            AlertFamily::Speed => CauseCode::SpeedViolation,
        }
    }

    pub fn name(self) -> &'static str {
        self.cause().family()
    }
}

impl fmt::Display for AlertFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlertFamily {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        AlertFamily::ALL
            .into_iter()
            .find(|family| family.name() == wanted)
            .ok_or_else(|| ScenarioError::UnknownFamily(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Mobility id, also used in CSV file names.
    pub id: String,
    pub station: u32,
    pub position: Position,
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub lane: u8,
    #[serde(default)]
    pub emergency: bool,
    #[serde(default)]
    pub sends: Vec<AlertFamily>,
    #[serde(default)]
    pub receives: Vec<AlertFamily>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub id: String,
    pub position: Position,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySpec {
    pub station: u32,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub tick_s: Option<f64>,
    #[serde(default)]
    pub network: Option<NetworkModelConfig>,
    pub vehicles: Vec<VehicleSpec>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    pub relays: Vec<RelaySpec>,
}

impl Scenario {
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_yaml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(PathBuf::from(path)));
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Reference scenario exercising one alert family end to end.
    pub fn builtin(family: AlertFamily) -> Result<Self, ScenarioError> {
        Self::from_yaml(match family {
            AlertFamily::Collision => COLLISION,
            AlertFamily::Drowsiness => DROWSINESS,
            AlertFamily::LaneChange => LANE_CHANGE,
            AlertFamily::Speed => SPEED,
        })
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.vehicles.is_empty() {
            return Err(ScenarioError::Invalid("no vehicles".into()));
        }
        if let Some(tick_s) = self.tick_s {
            if !(tick_s.is_finite() && tick_s > 0.0) {
                return Err(ScenarioError::Invalid(format!("tick_s {tick_s} must be positive")));
            }
        }
        if self.ticks == Some(0) {
            return Err(ScenarioError::Invalid("ticks must be at least 1".into()));
        }
        if let Some(network) = &self.network {
            if !(0.0..=1.0).contains(&network.packet_loss) {
                return Err(ScenarioError::Invalid(format!(
                    "packet_loss {} outside [0, 1]",
                    network.packet_loss
                )));
            }
        }

        let mut stations = HashSet::new();
        let mut ids = HashSet::new();
        let station_ids = self
            .vehicles
            .iter()
            .map(|v| v.station)
            .chain(self.relays.iter().map(|r| r.station));
        for station in station_ids {
            if !stations.insert(station) {
                return Err(ScenarioError::Invalid(format!("station {station} used twice")));
            }
        }
        let object_ids = self
            .vehicles
            .iter()
            .map(|v| v.id.as_str())
            .chain(self.obstacles.iter().map(|o| o.id.as_str()));
        for id in object_ids {
            if !ids.insert(id) {
                return Err(ScenarioError::Invalid(format!("id {id:?} used twice")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        for family in AlertFamily::ALL {
            let scenario = Scenario::builtin(family).unwrap();
            assert_eq!(scenario.name, family.name());
            assert!(scenario
                .vehicles
                .iter()
                .any(|vehicle| vehicle.sends.contains(&family)));
        }
    }

    #[test]
    fn family_names_parse() {
        assert_eq!("lane-change".parse::<AlertFamily>().unwrap(), AlertFamily::LaneChange);
        assert_eq!("Speed".parse::<AlertFamily>().unwrap(), AlertFamily::Speed);
        assert!(matches!(
            "fog".parse::<AlertFamily>(),
            Err(ScenarioError::UnknownFamily(_))
        ));
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let scenario = Scenario::from_yaml(
            "name: tiny\nvehicles:\n  - id: a\n    station: 1\n    position: { x: 0.0, y: 0.0 }\n    speed: 10.0\n",
        )
        .unwrap();
        assert_eq!(scenario.seed, None);
        assert!(scenario.obstacles.is_empty());
        assert_eq!(scenario.vehicles[0].heading, 0.0);
        assert!(scenario.vehicles[0].sends.is_empty());
    }

    #[test]
    fn duplicate_stations_are_rejected() {
        let result = Scenario::from_yaml(
            "name: dup\nvehicles:\n  - id: a\n    station: 1\n    position: { x: 0.0, y: 0.0 }\n    speed: 1.0\nrelays:\n  - station: 1\n    position: { x: 5.0, y: 0.0 }\n",
        );
        assert!(matches!(result, Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn empty_scenario_is_rejected() {
        assert!(matches!(
            Scenario::from_yaml("name: empty\nvehicles: []\n"),
            Err(ScenarioError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_family_fails_to_parse() {
        let result = Scenario::from_yaml(
            "name: x\nvehicles:\n  - id: a\n    station: 1\n    position: { x: 0.0, y: 0.0 }\n    speed: 1.0\n    sends: [fog]\n",
        );
        assert!(matches!(result, Err(ScenarioError::Parse(_))));
    }

    #[test]
    fn load_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speed.yaml");
        std::fs::write(&path, SPEED).unwrap();
        assert_eq!(Scenario::load(&path).unwrap().vehicles.len(), 3);
        assert!(matches!(
            Scenario::load(dir.path().join("missing.yaml")),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
