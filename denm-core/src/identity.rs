//! ## denm-core::identity
//! **Bidirectional mobility id / station id registry**
//!
//! One registry is shared by every vehicle of a run, handed out as an
//! `Arc<IdentityRegistry>`. Lookups and registrations take a single mutex.
//! When backed by a file, each new mapping is appended as a
//! `"<mobility id> <station id>"` line and the file is reloaded at startup.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::IdentityError;
use crate::station::StationId;

#[derive(Default)]
struct IdentityMaps {
    by_mobility: HashMap<String, StationId>,
    by_station: HashMap<StationId, String>,
}

impl IdentityMaps {
    fn insert(&mut self, mobility_id: &str, station: StationId) -> bool {
        if self.by_mobility.get(mobility_id) == Some(&station) {
            return false;
        }
        if let Some(previous) = self.by_mobility.insert(mobility_id.to_string(), station) {
            self.by_station.remove(&previous);
        }
        if let Some(previous) = self.by_station.insert(station, mobility_id.to_string()) {
            if previous != mobility_id {
                self.by_mobility.remove(&previous);
            }
        }
        true
    }
}

#[derive(Default)]
pub struct IdentityRegistry {
    maps: Mutex<IdentityMaps>,
    store: Option<PathBuf>,
}

impl IdentityRegistry {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Registry persisted to `path`. Existing mappings are loaded; lines that
    /// do not parse as `"<id> <u32>"` are skipped.
    pub fn with_store<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path = path.as_ref().to_path_buf();
        let mut maps = IdentityMaps::default();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            for (line_no, line) in contents.lines().enumerate() {
                match parse_mapping(line) {
                    Some((mobility_id, station)) => {
                        maps.insert(mobility_id, station);
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(line = line_no + 1, "Skipping malformed identity mapping"),
                }
            }
            debug!(path = %path.display(), entries = maps.by_mobility.len(), "Identity map loaded");
        }

        Ok(Self {
            maps: Mutex::new(maps),
            store: Some(path),
        })
    }

    pub fn identity_register(
        &self,
        mobility_id: &str,
        station: StationId,
    ) -> Result<(), IdentityError> {
        if mobility_id.is_empty() || mobility_id.contains(char::is_whitespace) {
            return Err(IdentityError::InvalidMobilityId(mobility_id.to_string()));
        }

        let mut maps = self.maps.lock();
        if !maps.insert(mobility_id, station) {
            return Ok(());
        }

        if let Some(path) = &self.store {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{} {}", mobility_id, station)?;
        }
        Ok(())
    }

    pub fn station_of(&self, mobility_id: &str) -> Option<StationId> {
        self.maps.lock().by_mobility.get(mobility_id).copied()
    }

    pub fn mobility_of(&self, station: StationId) -> Option<String> {
        self.maps.lock().by_station.get(&station).cloned()
    }

    pub fn len(&self) -> usize {
        self.maps.lock().by_mobility.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_mapping(line: &str) -> Option<(&str, StationId)> {
    let mut parts = line.split_whitespace();
    let mobility_id = parts.next()?;
    let station = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((mobility_id, StationId(station)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lookups_are_bidirectional() {
        let registry = IdentityRegistry::in_memory();
        registry.identity_register("veh0", StationId(42)).unwrap();
        assert_eq!(registry.station_of("veh0"), Some(StationId(42)));
        assert_eq!(registry.mobility_of(StationId(42)).as_deref(), Some("veh0"));
        assert_eq!(registry.station_of("veh1"), None);
    }

    #[test]
    fn remapping_drops_stale_reverse_entry() {
        let registry = IdentityRegistry::in_memory();
        registry.identity_register("veh0", StationId(1)).unwrap();
        registry.identity_register("veh0", StationId(2)).unwrap();
        assert_eq!(registry.mobility_of(StationId(1)), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn store_roundtrip_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        fs::write(&path, "veh7 7\nnot a mapping line\nveh8 x\n\n").unwrap();

        let registry = IdentityRegistry::with_store(&path).unwrap();
        assert_eq!(registry.len(), 1);
        registry.identity_register("veh9", StationId(9)).unwrap();
        drop(registry);

        let reloaded = IdentityRegistry::with_store(&path).unwrap();
        assert_eq!(reloaded.station_of("veh7"), Some(StationId(7)));
        assert_eq!(reloaded.station_of("veh9"), Some(StationId(9)));
    }

    #[test]
    fn rejects_whitespace_ids() {
        let registry = IdentityRegistry::in_memory();
        assert!(registry.identity_register("veh 0", StationId(1)).is_err());
    }

    #[test]
    fn shared_across_threads() {
        let registry = Arc::new(IdentityRegistry::in_memory());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .identity_register(&format!("veh{i}"), StationId(i))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 4);
    }
}
