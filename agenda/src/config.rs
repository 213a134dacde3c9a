use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;

/// Configuration for an [`crate::Agenda`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial bucket count of the patient table; rounded up to a prime.
    pub initial_patient_capacity: usize,
    /// Where to keep the JSON snapshot. `None` keeps everything in memory.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_patient_capacity: clinic_core::table::DEFAULT_CAPACITY,
            snapshot_path: None,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.initial_patient_capacity, 1009);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config =
            Config::from_json_str(r#"{"initial_patient_capacity": 97, "snapshot_path": "/tmp/agenda.json"}"#)
                .unwrap();
        assert_eq!(config.initial_patient_capacity, 97);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/agenda.json")));
        assert!(Config::from_json_str(r#"{"capacity": 3}"#).is_err());
    }
}
