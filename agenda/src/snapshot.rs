//! JSON snapshot of the agenda, rewritten after every mutation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{Appointment, Patient, Urgency};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub patients: Vec<Patient>,
    /// Chronological order.
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    /// Extraction order.
    #[serde(default)]
    pub urgencies: Vec<Urgency>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.appointments.is_empty() && self.urgencies.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `snapshot`, stamped with the current time.
    /// Written to a sibling temp file unique to this write, then renamed over
    /// the target. Concurrent writers must be serialized by the caller for the
    /// newest snapshot to win.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let stamped = Snapshot {
            saved_at: Some(Utc::now()),
            ..snapshot.clone()
        };
        let json = serde_json::to_string_pretty(&stamped)?;

        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(
            path = %self.path.display(),
            patients = stamped.patients.len(),
            appointments = stamped.appointments.len(),
            urgencies = stamped.urgencies.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// `<file>.tmp.<pid>.<nanos>.<seq>` next to the target.
    fn temp_path(&self) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(
            ".tmp.{}.{}.{}",
            std::process::id(),
            nanos,
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        self.path.with_file_name(name)
    }

    /// Read the snapshot. A missing file is an empty agenda; an unreadable or
    /// corrupt one is logged and also treated as empty.
    pub fn load(&self) -> Snapshot {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Snapshot::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read snapshot, starting empty");
                return Snapshot::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt snapshot, starting empty");
                Snapshot::default()
            }
        }
    }

    /// Delete the snapshot file, if any.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpf::Cpf;
    use crate::model::PatientDetails;

    fn patient() -> Patient {
        Patient {
            cpf: Cpf::parse("11144477735").unwrap(),
            details: PatientDetails::new("Bruno"),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("agenda.json"));
        assert!(store.load().is_empty());

        let snapshot = Snapshot {
            patients: vec![patient()],
            ..Snapshot::default()
        };
        store.save(&snapshot).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.patients, snapshot.patients);
        assert!(loaded.saved_at.is_some());

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agenda.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SnapshotStore::new(&path).load(), Snapshot::default());
    }

    #[test]
    fn test_temp_files_are_unique_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("agenda.json"));
        let (a, b) = (store.temp_path(), store.temp_path());
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(dir.path()));
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("agenda.json.tmp."));

        store.save(&Snapshot::default()).unwrap();
        store.save(&Snapshot::default()).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["agenda.json"]);
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("agenda.json"));
        store
            .save(&Snapshot {
                patients: vec![patient()],
                ..Snapshot::default()
            })
            .unwrap();
        store.save(&Snapshot::default()).unwrap();
        assert!(store.load().is_empty());
    }
}
