//! # clinic-agenda
//!
//! A small clinic front desk built on `clinic-core`:
//!
//! - **Patients** live in a [`KeyedTable`] keyed by CPF.
//! - **Appointments** live in an [`OrderedIndex`] keyed by their time slot.
//! - **Urgencies** wait in a [`PriorityQueue`] by severity, then arrival.
//! - **Clinical notes** are compressed with Huffman coding.
//!
//! Each structure sits behind its own lock, so an [`Agenda`] can be shared
//! between threads. With a snapshot path configured, the whole agenda is
//! written to JSON after every change and restored by [`Agenda::open`].
//!
//! ## Example
//!
//! ```rust
//! use clinic_agenda::{Agenda, PatientDetails, Severity};
//!
//! let agenda = Agenda::new();
//! agenda.register_patient("529.982.247-25", PatientDetails::new("Ana")).unwrap();
//! agenda.schedule("529.982.247-25", "2024-03-01 09:00", "Dr. Lima", "").unwrap();
//! agenda.admit("52998224725", Severity::Urgent, "high fever").unwrap();
//!
//! assert_eq!(agenda.appointments().unwrap().len(), 1);
//! assert_eq!(agenda.call_next().unwrap().patient_name, "Ana");
//! ```

pub mod config;
pub mod cpf;
pub mod error;
pub mod model;
pub mod notes;
pub mod snapshot;

pub use config::Config;
pub use cpf::Cpf;
pub use error::{AgendaError, Result};
pub use model::{Appointment, Patient, PatientDetails, Severity, Urgency};
pub use notes::ClinicalNotes;
pub use snapshot::{Snapshot, SnapshotStore};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use clinic_core::huffman::{BitString, Compressed, CompressionStats, TreeDescriptor};
use clinic_core::{IndexStats, InsertOutcome, KeyedTable, OrderedIndex, PriorityQueue, QueueStats, Record, TableStats, Timestamp};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Number of buckets shown in [`Report::table_distribution`].
const DISTRIBUTION_PREVIEW: usize = 20;

/// Result of [`Agenda::register_patient`].
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub patient: Patient,
    pub outcome: InsertOutcome,
}

/// Result of [`Agenda::schedule`].
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub appointment: Appointment,
    /// The appointment previously holding the same slot.
    pub replaced: Option<Appointment>,
    pub comparisons: usize,
    pub rotations: usize,
    pub height: u32,
}

/// Result of [`Agenda::admit`].
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub urgency: Urgency,
    /// 1-based place in the queue.
    pub position: usize,
    pub comparisons: usize,
    pub swaps: usize,
}

/// Result of [`Agenda::compress_notes`].
#[derive(Debug, Clone, Serialize)]
pub struct CompressedNotes {
    pub text: String,
    pub compressed: Compressed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub total: usize,
    pub load_factor: f64,
    pub collisions: usize,
    pub collision_rate: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentSummary {
    pub total: usize,
    pub height: u32,
    pub balanced: bool,
    pub height_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrgencySummary {
    pub total: usize,
    pub height: u32,
    pub mean_wait_minutes: f64,
    pub efficiency: f64,
    pub by_severity: BTreeMap<Severity, usize>,
}

/// Headline numbers for every structure.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub patients: PatientSummary,
    pub appointments: AppointmentSummary,
    pub urgencies: UrgencySummary,
    pub operations: u64,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

/// Full statistics and text renderings of every structure.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub table: TableStats,
    pub table_distribution: Vec<usize>,
    pub index: IndexStats,
    pub index_outline: Vec<String>,
    pub queue: QueueStats,
    pub queue_outline: Vec<String>,
    /// Statistics of the most recent notes compression, if any.
    pub huffman: Option<CompressionStats>,
    /// Code tree of the most recent notes compression.
    pub huffman_outline: Vec<String>,
}

/// What the report shows of the last compression.
#[derive(Debug, Clone)]
struct LastCompression {
    stats: CompressionStats,
    outline: Vec<String>,
}

/// Patient registry, appointment book and urgency queue.
///
/// Every structure has its own lock; no method holds two at once. Snapshot
/// writes go through `save_lock`, which is taken before any structure lock.
pub struct Agenda {
    patients: Mutex<KeyedTable<Record>>,
    appointments: Mutex<OrderedIndex<Timestamp, Record>>,
    urgencies: Mutex<PriorityQueue<Record>>,
    last_compression: Mutex<Option<LastCompression>>,
    store: Option<SnapshotStore>,
    save_lock: Mutex<()>,
    config: Config,
    operations: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Agenda {
    /// In-memory agenda with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Empty agenda. Does not read an existing snapshot; see [`Agenda::open`].
    pub fn with_config(config: Config) -> Self {
        Self {
            patients: Mutex::new(KeyedTable::with_capacity(config.initial_patient_capacity)),
            appointments: Mutex::new(OrderedIndex::new()),
            urgencies: Mutex::new(PriorityQueue::new()),
            last_compression: Mutex::new(None),
            store: config.snapshot_path.clone().map(SnapshotStore::new),
            save_lock: Mutex::new(()),
            config,
            operations: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Agenda restored from the configured snapshot, if any.
    pub fn open(config: Config) -> Result<Self> {
        let agenda = Self::with_config(config);
        if let Some(store) = &agenda.store {
            let snapshot = store.load();
            agenda.restore(&snapshot);
            info!(
                path = %store.path().display(),
                patients = snapshot.patients.len(),
                appointments = snapshot.appointments.len(),
                urgencies = snapshot.urgencies.len(),
                "agenda restored"
            );
        }
        Ok(agenda)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn restore(&self, snapshot: &Snapshot) {
        {
            let mut patients = self.patients.lock();
            for p in &snapshot.patients {
                patients.insert(p.cpf.as_str(), p.to_record());
            }
        }
        {
            let mut appointments = self.appointments.lock();
            for a in &snapshot.appointments {
                appointments.insert(a.when.clone(), a.to_record());
            }
        }
        // Stored in extraction order, so ties keep their order on reinsert.
        let mut urgencies = self.urgencies.lock();
        for u in &snapshot.urgencies {
            urgencies.insert(u.to_entry());
        }
    }

    // ---------------------------------------------------------------------
    // Patients
    // ---------------------------------------------------------------------

    /// Register a patient, or update the details of one already registered.
    pub fn register_patient(&self, cpf: &str, details: PatientDetails) -> Result<Registration> {
        let cpf = Cpf::parse(cpf)?;
        let patient = Patient {
            cpf,
            details,
            registered_at: Utc::now(),
        };
        let outcome = self
            .patients
            .lock()
            .insert(patient.cpf.as_str(), patient.to_record());
        debug!(cpf = %patient.cpf, kind = ?outcome.kind, bucket = outcome.bucket, "patient registered");
        self.mutated();
        Ok(Registration { patient, outcome })
    }

    pub fn find_patient(&self, cpf: &str) -> Result<Patient> {
        let cpf = Cpf::parse(cpf)?;
        let patients = self.patients.lock();
        let record = patients
            .get(cpf.as_str())
            .ok_or_else(|| AgendaError::PatientNotFound(cpf.to_string()))?;
        Patient::from_record(record)
    }

    /// Remove a patient. Their appointments and queue entries are kept.
    pub fn remove_patient(&self, cpf: &str) -> Result<Patient> {
        let cpf = Cpf::parse(cpf)?;
        let record = self
            .patients
            .lock()
            .remove(cpf.as_str())
            .ok_or_else(|| AgendaError::PatientNotFound(cpf.to_string()))?;
        self.mutated();
        Patient::from_record(&record)
    }

    /// All patients, sorted by name.
    pub fn patients(&self) -> Result<Vec<Patient>> {
        let mut all = self
            .patients
            .lock()
            .values()
            .map(Patient::from_record)
            .collect::<Result<Vec<_>>>()?;
        all.sort_by(|a, b| a.details.name.cmp(&b.details.name));
        Ok(all)
    }

    pub fn patient_stats(&self) -> TableStats {
        self.patients.lock().stats()
    }

    // ---------------------------------------------------------------------
    // Appointments
    // ---------------------------------------------------------------------

    /// Book `when` for a registered patient. Booking a taken slot replaces it.
    pub fn schedule(&self, cpf: &str, when: &str, doctor: &str, notes: &str) -> Result<Booking> {
        let patient = self.find_patient(cpf)?;
        let appointment = Appointment {
            when: Timestamp::parse(when)?,
            cpf: patient.cpf,
            patient_name: patient.details.name,
            doctor: doctor.to_owned(),
            notes: notes.to_owned(),
            booked_at: Utc::now(),
        };
        let report = self
            .appointments
            .lock()
            .insert(appointment.when.clone(), appointment.to_record());
        let replaced = report
            .replaced
            .as_ref()
            .map(|r| Appointment::from_record(&appointment.when, r))
            .transpose()?;
        debug!(
            when = %appointment.when,
            rotations = report.rotations,
            height = report.height,
            "appointment booked"
        );
        self.mutated();
        Ok(Booking {
            appointment,
            replaced,
            comparisons: report.comparisons,
            rotations: report.rotations,
            height: report.height,
        })
    }

    pub fn find_appointment(&self, when: &str) -> Result<Appointment> {
        let when = Timestamp::parse(when)?;
        let appointments = self.appointments.lock();
        let record = appointments
            .get(&when)
            .ok_or_else(|| clinic_core::Error::NotFound(when.to_string()))?;
        Appointment::from_record(&when, record)
    }

    pub fn cancel(&self, when: &str) -> Result<Appointment> {
        let when = Timestamp::parse(when)?;
        let report = self.appointments.lock().remove(&when);
        let record = report
            .removed
            .ok_or_else(|| clinic_core::Error::NotFound(when.to_string()))?;
        debug!(when = %when, rotations = report.rotations, "appointment cancelled");
        self.mutated();
        Appointment::from_record(&when, &record)
    }

    /// All appointments in chronological order.
    pub fn appointments(&self) -> Result<Vec<Appointment>> {
        self.appointments
            .lock()
            .iter()
            .map(|(when, record)| Appointment::from_record(when, record))
            .collect()
    }

    /// Appointments with `from <= when <= to`.
    pub fn appointments_between(&self, from: &str, to: &str) -> Result<Vec<Appointment>> {
        let (from, to) = (Timestamp::parse(from)?, Timestamp::parse(to)?);
        self.appointments
            .lock()
            .range(&from, &to)
            .into_iter()
            .map(|(when, record)| Appointment::from_record(when, record))
            .collect()
    }

    pub fn appointment_stats(&self) -> IndexStats {
        self.appointments.lock().stats()
    }

    // ---------------------------------------------------------------------
    // Urgencies
    // ---------------------------------------------------------------------

    /// Queue a registered patient with the current time as arrival.
    pub fn admit(&self, cpf: &str, severity: Severity, description: &str) -> Result<Admission> {
        self.admit_at(cpf, severity, description, Utc::now())
    }

    pub fn admit_at(
        &self,
        cpf: &str,
        severity: Severity,
        description: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<Admission> {
        let patient = self.find_patient(cpf)?;
        let urgency = Urgency {
            cpf: patient.cpf,
            patient_name: patient.details.name,
            severity,
            description: description.to_owned(),
            arrived_at,
        };
        let report = self.urgencies.lock().insert(urgency.to_entry());
        debug!(cpf = %urgency.cpf, ?severity, position = report.rank, "patient admitted");
        self.mutated();
        Ok(Admission {
            urgency,
            position: report.rank,
            comparisons: report.comparisons,
            swaps: report.swaps,
        })
    }

    /// Take the most urgent patient off the queue.
    pub fn call_next(&self) -> Result<Urgency> {
        let popped = self.urgencies.lock().extract_min()?;
        self.mutated();
        Urgency::from_entry(&popped.entry)
    }

    /// Remove a patient from the queue without calling them.
    pub fn discharge(&self, cpf: &str) -> Result<Urgency> {
        let cpf = Cpf::parse(cpf)?;
        let entry = self
            .urgencies
            .lock()
            .remove_by_id(cpf.as_str())
            .ok_or_else(|| clinic_core::Error::NotFound(cpf.to_string()))?;
        self.mutated();
        Urgency::from_entry(&entry)
    }

    /// The queue in the order patients will be called.
    pub fn urgencies(&self) -> Result<Vec<Urgency>> {
        self.urgencies
            .lock()
            .ordered()
            .into_iter()
            .map(Urgency::from_entry)
            .collect()
    }

    pub fn urgency_counts(&self) -> BTreeMap<Severity, usize> {
        let counts = self.urgencies.lock().count_by_priority();
        counts
            .into_iter()
            .filter_map(|(p, n)| Severity::from_priority(p).map(|s| (s, n)))
            .collect()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.urgencies.lock().stats(Utc::now().timestamp())
    }

    // ---------------------------------------------------------------------
    // Clinical notes
    // ---------------------------------------------------------------------

    /// Compress notes for a registered patient, stamping their CPF.
    pub fn compress_notes(&self, cpf: &str, notes: &ClinicalNotes) -> Result<CompressedNotes> {
        let patient = self.find_patient(cpf)?;
        let notes = ClinicalNotes {
            cpf: Some(patient.cpf.as_str().to_owned()),
            ..notes.clone()
        };
        let compressed = notes.compress()?;
        *self.last_compression.lock() = Some(LastCompression {
            stats: compressed.stats.clone(),
            outline: compressed.tree_outline()?,
        });
        debug!(
            cpf = %patient.cpf,
            ratio = compressed.stats.ratio,
            "notes compressed"
        );
        Ok(CompressedNotes {
            text: notes.render(),
            compressed,
        })
    }

    pub fn decompress_notes(&self, bits: &BitString, tree: &TreeDescriptor) -> Result<ClinicalNotes> {
        ClinicalNotes::decompress(bits, tree)
    }

    // ---------------------------------------------------------------------
    // Reporting and persistence
    // ---------------------------------------------------------------------

    pub fn dashboard(&self) -> Dashboard {
        let table = self.patient_stats();
        let index = self.appointment_stats();
        let queue = self.queue_stats();
        Dashboard {
            patients: PatientSummary {
                total: table.len,
                load_factor: table.load_factor,
                collisions: table.total_collisions,
                collision_rate: table.collision_rate,
                efficiency: table.efficiency,
            },
            appointments: AppointmentSummary {
                total: index.len,
                height: index.height,
                balanced: index.balanced,
                height_efficiency: index.height_efficiency,
            },
            urgencies: UrgencySummary {
                total: queue.len,
                height: queue.height,
                mean_wait_minutes: queue.mean_wait_minutes,
                efficiency: queue.efficiency,
                by_severity: self.urgency_counts(),
            },
            operations: self.operations.load(Ordering::Relaxed),
            started_at: self.started_at,
            generated_at: Utc::now(),
        }
    }

    pub fn report(&self) -> Report {
        let (table, table_distribution) = {
            let patients = self.patients.lock();
            (patients.stats(), patients.distribution(DISTRIBUTION_PREVIEW))
        };
        let (index, index_outline) = {
            let appointments = self.appointments.lock();
            (appointments.stats(), appointments.outline())
        };
        let (queue, queue_outline) = {
            let urgencies = self.urgencies.lock();
            (urgencies.stats(Utc::now().timestamp()), urgencies.outline())
        };
        let (huffman, huffman_outline) = match self.last_compression.lock().clone() {
            Some(last) => (Some(last.stats), last.outline),
            None => (None, Vec::new()),
        };
        Report {
            table,
            table_distribution,
            index,
            index_outline,
            queue,
            queue_outline,
            huffman,
            huffman_outline,
        }
    }

    /// Current contents as a snapshot. Locks one structure at a time.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            patients: self.patients()?,
            appointments: self.appointments()?,
            urgencies: self.urgencies()?,
            saved_at: None,
        })
    }

    /// Write the snapshot now. A no-op without a snapshot path.
    ///
    /// The snapshot is taken while holding the save lock, so the last write
    /// to reach the file always carries every change made before it started.
    pub fn save(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = self.save_lock.lock();
        store.save(&self.snapshot()?)
    }

    /// Empty every structure and delete the snapshot file.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        *self.last_compression.lock() = None;
        *self.patients.lock() = KeyedTable::with_capacity(self.config.initial_patient_capacity);
        *self.appointments.lock() = OrderedIndex::new();
        *self.urgencies.lock() = PriorityQueue::new();
        if let Some(store) = &self.store {
            store.clear()?;
        }
        info!("agenda cleared");
        Ok(())
    }

    fn mutated(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        // The change is already applied in memory; a failed write only loses
        // durability, so it is logged instead of failing the call.
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to save snapshot");
        }
    }
}

impl Default for Agenda {
    fn default() -> Self {
        Self::new()
    }
}
