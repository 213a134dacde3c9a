//! Domain records and their mapping onto [`clinic_core::Record`].
//!
//! The structures only store generic records; these types give the fields
//! names and meaning.

use chrono::{DateTime, Utc};
use clinic_core::{QueueEntry, Record, Timestamp};
use serde::{Deserialize, Serialize};

use crate::cpf::Cpf;
use crate::error::{AgendaError, Result};

/// Data supplied when registering a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

impl PatientDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn birth_date(mut self, date: impl Into<String>) -> Self {
        self.birth_date = Some(date.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub cpf: Cpf,
    #[serde(flatten)]
    pub details: PatientDetails,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Slot key; equal instants name the same slot.
    pub when: Timestamp,
    pub cpf: Cpf,
    pub patient_name: String,
    pub doctor: String,
    #[serde(default)]
    pub notes: String,
    pub booked_at: DateTime<Utc>,
}

/// Triage class; the discriminant is the queue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emergency = 1,
    Urgent = 2,
    Normal = 3,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Emergency, Severity::Urgent, Severity::Normal];

    #[inline]
    pub fn priority(self) -> u32 {
        self as u32
    }

    pub fn from_priority(priority: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.priority() == priority)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Urgency {
    pub cpf: Cpf,
    pub patient_name: String,
    pub severity: Severity,
    pub description: String,
    pub arrived_at: DateTime<Utc>,
}

fn required(record: &Record, field: &'static str) -> Result<String> {
    record
        .text(field)
        .map(str::to_owned)
        .ok_or_else(|| AgendaError::MalformedRecord {
            key: record.key().to_owned(),
            field,
        })
}

fn optional(record: &Record, field: &str) -> Option<String> {
    record.text(field).map(str::to_owned)
}

fn instant(record: &Record, field: &'static str) -> Result<DateTime<Utc>> {
    let text = required(record, field)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AgendaError::MalformedRecord {
            key: record.key().to_owned(),
            field,
        })
}

impl Patient {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(self.cpf.as_str())
            .with("name", self.details.name.as_str())
            .with("registered_at", self.registered_at.to_rfc3339());
        for (field, value) in [
            ("phone", &self.details.phone),
            ("email", &self.details.email),
            ("birth_date", &self.details.birth_date),
        ] {
            if let Some(v) = value {
                record.set(field, v.as_str());
            }
        }
        record
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            cpf: Cpf::parse(record.key())?,
            details: PatientDetails {
                name: required(record, "name")?,
                phone: optional(record, "phone"),
                email: optional(record, "email"),
                birth_date: optional(record, "birth_date"),
            },
            registered_at: instant(record, "registered_at")?,
        })
    }
}

impl Appointment {
    /// The index key is the slot; the record carries the rest.
    pub fn to_record(&self) -> Record {
        Record::new(self.when.as_str())
            .with("cpf", self.cpf.as_str())
            .with("patient_name", self.patient_name.as_str())
            .with("doctor", self.doctor.as_str())
            .with("notes", self.notes.as_str())
            .with("booked_at", self.booked_at.to_rfc3339())
    }

    pub fn from_record(when: &Timestamp, record: &Record) -> Result<Self> {
        Ok(Self {
            when: when.clone(),
            cpf: Cpf::parse(&required(record, "cpf")?)?,
            patient_name: required(record, "patient_name")?,
            doctor: required(record, "doctor")?,
            notes: optional(record, "notes").unwrap_or_default(),
            booked_at: instant(record, "booked_at")?,
        })
    }
}

impl Urgency {
    /// The heap orders by whole seconds; the payload keeps the exact arrival.
    pub fn to_entry(&self) -> QueueEntry<Record> {
        let payload = Record::new(self.cpf.as_str())
            .with("patient_name", self.patient_name.as_str())
            .with("description", self.description.as_str())
            .with("arrived_at", self.arrived_at.to_rfc3339());
        QueueEntry::new(
            self.cpf.as_str(),
            self.severity.priority(),
            self.arrived_at.timestamp(),
            payload,
        )
    }

    pub fn from_entry(entry: &QueueEntry<Record>) -> Result<Self> {
        let malformed = |field| AgendaError::MalformedRecord {
            key: entry.id.clone(),
            field,
        };
        Ok(Self {
            cpf: Cpf::parse(&entry.id)?,
            patient_name: required(&entry.payload, "patient_name")?,
            severity: Severity::from_priority(entry.priority).ok_or_else(|| malformed("priority"))?,
            description: required(&entry.payload, "description")?,
            arrived_at: match optional(&entry.payload, "arrived_at") {
                Some(_) => instant(&entry.payload, "arrived_at")?,
                None => DateTime::from_timestamp(entry.arrival, 0).ok_or_else(|| malformed("arrival"))?,
            },
        })
    }
}
