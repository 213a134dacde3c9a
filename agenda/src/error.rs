use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgendaError>;

#[derive(Error, Debug)]
pub enum AgendaError {
    #[error(transparent)]
    Core(#[from] clinic_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CPF: {0:?}")]
    InvalidCpf(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Decoded notes are not valid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("Stored record {key:?} has no usable {field:?} field")]
    MalformedRecord { key: String, field: &'static str },
}

impl AgendaError {
    /// Whether the error means "no such entry" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AgendaError::PatientNotFound(_)
                | AgendaError::Core(clinic_core::Error::NotFound(_))
                | AgendaError::Core(clinic_core::Error::EmptyQueue)
        )
    }
}
