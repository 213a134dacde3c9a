//! Clinical notes as labelled text lines, the form that gets compressed.

use clinic_core::huffman::{self, BitString, Compressed, TreeDescriptor};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exams: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

const LABELS: [&str; 9] = [
    "HISTORY",
    "SYMPTOMS",
    "DIAGNOSIS",
    "PRESCRIPTION",
    "EXAMS",
    "OBSERVATIONS",
    "ANNOTATIONS",
    "CPF",
    "DATE",
];

impl ClinicalNotes {
    fn fields(&self) -> [&Option<String>; 9] {
        [
            &self.history,
            &self.symptoms,
            &self.diagnosis,
            &self.prescription,
            &self.exams,
            &self.observations,
            &self.annotations,
            &self.cpf,
            &self.date,
        ]
    }

    fn fields_mut(&mut self) -> [&mut Option<String>; 9] {
        [
            &mut self.history,
            &mut self.symptoms,
            &mut self.diagnosis,
            &mut self.prescription,
            &mut self.exams,
            &mut self.observations,
            &mut self.annotations,
            &mut self.cpf,
            &mut self.date,
        ]
    }

    /// One `LABEL: value` line per non-empty field, in a fixed order. Line
    /// breaks inside values are flattened to spaces.
    pub fn render(&self) -> String {
        LABELS
            .iter()
            .zip(self.fields())
            .filter_map(|(label, value)| {
                let value = value.as_deref()?.trim();
                (!value.is_empty()).then(|| format!("{label}: {}", value.replace(['\r', '\n'], " ")))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inverse of [`ClinicalNotes::render`]; unknown lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut notes = ClinicalNotes::default();
        for line in text.lines() {
            let Some((label, value)) = line.split_once(": ") else {
                continue;
            };
            if let Some(i) = LABELS.iter().position(|l| *l == label) {
                *notes.fields_mut()[i] = Some(value.to_owned());
            }
        }
        notes
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.as_deref().map_or(true, |v| v.trim().is_empty()))
    }

    /// Render and compress. Empty notes fail with `EmptyInput`.
    pub fn compress(&self) -> Result<Compressed> {
        Ok(huffman::compress(self.render().as_bytes())?)
    }

    pub fn decompress(bits: &BitString, tree: &TreeDescriptor) -> Result<Self> {
        let bytes = huffman::decompress(bits, tree)?;
        Ok(Self::parse(&String::from_utf8(bytes)?))
    }
}
