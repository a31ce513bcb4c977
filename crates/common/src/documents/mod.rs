//! Document construction
//!
//! Turns a joined consultation record into the labeled text blob that gets
//! chunked and embedded, plus the metadata tag carried by every chunk.
//! Every section is always present; absent values render as a sentinel so
//! retrieved context keeps the same shape for every record.

use crate::db::JoinedRecord;
use serde::{Deserialize, Serialize};

/// Sentinel for an absent patient name
pub const UNKNOWN: &str = "Unknown";

/// Sentinel for any other absent field
pub const NOT_AVAILABLE: &str = "N/A";

/// Rendering of an absent prescription map
pub const EMPTY_PRESCRIPTIONS: &str = "{}";

/// Section labels, in rendering order
pub const LABELS: [&str; 9] = [
    "Patient",
    "UHID",
    "Age",
    "Gender",
    "Date",
    "Transcript",
    "Summary",
    "Prescriptions",
    "Doctor Notes",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Metadata attached to a document and to each of its chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub uhid: Option<String>,
    pub patient_name: Option<String>,
    pub age: Option<i32>,
    pub date: String,
}

/// A consultation rendered for indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Consultation id the document was built from
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Build the indexable document for one joined record
pub fn build_document(record: &JoinedRecord) -> IndexedDocument {
    let patient = &record.patient;
    let consultation = &record.consultation;

    let date = consultation
        .date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let prescriptions = match &consultation.prescription_data {
        Some(value) if !value.is_null() => {
            serde_json::to_string(value).unwrap_or_else(|_| EMPTY_PRESCRIPTIONS.to_string())
        }
        _ => EMPTY_PRESCRIPTIONS.to_string(),
    };

    let values = [
        patient.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        or_na(patient.uhid.as_deref()),
        patient.age.map(|a| a.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        or_na(patient.gender.as_deref()),
        date.clone(),
        or_na(consultation.transcript.as_deref()),
        or_na(consultation.ai_summary.as_deref()),
        prescriptions,
        or_na(consultation.doctor_notes.as_deref()),
    ];

    let text = LABELS
        .iter()
        .zip(values.iter())
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    IndexedDocument {
        id: consultation.id.clone(),
        text,
        metadata: DocumentMetadata {
            uhid: patient.uhid.clone(),
            patient_name: patient.name.clone(),
            age: patient.age,
            date,
        },
    }
}

/// Build documents for a batch of records, preserving order
pub fn build_documents(records: &[JoinedRecord]) -> Vec<IndexedDocument> {
    records.iter().map(build_document).collect()
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}
