//! Joined consultation records
//!
//! Snapshots of store rows taken at extraction time. Every optional source
//! field stays optional here; sentinel rendering happens in the document
//! builder so a record never fails to materialize.

use super::models::{Consultation, Patient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One consultation as read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: String,
    pub patient_id: String,
    pub date: Option<DateTime<Utc>>,
    pub transcript: Option<String>,
    pub ai_summary: Option<String>,
    pub prescription_data: Option<serde_json::Value>,
    pub doctor_notes: Option<String>,
}

/// Patient demographics joined onto a consultation
///
/// `PatientRecord::unknown()` stands in for a consultation whose patient
/// reference matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Option<String>,
    pub uhid: Option<String>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// Consultation with its patient embedded (left-outer join)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub consultation: ConsultationRecord,
    pub patient: PatientRecord,
}

impl PatientRecord {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self == &Self::unknown()
    }
}

impl From<Consultation> for ConsultationRecord {
    fn from(model: Consultation) -> Self {
        Self {
            id: model.id,
            patient_id: model.patient_id,
            date: model.date,
            transcript: model.transcript,
            ai_summary: model.ai_summary,
            prescription_data: model.prescription_data,
            doctor_notes: model.doctor_notes,
        }
    }
}

impl From<Patient> for PatientRecord {
    fn from(model: Patient) -> Self {
        Self {
            id: Some(model.id),
            uhid: Some(model.uhid),
            name: Some(model.name),
            age: model.age,
            gender: model.gender,
        }
    }
}

impl JoinedRecord {
    /// Flatten one row of the consultation/patient left join
    pub fn from_row(consultation: Consultation, patient: Option<Patient>) -> Self {
        Self {
            consultation: consultation.into(),
            patient: patient.map(PatientRecord::from).unwrap_or_else(PatientRecord::unknown),
        }
    }
}
