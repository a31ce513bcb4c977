//! Query Parser - classifies what a question is asking for
//!
//! Intent is picked by case-insensitive keyword match, first match wins:
//! symptoms/complaints, then medications/prescriptions, then a question
//! about a patient whose name appears in the retrieved context, then a
//! general summary.

use super::record_parser::ParsedPatient;
use serde::{Deserialize, Serialize};

/// Query intent classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Symptoms or complaints
    SymptomReport,
    /// Medications or prescriptions
    PrescriptionPointer,
    /// A patient named in the question
    NamedPatient,
    /// Anything else
    GeneralSummary,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::SymptomReport => "symptom_report",
            QueryIntent::PrescriptionPointer => "prescription_pointer",
            QueryIntent::NamedPatient => "named_patient",
            QueryIntent::GeneralSummary => "general_summary",
        }
    }
}

/// Detect question intent against the patients parsed from context
pub fn detect_intent(question: &str, patients: &[ParsedPatient]) -> QueryIntent {
    let query_lower = question.to_lowercase();

    if query_lower.contains("symptom") || query_lower.contains("complaint") {
        return QueryIntent::SymptomReport;
    }

    if query_lower.contains("medication") || query_lower.contains("prescription") {
        return QueryIntent::PrescriptionPointer;
    }

    // Name match is case-sensitive against the question as asked
    if query_lower.contains("patient")
        && patients.iter().any(|p| question.contains(p.name.as_str()))
    {
        return QueryIntent::NamedPatient;
    }

    QueryIntent::GeneralSummary
}
