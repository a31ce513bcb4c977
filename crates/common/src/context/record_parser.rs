//! Per-patient parsing of retrieved context
//!
//! Scans line-labeled fields out of the joined chunk text. A `Patient:` line
//! closes the open record and starts a new one; `Age:`, `Transcript:` and
//! `Summary:` lines fill the open record; anything else is skipped. The
//! record still open at end of input is kept.

use serde::{Deserialize, Serialize};

const PATIENT: &str = "Patient:";
const AGE: &str = "Age:";
const TRANSCRIPT: &str = "Transcript:";
const SUMMARY: &str = "Summary:";

/// Fields recovered for one patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPatient {
    pub name: String,
    pub age: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
}

/// Split context text into patient records, in order of appearance
pub fn parse_patients(context: &str) -> Vec<ParsedPatient> {
    let mut patients = Vec::new();
    let mut current: Option<ParsedPatient> = None;

    for line in context.split('\n') {
        if let Some(name) = field_value(line, PATIENT) {
            if let Some(done) = current.take() {
                patients.push(done);
            }
            current = Some(ParsedPatient {
                name,
                ..ParsedPatient::default()
            });
            continue;
        }

        let Some(patient) = current.as_mut() else {
            continue;
        };

        if let Some(age) = field_value(line, AGE) {
            patient.age = Some(age);
        } else if let Some(transcript) = field_value(line, TRANSCRIPT) {
            patient.transcript = Some(transcript);
        } else if let Some(summary) = field_value(line, SUMMARY) {
            patient.summary = Some(summary);
        }
    }

    if let Some(done) = current {
        patients.push(done);
    }

    patients
}

/// Text between the first occurrence of `label` and the next one, trimmed
fn field_value(line: &str, label: &str) -> Option<String> {
    line.split(label).nth(1).map(|value| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_records_in_order() {
        let context = "Patient: Asha Verma\nUHID: MED1\nAge: 34\n\
                       Transcript: fever\nSummary: viral\n\n\
                       Patient: Rajesh Kumar\nAge: 45\nTranscript: cough";
        let patients = parse_patients(context);

        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].name, "Asha Verma");
        assert_eq!(patients[0].age.as_deref(), Some("34"));
        assert_eq!(patients[0].transcript.as_deref(), Some("fever"));
        assert_eq!(patients[0].summary.as_deref(), Some("viral"));
        assert_eq!(patients[1].name, "Rajesh Kumar");
        assert_eq!(patients[1].summary, None);
    }

    #[test]
    fn test_fields_before_any_patient_are_ignored() {
        let context = "Age: 99\nTranscript: orphan\nPatient: Meena\nDoctor Notes: rest";
        let patients = parse_patients(context);

        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].age, None);
        assert_eq!(patients[0].transcript, None);
    }

    #[test]
    fn test_first_matching_label_wins() {
        // A transcript mentioning "Age:" is read as the age line
        let patients = parse_patients("Patient: Ravi\nTranscript: reports Age: 12 on intake form");
        assert_eq!(patients[0].age.as_deref(), Some("12 on intake form"));
        assert_eq!(patients[0].transcript, None);
    }

    #[test]
    fn test_value_stops_at_repeated_label() {
        assert_eq!(field_value("Patient: A Patient: B", PATIENT).as_deref(), Some("A"));
        assert_eq!(field_value("no label here", PATIENT), None);
    }

    #[test]
    fn test_empty_context() {
        assert!(parse_patients("").is_empty());
        assert!(parse_patients("Empty Response").is_empty());
    }

    #[test]
    fn test_label_inside_line_opens_record() {
        let patients = parse_patients("Referral note -- Patient: Kiran\nAge: 7");
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].name, "Kiran");
        assert_eq!(patients[0].age.as_deref(), Some("7"));
    }
}
