//! JSON envelope for single-shot answers
//!
//! Stdout of the `query` binary is exactly one envelope line:
//! - `{"success":true,"question":..,"answer":..}`, exit 0
//! - `{"success":false,"error":..}`, exit 1
//! - `{"error":"No question provided"}`, exit 1
//!
//! The gateway reuses the same shapes for `POST /llama/query`.

use serde::{Deserialize, Serialize};
use swasya_common::{ConsultationQueryEngine, Result};

pub const NO_QUESTION: &str = "No question provided";

const ENCODE_FAILURE: &str = r#"{"success":false,"error":"failed to encode response"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn answered(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            question: Some(question.into()),
            answer: Some(answer.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            question: None,
            answer: None,
            error: Some(error.into()),
        }
    }

    /// Carries no `success` key
    pub fn no_question() -> Self {
        Self {
            success: None,
            question: None,
            answer: None,
            error: Some(NO_QUESTION.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Compact single-line JSON
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| ENCODE_FAILURE.to_string())
    }
}

/// Answer one question, converting every failure into a failure envelope
pub async fn run_single_shot<F>(question: Option<String>, make_engine: F) -> Envelope
where
    F: FnOnce() -> Result<ConsultationQueryEngine>,
{
    let Some(question) = question else {
        return Envelope::no_question();
    };

    match answer(&question, make_engine).await {
        Ok(answer) => Envelope::answered(question, answer),
        Err(e) => {
            tracing::error!(error = %e, code = ?e.code(), "Query failed");
            Envelope::failed(e.to_string())
        }
    }
}

async fn answer<F>(question: &str, make_engine: F) -> Result<String>
where
    F: FnOnce() -> Result<ConsultationQueryEngine>,
{
    let engine = make_engine()?;
    engine.load_index().await?;
    engine.query(question).await
}
