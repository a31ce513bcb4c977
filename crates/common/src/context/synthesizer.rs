//! Answer Synthesizer - turns retrieved context into an answer
//!
//! Two strategies sit behind [`AnswerStrategy`]:
//! - Generative: a hosted chat model answers from a QA prompt built over the
//!   retrieved chunks (OpenAI chat completions or Anthropic messages)
//! - Heuristic: per-patient fields are parsed out of the context and a
//!   templated answer is picked by question intent
//!
//! [`AnswerSynthesizer::from_config`] picks the strategy once, at
//! construction, from [`LlmConfig::backend_kind`].

use super::query_parser::{detect_intent, QueryIntent};
use super::record_parser::{parse_patients, ParsedPatient};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::index::RetrievedContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Answer returned by the generative path when nothing was retrieved
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Patients listed in a general summary
const SUMMARY_LIMIT: usize = 3;

/// Characters of transcript shown per summary line
const TRANSCRIPT_PREVIEW_CHARS: usize = 100;

/// Which synthesis strategy answers questions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Generative,
    Heuristic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Generative => "generative",
            BackendKind::Heuristic => "heuristic",
        }
    }
}

/// A way of answering a question from retrieved context
#[async_trait]
pub trait AnswerStrategy: Send + Sync {
    async fn answer(&self, context: &RetrievedContext, question: &str) -> Result<String>;

    fn kind(&self) -> BackendKind;
}

/// Template answers from parsed patient records
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSynthesizer;

impl HeuristicSynthesizer {
    /// Classify the question and render the matching template
    pub fn compose(&self, context: &str, question: &str) -> (QueryIntent, String) {
        let patients = parse_patients(context);
        let intent = detect_intent(question, &patients);
        let n = patients.len();

        let answer = match intent {
            QueryIntent::SymptomReport => {
                let lines: Vec<String> = patients
                    .iter()
                    .filter_map(|p| p.transcript.as_ref().map(|t| format!("{}: {}", p.name, t)))
                    .collect();
                format!("Found {} patient(s) with symptoms:\n{}", n, lines.join("\n"))
            }
            QueryIntent::PrescriptionPointer => format!(
                "Found {} consultation(s). Check prescriptions in the context above.",
                n
            ),
            QueryIntent::NamedPatient => format!(
                "Found {} consultation(s) for the requested patient(s). Details shown above.",
                n
            ),
            QueryIntent::GeneralSummary => {
                let lines: Vec<String> = patients
                    .iter()
                    .take(SUMMARY_LIMIT)
                    .map(summary_line)
                    .collect();
                format!("Found {} relevant consultation(s). Summary:\n{}", n, lines.join("\n"))
            }
        };

        (intent, answer)
    }
}

fn summary_line(patient: &ParsedPatient) -> String {
    let age = patient.age.as_deref().unwrap_or("N/A");
    let details: String = match &patient.transcript {
        Some(t) => t.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect(),
        None => "No details".to_string(),
    };
    format!("- {} (Age {}): {}", patient.name, age, details)
}

#[async_trait]
impl AnswerStrategy for HeuristicSynthesizer {
    async fn answer(&self, context: &RetrievedContext, question: &str) -> Result<String> {
        let (intent, answer) = self.compose(&context.text(), question);
        tracing::debug!(
            intent = intent.as_str(),
            chunks = context.len(),
            "Heuristic answer composed"
        );
        Ok(answer)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Heuristic
    }
}

/// Hosted chat providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
        }
    }
}

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Question answering through a hosted chat model
pub struct GenerativeSynthesizer {
    provider: Provider,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    client: reqwest::Client,
}

impl GenerativeSynthesizer {
    /// Create a new synthesizer
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "openai" => Provider::OpenAI,
            "anthropic" => Provider::Anthropic,
            other => {
                return Err(AppError::Configuration {
                    message: format!("Unsupported generative provider: {}", other),
                })
            }
        };

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: format!("{} provider requires llm.api_key", config.provider),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| provider.default_endpoint().to_string()),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }

    /// Build the question-answering prompt
    pub fn build_prompt(context: &str, question: &str) -> String {
        format!(
            "Context information is below.\n\
             ---------------------\n\
             {}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {}\n\
             Answer: ",
            context, question
        )
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        match self.provider {
            Provider::OpenAI => self.call_openai(prompt).await,
            Provider::Anthropic => self.call_anthropic(prompt).await,
        }
    }

    async fn call_openai(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: usize,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessageResponse,
        }

        #[derive(Deserialize)]
        struct ChatMessageResponse {
            content: Option<String>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LlmError {
                message: format!("LLM API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LlmError {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse LLM response: {}", e),
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from LLM".to_string(),
            })
    }

    async fn call_anthropic(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct MessagesRequest<'a> {
            model: &'a str,
            max_tokens: usize,
            temperature: f32,
            messages: Vec<Message<'a>>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            text: String,
        }

        #[derive(Deserialize)]
        struct MessagesResponse {
            content: Vec<ContentBlock>,
        }

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LlmError {
                message: format!("LLM API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LlmError {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse LLM response: {}", e),
        })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(AppError::LlmError {
                message: "Empty response from LLM".to_string(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl AnswerStrategy for GenerativeSynthesizer {
    async fn answer(&self, context: &RetrievedContext, question: &str) -> Result<String> {
        if context.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let prompt = Self::build_prompt(&context.text(), question);
        let answer = self.call_llm(&prompt).await?;
        tracing::debug!(model = %self.model, chunks = context.len(), "Generative answer received");
        Ok(answer)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Generative
    }
}

/// Strategy selected for an engine's lifetime
pub struct AnswerSynthesizer {
    strategy: Box<dyn AnswerStrategy>,
}

impl AnswerSynthesizer {
    /// Pick the strategy the configuration selects
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        match config.backend_kind() {
            BackendKind::Generative => {
                let generative = GenerativeSynthesizer::new(config)?;
                Ok(Self::with_strategy(Box::new(generative)))
            }
            BackendKind::Heuristic => Ok(Self::heuristic()),
        }
    }

    pub fn heuristic() -> Self {
        Self::with_strategy(Box::new(HeuristicSynthesizer))
    }

    pub fn with_strategy(strategy: Box<dyn AnswerStrategy>) -> Self {
        Self { strategy }
    }

    pub fn kind(&self) -> BackendKind {
        self.strategy.kind()
    }

    /// Answer a question from retrieved context
    pub async fn answer(&self, context: &RetrievedContext, question: &str) -> Result<String> {
        self.strategy.answer(context, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentMetadata;
    use crate::index::RetrievedChunk;
    use uuid::Uuid;

    const ASHA: &str = "Patient: Asha Verma\nUHID: MED1\nAge: 34\nGender: F\n\
                        Date: 2024-03-01 10:00:00\n\
                        Transcript: fever and headache for two days\nSummary: viral fever\n\
                        Prescriptions: {}\nDoctor Notes: rest";
    const RAJESH: &str = "Patient: Rajesh Kumar\nUHID: MED2\nAge: 45\nGender: M\n\
                          Date: 2024-03-02 11:00:00\n\
                          Transcript: dry cough at night\nSummary: bronchitis\n\
                          Prescriptions: {}\nDoctor Notes: N/A";

    fn context(texts: &[&str]) -> RetrievedContext {
        RetrievedContext {
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, t)| RetrievedChunk {
                    node_id: Uuid::new_v4(),
                    document_id: format!("c{}", i),
                    content: t.to_string(),
                    metadata: DocumentMetadata::default(),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_symptom_report_lists_transcripts() {
        let synth = AnswerSynthesizer::heuristic();
        let answer = synth
            .answer(&context(&[ASHA, RAJESH]), "What are the common symptoms?")
            .await
            .unwrap();
        assert_eq!(
            answer,
            "Found 2 patient(s) with symptoms:\n\
             Asha Verma: fever and headache for two days\n\
             Rajesh Kumar: dry cough at night"
        );
    }

    #[test]
    fn test_symptom_report_skips_records_without_transcript() {
        let context = "Patient: A\nPatient: B\nTranscript: itch";
        let (_, answer) = HeuristicSynthesizer.compose(context, "any complaint?");
        assert_eq!(answer, "Found 2 patient(s) with symptoms:\nB: itch");
    }

    #[test]
    fn test_symptom_wins_over_medication() {
        let (intent, answer) =
            HeuristicSynthesizer.compose(ASHA, "Which medication eased the symptom?");
        assert_eq!(intent, QueryIntent::SymptomReport);
        assert!(answer.starts_with("Found 1 patient(s) with symptoms:"));
    }

    #[test]
    fn test_prescription_pointer() {
        let context = [ASHA, RAJESH].join("\n\n");
        let (_, answer) =
            HeuristicSynthesizer.compose(&context, "What medications were prescribed?");
        assert_eq!(
            answer,
            "Found 2 consultation(s). Check prescriptions in the context above."
        );
    }

    #[test]
    fn test_named_patient() {
        let (intent, answer) =
            HeuristicSynthesizer.compose(RAJESH, "Show the patient Rajesh Kumar");
        assert_eq!(intent, QueryIntent::NamedPatient);
        assert_eq!(
            answer,
            "Found 1 consultation(s) for the requested patient(s). Details shown above."
        );
    }

    #[test]
    fn test_general_summary_truncates_transcript() {
        let long = "x".repeat(150);
        let context = format!("Patient: Meena\nTranscript: {}", long);
        let (_, answer) = HeuristicSynthesizer.compose(&context, "Summarize recent consultations");
        assert_eq!(
            answer,
            format!(
                "Found 1 relevant consultation(s). Summary:\n- Meena (Age N/A): {}",
                "x".repeat(100)
            )
        );
    }

    #[test]
    fn test_general_summary_caps_lines_and_fills_defaults() {
        let context = "Patient: A\nAge: 1\nTranscript: a\n\
                       Patient: B\nPatient: C\nPatient: D\nTranscript: d";
        let (_, answer) = HeuristicSynthesizer.compose(context, "Overview please");
        assert_eq!(
            answer,
            "Found 4 relevant consultation(s). Summary:\n\
             - A (Age 1): a\n\
             - B (Age N/A): No details\n\
             - C (Age N/A): No details"
        );
    }

    #[test]
    fn test_truncation_counts_characters() {
        let transcript = "é".repeat(120);
        let line = summary_line(&ParsedPatient {
            name: "Zoya".into(),
            transcript: Some(transcript),
            ..ParsedPatient::default()
        });
        assert_eq!(line, format!("- Zoya (Age N/A): {}", "é".repeat(100)));
    }

    #[test]
    fn test_transcript_at_preview_limit_is_kept_whole() {
        let line = summary_line(&ParsedPatient {
            name: "Ira".into(),
            transcript: Some("y".repeat(100)),
            ..ParsedPatient::default()
        });
        assert_eq!(line, format!("- Ira (Age N/A): {}", "y".repeat(100)));
    }

    #[test]
    fn test_transcript_one_past_preview_limit_is_cut() {
        let transcript = format!("{}z", "y".repeat(100));
        let line = summary_line(&ParsedPatient {
            name: "Ira".into(),
            transcript: Some(transcript),
            ..ParsedPatient::default()
        });
        assert_eq!(line, format!("- Ira (Age N/A): {}", "y".repeat(100)));
        assert!(!line.ends_with('z'));
    }

    #[test]
    fn test_bare_patient_label_keeps_empty_name() {
        let context = "Patient:\nAge: 3\nTranscript: rash";
        let (_, summary) = HeuristicSynthesizer.compose(context, "Overview please");
        assert_eq!(summary, "Found 1 relevant consultation(s). Summary:\n-  (Age 3): rash");

        let (_, symptoms) = HeuristicSynthesizer.compose(context, "Any symptoms?");
        assert_eq!(symptoms, "Found 1 patient(s) with symptoms:\n: rash");
    }

    #[tokio::test]
    async fn test_empty_context_degrades() {
        let synth = AnswerSynthesizer::heuristic();
        let answer = synth
            .answer(&RetrievedContext::default(), "Summarize recent consultations")
            .await
            .unwrap();
        assert_eq!(answer, "Found 0 relevant consultation(s). Summary:\n");
    }

    #[test]
    fn test_from_config_selects_strategy() {
        let heuristic = AnswerSynthesizer::from_config(&LlmConfig::default()).unwrap();
        assert_eq!(heuristic.kind(), BackendKind::Heuristic);

        let config = LlmConfig {
            provider: "anthropic".into(),
            api_key: Some("key".into()),
            ..LlmConfig::default()
        };
        let generative = AnswerSynthesizer::from_config(&config).unwrap();
        assert_eq!(generative.kind(), BackendKind::Generative);
    }

    #[tokio::test]
    async fn test_generative_skips_call_without_context() {
        let config = LlmConfig {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            endpoint: Some("http://127.0.0.1:1/v1/chat/completions".into()),
            ..LlmConfig::default()
        };
        let synth = GenerativeSynthesizer::new(&config).unwrap();
        let answer = synth.answer(&RetrievedContext::default(), "anything").await.unwrap();
        assert_eq!(answer, EMPTY_RESPONSE);
    }

    #[tokio::test]
    async fn test_generative_failure_is_llm_error() {
        let config = LlmConfig {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            endpoint: Some("http://127.0.0.1:1/v1/chat/completions".into()),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let synth = GenerativeSynthesizer::new(&config).unwrap();
        let err = synth.answer(&context(&[ASHA]), "What symptoms?").await.unwrap_err();
        assert!(matches!(err, AppError::LlmError { .. }));
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = GenerativeSynthesizer::build_prompt("Patient: A", "Who?");
        assert_eq!(
            prompt,
            "Context information is below.\n---------------------\n\
             Patient: A\n---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: Who?\nAnswer: "
        );
    }
}
