//! Answer synthesis over retrieved consultation context
//!
//! - Intent detection for incoming questions
//! - Per-patient parsing of retrieved chunk text
//! - Generative and heuristic answer strategies

mod query_parser;
mod record_parser;
mod synthesizer;

pub use query_parser::{detect_intent, QueryIntent};
pub use record_parser::{parse_patients, ParsedPatient};
pub use synthesizer::{
    AnswerStrategy, AnswerSynthesizer, BackendKind, GenerativeSynthesizer, HeuristicSynthesizer,
    EMPTY_RESPONSE,
};
