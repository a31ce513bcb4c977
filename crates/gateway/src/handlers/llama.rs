//! Question answering handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use swasya_common::{errors::AppError, EXAMPLE_QUESTIONS};
use swasya_query::Envelope;

/// Question request
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct ExamplesResponse {
    pub examples: &'static [&'static str],
}

fn question_required() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Question is required" }))).into_response()
}

/// Answer one question
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let Ok(Json(request)) = payload else {
        return question_required();
    };

    if let Err(e) = request.validate() {
        return AppError::Validation {
            message: e.to_string(),
            field: Some("question".to_string()),
        }
        .into_response();
    }

    let Some(question) = request.question.filter(|q| !q.trim().is_empty()) else {
        return question_required();
    };

    match state.engine.query(&question).await {
        Ok(answer) => {
            tracing::info!(
                latency_ms = start.elapsed().as_millis() as u64,
                "Question answered"
            );
            Json(Envelope::answered(question, answer)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, code = ?e.code(), "Question failed");
            let body = Json(Envelope::failed(e.to_string()));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

/// Example questions for clients
pub async fn examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: EXAMPLE_QUESTIONS,
    })
}
