//! Swasya Gateway
//!
//! HTTP entry point for consultation questions.
//! Handles:
//! - Question answering and example questions
//! - Liveness and readiness probes
//! - Observability (logging, request metrics, Prometheus exporter)

mod handlers;
mod middleware;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use swasya_common::{
    config::AppConfig,
    metrics::{self, EMBEDDING_BUCKETS, LATENCY_BUCKETS},
    telemetry::{self, LogSink},
    ConsultationQueryEngine,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConsultationQueryEngine>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    telemetry::init_tracing(&config.observability, LogSink::Stdout);

    info!("Starting Swasya Gateway v{}", swasya_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::new(
            config.server.host.parse()?,
            config.observability.metrics_port,
        );
        let suffix = |name: &str| Matcher::Suffix(name.to_string());
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(suffix("request_duration_seconds"), LATENCY_BUCKETS)?
            .set_buckets_for_metric(suffix("query_duration_seconds"), LATENCY_BUCKETS)?
            .set_buckets_for_metric(suffix("embedding_duration_seconds"), EMBEDDING_BUCKETS)?
            .set_buckets_for_metric(suffix("index_build_duration_seconds"), EMBEDDING_BUCKETS)?
            .install()?;
        info!("Prometheus exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let engine = ConsultationQueryEngine::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to configure query engine");
        e
    })?;

    // Warm the index; a failure here is retried on the first question
    if let Err(e) = engine.load_index().await {
        warn!(error = %e, "Index not ready at startup");
    }

    let state = AppState {
        engine: Arc::new(engine),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let llama_routes = Router::new()
        .route("/query", post(handlers::llama::query))
        .route("/examples", get(handlers::llama::examples));

    // Compose the app; `/api/llama` is kept for existing frontends
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/llama", llama_routes.clone())
        .nest("/api/llama", llama_routes)
        .route_layer(from_fn(middleware::metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use swasya_common::db::InMemoryRecordSource;
    use tower::ServiceExt;

    fn test_config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.index.persist_dir = dir.join("llama_index_storage");
        config.store.url = "postgres://swasya@127.0.0.1:1/swasya".to_string();
        config.store.connect_timeout_secs = 2;
        config
    }

    fn app_with_records(dir: &std::path::Path) -> Router {
        let source = Arc::new(InMemoryRecordSource::default());
        let engine = ConsultationQueryEngine::new(&test_config(dir), source).unwrap();
        create_router(AppState { engine: Arc::new(engine) })
    }

    fn app_with_unreachable_store(dir: &std::path::Path) -> Router {
        let engine = ConsultationQueryEngine::from_config(&test_config(dir)).unwrap();
        create_router(AppState { engine: Arc::new(engine) })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_question_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();

        for body in ["{}", r#"{"question": "   "}"#, r#"{"question": null}"#, "not json"] {
            let response = app_with_records(dir.path())
                .oneshot(post_json("/llama/query", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(json_body(response).await, json!({ "error": "Question is required" }));
        }
    }

    #[tokio::test]
    async fn test_question_answered() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_records(dir.path())
            .oneshot(post_json("/llama/query", r#"{"question": "Summarize recent consultations"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "question": "Summarize recent consultations",
                "answer": "Found 0 relevant consultation(s). Summary:\n"
            })
        );
    }

    #[tokio::test]
    async fn test_legacy_prefix_routes() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_records(dir.path())
            .oneshot(post_json(
                "/api/llama/query",
                r#"{"question": "What medications were prescribed?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_engine_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_unreachable_store(dir.path())
            .oneshot(post_json("/llama/query", r#"{"question": "List all patients with fever"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_overlong_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({ "question": "a".repeat(2001) }).to_string();
        let response = app_with_records(dir.path())
            .oneshot(post_json("/llama/query", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_examples() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_records(dir.path())
            .oneshot(Request::builder().uri("/llama/examples").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["examples"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["examples"][2], json!("Show me consultations for AKASH"));
    }

    #[tokio::test]
    async fn test_probes() {
        let dir = tempfile::tempdir().unwrap();

        let response = app_with_records(dir.path())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["backend"], json!("heuristic"));

        let response = app_with_records(dir.path())
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], json!("ready"));

        let response = app_with_unreachable_store(dir.path())
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], json!("not_ready"));
        assert_eq!(body["checks"]["store"]["status"], json!("down"));
    }
}
