use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::pipeline::{AgentReport, AgentRole, AnalyzeRequest, Pipeline, Services};
use crate::stress_test::{StressTestEngine, StressTestRequest};
use crate::tts::AUDIO_URL_PREFIX;

pub type AppState = Arc<Services>;

type ErrorResponse = (StatusCode, Json<Value>);

pub fn create_router(services: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let audio = ServeDir::new(services.config.audio_dir());

    Router::new()
        .route("/health", get(handle_health_check))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/stress-test", post(handle_stress_test))
        .nest_service(AUDIO_URL_PREFIX, audio)
        .layer(cors)
        .with_state(services)
}

fn error_response(status: StatusCode, msg: &str) -> ErrorResponse {
    (status, Json(json!({ "error": msg })))
}

fn agent_offline(reason: &str) -> ErrorResponse {
    let report = AgentReport {
        title: "Agent Offline".to_string(),
        content: format!("Agent Offline: {reason}"),
        confidence: 0,
        data_points: vec!["System Error".to_string()],
        structured_data: None,
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::to_value(report).unwrap_or_else(|_| json!({ "error": "Agent Offline" }))),
    )
}

fn stress_error(status: StatusCode, message: &str) -> ErrorResponse {
    (status, Json(json!({ "status": "error", "message": message })))
}

/// Runs blocking work on the blocking pool under an outer wall-clock budget.
/// The worker is not aborted on timeout; only the caller stops waiting.
async fn run_blocking<T, F>(budget: Duration, work: F) -> Result<T, String>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(err))) => Err(format!("{err:#}")),
        Ok(Err(join)) => Err(format!("worker failed: {join}")),
        Err(_) => Err(format!("timed out after {}s", budget.as_secs())),
    }
}

async fn handle_health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

async fn handle_analyze(
    State(services): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AgentReport>, ErrorResponse> {
    let Some(role) = AgentRole::parse(&req.agent) else {
        warn!(agent = %req.agent, "analyze: unknown agent");
        return Err(error_response(StatusCode::BAD_REQUEST, "Invalid Agent"));
    };

    let budget = services.config.request_timeout;
    let worker = services.clone();
    let result = run_blocking(budget, move || Pipeline::new(&worker).analyze(&req, role)).await;
    match result {
        Ok(report) => {
            info!(agent = ?role, confidence = report.confidence, "analyze: done");
            Ok(Json(report))
        }
        Err(reason) => {
            error!(agent = ?role, reason = %reason, "analyze failed");
            Err(agent_offline(&reason))
        }
    }
}

async fn handle_stress_test(
    State(services): State<AppState>,
    Json(req): Json<StressTestRequest>,
) -> Result<Json<Value>, ErrorResponse> {
    if !req.has_required_fields() {
        return Err(stress_error(StatusCode::BAD_REQUEST, "Missing required fields"));
    }

    let budget = services.config.request_timeout;
    let worker = services.clone();
    let result = run_blocking(budget, move || {
        let speech = worker.speech.as_deref();
        StressTestEngine::new(
            worker.model.as_ref(),
            &worker.config.model.script_model,
            speech,
            &worker.voices,
            &worker.stress_store,
        )
        .run(&req)
    })
    .await;

    match result {
        Ok(record) => {
            info!(prop_id = %record.prop_id, post_score = record.post_score, "stress test: done");
            Ok(Json(json!({ "status": "success", "data": record })))
        }
        Err(reason) => {
            error!(reason = %reason, "stress test failed");
            Err(stress_error(StatusCode::INTERNAL_SERVER_ERROR, &reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_surfaces_as_error() {
        let result: Result<(), String> = run_blocking(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().starts_with("timed out"));
    }

    #[tokio::test]
    async fn worker_panic_is_caught() {
        let result: Result<(), String> =
            run_blocking(Duration::from_secs(5), || -> anyhow::Result<()> { panic!("boom") }).await;
        assert!(result.unwrap_err().starts_with("worker failed"));
    }

    #[test]
    fn offline_envelope_is_a_zero_confidence_report() {
        let (status, Json(body)) = agent_offline("upstream down");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["title"], "Agent Offline");
        assert_eq!(body["confidence"], 0);
        assert_eq!(body["dataPoints"][0], "System Error");
    }
}
