//! HTTP surface: `GET /health` and `POST /generate-speech`, open to the local
//! web frontend through CORS.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use empathy_engine_core::pipeline::{Pipeline, PipelineError};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{error, info, warn};

const INVALID_TEXT: &str = "'text' must be a non-empty string";

const FRONTEND_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Clone)]
struct ApiState {
    pipeline: Arc<Pipeline>,
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/generate-speech", post(generate_speech_handler))
        .with_state(ApiState {
            pipeline: Arc::new(pipeline),
        })
        .layer(frontend_cors())
}

/// Credentialed requests from the frontend origins only. Methods and headers
/// are mirrored since wildcards are not allowed alongside credentials.
fn frontend_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(FRONTEND_ORIGINS.map(HeaderValue::from_static))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn serve(pipeline: Pipeline, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, router(pipeline))
        .await
        .context("http server failed")
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_speech_handler(State(state): State<ApiState>, body: Bytes) -> Response {
    let Some(text) = requested_text(&body) else {
        warn!("rejected generate-speech request without usable text");
        return detail(StatusCode::BAD_REQUEST, INVALID_TEXT);
    };

    let artifact = match state.pipeline.run(&text).await {
        Ok(artifact) => artifact,
        Err(PipelineError::InvalidInput(_)) => return detail(StatusCode::BAD_REQUEST, INVALID_TEXT),
        Err(e) => return failure(&e),
    };

    let audio = match tokio::fs::read(&artifact.output_path).await {
        Ok(audio) => audio,
        Err(e) => return failure(&e),
    };
    let file_name = artifact.file_name().unwrap_or("speech.wav");

    (
        [
            (header::CONTENT_TYPE, "audio/wav".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        audio,
    )
        .into_response()
}

/// `text` from a JSON body; absent, non-string or blank values are rejected.
fn requested_text(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let text = value.get("text")?.as_str()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(text.to_owned())
}

fn failure(e: &dyn std::fmt::Display) -> Response {
    error!(error = %e, "speech generation failed");
    detail(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("Failed to generate speech: {e}"),
    )
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}
