// Copyright 2026 Quarry Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP extraction server.
//!
//! A thin axum layer over the dispatcher: handlers validate the request,
//! submit the job, and block on its completion. Error bodies are always
//! `{"error": "..."}` with the matching status code.

use crate::dispatch::ExtractorHandle;
use crate::error::SubmitError;
use crate::job::ExtractMode;
use crate::pdf;
use anyhow::Context;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared state for request handlers.
pub struct AppState {
    pub extractor: ExtractorHandle,
    /// Bearer token required on every route except `/health`. `None`
    /// disables auth.
    pub api_key: Option<String>,
    pub started_at: Instant,
}

/// Build the router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/extract", post(extract))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until SIGINT/SIGTERM, then drain the dispatcher.
///
/// In-flight requests finish first (each is bounded by the submit wait),
/// then the shutdown sentinel goes in and the dispatcher releases the
/// engine before this returns.
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    dispatcher: JoinHandle<()>,
) -> anyhow::Result<()> {
    let app = router(Arc::clone(&state));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr().context("failed to read local addr")?;

    info!("listening on http://{local}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down...");
    state.extractor.shutdown();
    dispatcher.await.context("dispatcher task panicked")?;
    info!("shutdown complete");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "queue_depth": state.extractor.queue_depth(),
    }))
    .into_response()
}

async fn extract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(resp) = check_auth(&state, &headers) {
        return resp;
    }
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty body");
    }
    let parsed: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid JSON"),
    };
    let url = parsed
        .get("url")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "url is required");
    }

    // Explicit "pdf" wins; otherwise the suffix fast path decides. The
    // HEAD probe is deliberately not used here so page requests never pay
    // an extra round trip.
    let mode = match parsed.get("pdf").and_then(|v| v.as_bool()) {
        Some(true) => ExtractMode::Pdf,
        Some(false) => ExtractMode::Page,
        None => {
            if pdf::has_pdf_suffix(&url) {
                ExtractMode::Pdf
            } else {
                ExtractMode::Page
            }
        }
    };

    info!(
        "extract request: {url} (pdf={})",
        matches!(mode, ExtractMode::Pdf)
    );

    match state.extractor.submit(&url, mode).await {
        Ok(result) => Json(result).into_response(),
        Err(e @ SubmitError::Timeout) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, &e.to_string())
        }
        Err(e @ SubmitError::WorkerGone) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn not_found(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(resp) = check_auth(&state, &headers) {
        return resp;
    }
    error_response(StatusCode::NOT_FOUND, "not found")
}

// ── Helpers ─────────────────────────────────────────────────────

/// Bearer-token check. `None` means authorized.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    let key = match &state.api_key {
        Some(k) if !k.is_empty() => k,
        _ => return None,
    };
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    match auth.strip_prefix("Bearer ") {
        Some(token) if token.trim() == key => None,
        _ => Some(error_response(StatusCode::UNAUTHORIZED, "unauthorized")),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
