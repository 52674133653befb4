// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon HTTP server implementation
//!
//! Exposes the pattern memory runtime over a small JSON API. Every error
//! body has the shape `{"error": {"kind", "message", "retryable"}}`.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pattern_memory_cortex::application::query_service::DEFAULT_QUERY_LIMIT;
use pattern_memory_cortex::application::{CortexRuntime, Learner};
use pattern_memory_cortex::domain::config::PatternMemoryConfig;
use pattern_memory_cortex::{CortexError, Outcome, TaskResult};

use super::scheduler::{DecayScheduler, DecaySchedulerConfig};
use super::{remove_pid_file, write_pid_file};

/// Message returned by `/api/learn` when a backend is down
pub const LEARNING_DISABLED_MESSAGE: &str = "learning disabled, pattern not recorded";

pub async fn start_daemon(config_path: Option<PathBuf>, host: String, port: u16) -> Result<()> {
    let pid = std::process::id();
    write_pid_file(pid)?;
    let _guard = PidFileGuard;

    info!("Pattern memory daemon starting (PID: {})", pid);

    let config = PatternMemoryConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let metrics = if config.spec.observability.metrics_enabled {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let runtime = CortexRuntime::from_config(&config)
        .await
        .context("Failed to initialize pattern memory")?;

    let shutdown = CancellationToken::new();
    let scheduler = Arc::new(DecayScheduler::new(
        runtime.decay.clone(),
        DecaySchedulerConfig::from(&config.spec.decay),
        shutdown.child_token(),
    ));
    let scheduler_handle = scheduler.start();

    let mut state = AppState::new(runtime).with_shutdown(shutdown.clone());
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Daemon listening on {}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    if let Err(e) = scheduler_handle.await {
        warn!("Decay scheduler task failed: {}", e);
    }

    info!("Daemon shutting down");
    Ok(())
}

struct PidFileGuard;

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = remove_pid_file();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

// Application state
#[derive(Clone)]
pub struct AppState {
    runtime: CortexRuntime,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(runtime: CortexRuntime) -> Self {
        Self {
            runtime,
            start_time: Instant::now(),
            metrics: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// In-flight learn requests are cancelled when this token fires
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/learn", post(learn_handler))
        .route("/api/best-practices", get(best_practices_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/decay", post(decay_handler))
        .route("/api/links", post(link_handler))
        .route("/api/patterns/{name}", get(get_pattern_handler))
        .route("/api/patterns/{name}/remedies", get(remedies_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// JSON error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                kind: "invalid_argument".to_string(),
                message: message.into(),
                retryable: false,
            },
        }
    }

    /// Learning failures replace backend detail with a fixed message on unavailability
    fn learning(err: CortexError) -> Self {
        let mut api = Self::from(err);
        if api.status == StatusCode::SERVICE_UNAVAILABLE {
            api.body.message = LEARNING_DISABLED_MESSAGE.to_string();
        }
        api
    }
}

pub fn status_for(err: &CortexError) -> StatusCode {
    match err {
        CortexError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CortexError::PatternNotFound(_) => StatusCode::NOT_FOUND,
        CortexError::InvalidLinkDirection { .. } | CortexError::ClassificationConflict { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CortexError::ClassificationUnavailable(_) | CortexError::StoreUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CortexError::ClassificationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        // Client closed request
        CortexError::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT),
    }
}

impl From<CortexError> for ApiError {
    fn from(err: CortexError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!(
            "pmem_http_errors_total",
            "status" => self.status.as_u16().to_string(),
            "kind" => self.body.kind.clone()
        )
        .increment(1);
        if self.status.is_server_error() {
            warn!(status = %self.status, kind = %self.body.kind, message = %self.body.message, "Request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.body }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "strategy": state.runtime.classifier.strategy_name(),
    }))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

async fn learn_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TaskResult>, JsonRejection>,
) -> ApiResult<pattern_memory_cortex::application::LearnOutcome> {
    let Json(result) = payload?;
    let cancel = state.shutdown.child_token();
    let outcome = state
        .runtime
        .learning
        .learn_from_result_with_cancel(&result, &cancel)
        .await
        .map_err(ApiError::learning)?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BestPracticesParams {
    pub domain: Option<String>,
    pub classification: Option<String>,
    pub limit: Option<usize>,
}

async fn best_practices_handler(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<BestPracticesParams>, QueryRejection>,
) -> ApiResult<Vec<pattern_memory_cortex::Pattern>> {
    let Query(params) = params?;
    let classification = match params.classification.as_deref() {
        Some(raw) => raw.parse::<Outcome>()?,
        None => Outcome::Success,
    };
    let patterns = state
        .runtime
        .query
        .get_best_practices(
            params.domain.as_deref(),
            classification,
            params.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
        )
        .await?;
    Ok(Json(patterns))
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<pattern_memory_cortex::StoreStats> {
    Ok(Json(state.runtime.query.get_stats().await?))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DecayRequest {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(default, with = "humantime_serde")]
    pub decay_after: Option<Duration>,
}

async fn decay_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<pattern_memory_cortex::application::DecayReport> {
    let request: DecayRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DecayRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid decay request: {}", e)))?
    };

    let decay_after = request
        .decay_after
        .unwrap_or(state.runtime.config.spec.decay.decay_after);
    let report = state
        .runtime
        .decay
        .decay(request.now.unwrap_or_else(Utc::now), decay_after)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkRequest {
    pub success: String,
    pub failure: String,
    #[serde(default)]
    pub reinforcement: Option<f64>,
}

async fn link_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LinkRequest>, JsonRejection>,
) -> ApiResult<pattern_memory_cortex::Link> {
    let Json(request) = payload?;
    let links = &state.runtime.links;
    let reinforcement = request.reinforcement.unwrap_or_else(|| links.default_reinforcement());
    let link = links.link(&request.success, &request.failure, reinforcement).await?;
    Ok(Json(link))
}

async fn get_pattern_handler(
    State(state): State<Arc<AppState>>,
    name: std::result::Result<Path<String>, PathRejection>,
) -> ApiResult<pattern_memory_cortex::Pattern> {
    let Path(name) = name?;
    Ok(Json(state.runtime.query.get_pattern(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemediesParams {
    pub limit: Option<usize>,
}

async fn remedies_handler(
    State(state): State<Arc<AppState>>,
    name: std::result::Result<Path<String>, PathRejection>,
    params: std::result::Result<Query<RemediesParams>, QueryRejection>,
) -> ApiResult<Vec<pattern_memory_cortex::application::Remedy>> {
    let Path(name) = name?;
    let Query(params) = params?;
    let remedies = state
        .runtime
        .query
        .get_remedies(&name, params.limit.unwrap_or(DEFAULT_QUERY_LIMIT))
        .await?;
    Ok(Json(remedies))
}
