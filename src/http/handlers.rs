//! Aux HTTP handlers and router.
//!
//! # Routes
//! - `GET /status`: liveness document
//! - `GET /metrics`: Prometheus exposition of process and request metrics
//!
//! Anything else gets a JSON 404. A panicking handler gets a JSON 500 and
//! the server keeps serving.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::observability::{MetricsRegistry, ProcessMetrics};

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AuxState {
    pub process: Arc<ProcessMetrics>,
    pub metrics: Arc<MetricsRegistry>,
    pub instance_id: Uuid,
    pub started: Instant,
}

impl AuxState {
    pub fn new(process: Arc<ProcessMetrics>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            process,
            metrics,
            instance_id: Uuid::new_v4(),
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub instance_id: Uuid,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

pub async fn get_status(State(state): State<AuxState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instance_id: state.instance_id,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn get_metrics(State(state): State<AuxState>) -> impl IntoResponse {
    match state.process.collect() {
        Some(snapshot) => state.metrics.record_process(&snapshot),
        None => tracing::warn!("Process metrics unavailable"),
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not found" })).into_response()
}

/// Turns a handler panic into a JSON 500.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error",
        }),
    )
        .into_response()
}

/// Counts matched requests by route template and status.
async fn count_requests(State(state): State<AuxState>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());

    let response = next.run(request).await;
    if let Some(path) = path {
        state.metrics.record_request(&path, response.status().as_u16());
    }
    response
}

/// Build the aux router with request-id, tracing and panic layers.
pub fn build_router(state: AuxState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
