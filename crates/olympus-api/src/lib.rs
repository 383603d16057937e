//! # olympus-api: Axum API Service
//!
//! HTTP surface of the Olympus case workflow.
//!
//! ## API Surface
//!
//! | Prefix                     | Module                 | Domain                  |
//! |----------------------------|------------------------|-------------------------|
//! | `/v1/cases/*`              | [`routes::cases`]      | Cases, steps, history   |
//! | `/v1/cases/*/documents`    | [`routes::documents`]  | Document attachment     |
//! | `/v1/documents/*/sign`     | [`routes::documents`]  | Document signing        |
//! | `/v1/templates`            | [`routes::templates`]  | Workflow templates      |
//! | `/health/*`                | this module            | Liveness and readiness  |
//! | `/openapi.json`            | [`openapi`]            | OpenAPI document        |
//!
//! Handlers only translate between HTTP and
//! [`olympus_workflow::CaseService`]; every rule lives below this crate.
//! All errors map to structured HTTP responses via [`AppError`].

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Request body limit: base64 of the largest document plus JSON framing.
const BODY_LIMIT: usize = routes::documents::MAX_DOCUMENT_BYTES / 3 * 4 + 64 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::cases::router())
        .merge(routes::documents::router())
        .merge(routes::templates::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new()
        .merge(health)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" when the case store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Case store health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "case store unreachable").into_response()
        }
    }
}
