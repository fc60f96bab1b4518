//! aiac-web library - App Inventor archive inspection and simulated compile
//!
//! Exposes the router and the building blocks used by the binary and by
//! integration tests.

use std::sync::Arc;

use aiac_common::config::ServiceConfig;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod controller;
pub mod error;
pub mod inspector;
pub mod simulator;

pub use crate::error::{ApiError, ApiResult};

use simulator::{Clock, PacedClock};

/// Application state shared across HTTP handlers
///
/// Holds only immutable configuration; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    /// Paces the simulated compile stages on the server
    pub clock: Arc<dyn Clock>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state with the clock the config asks for
    pub fn new(config: ServiceConfig) -> Self {
        let clock = Arc::new(PacedClock::new(config.progress_pacing));
        Self::with_clock(config, clock)
    }

    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
            started_at: aiac_common::time::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::upload_routes(max_upload_bytes))
        .merge(api::compile_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
