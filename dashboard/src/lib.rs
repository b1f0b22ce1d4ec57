//! # Dashboard
//!
//! HTTP service behind the steel price forecast evaluation page: month
//! comparison tables, a rolling trend series, expert feedback relay and a
//! single-turn chat assistant.

use axum::routing::{delete, get, post};
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;

pub mod assistant;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use crate::config::Settings;
pub use crate::error::{ApiError, StartupError};
pub use crate::state::AppState;

/// Build the router. When `static_dir` is given, unmatched paths are served
/// from it so a prebuilt front end can live alongside the API.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/periods", get(routes::periods))
        .route("/api/v1/comparison/:period", get(routes::comparison))
        .route("/api/v1/trend", get(routes::trend))
        .route("/api/v1/summary", get(routes::summary))
        .route("/api/v1/feedback", post(routes::submit_feedback))
        .route("/api/v1/chat", post(routes::ask))
        .route("/api/v1/sessions/:id/chat", get(routes::chat_history))
        .route("/api/v1/sessions/:id", delete(routes::end_session))
        .with_state(state);

    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    }
}
