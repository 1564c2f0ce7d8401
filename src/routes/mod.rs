//! API Routes
//!
//! - `/` - Single-page UI
//! - `/api/agent` - Credential + CSV upload, builds the session's agent
//! - `/api/chat` - Ask one question
//! - `/api/history` - Session transcript
//! - `/api/session` - End the session
//! - `/api/health` - Health checks
//!
//! Session-scoped endpoints identify the caller by the `x-session-id` header.

pub mod agent;
pub mod chat;
pub mod health;
pub mod ui;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(ui::router())
        .merge(agent::router(state.clone()))
        .merge(chat::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
