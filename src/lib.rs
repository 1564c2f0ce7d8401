// Data Agent - ask natural-language questions about an uploaded CSV

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod analysis;  // Descriptive statistics and chart drawing used by agent tools
pub mod dataset;
pub mod canvas;
pub mod plot_capture;
pub mod session;
pub mod intake;
pub mod chat;
pub mod routes;
pub mod middleware;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
// Note: Import specific items from types module instead of glob to avoid name conflicts
// e.g., use data_agent::types::{AppError, AppResult, ConfigError};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
