//! Axum HTTP API server.
//!
//! This crate provides:
//! - Per-session upload, processing and analysis workflows
//! - Idle session eviction
//! - Request IDs, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod sessions;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::SessionReaper;
pub use sessions::{SessionEntry, SessionStore};
pub use state::AppState;
