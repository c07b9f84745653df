//! Axum HTTP server for the MoodScan demo.
//!
//! This crate provides:
//! - Multipart photo upload and batch analysis
//! - In-memory session store with TTL eviction
//! - Annotated image serving, emotion summary and CSV export
//! - An embedded single-page upload UI

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{AnalysisSession, SessionStore, SessionSweeper};
pub use state::AppState;
