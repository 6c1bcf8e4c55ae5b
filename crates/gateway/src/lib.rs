//! HTTP surface for the session multiplexer.
//!
//! Thin axum layer over [`wamux_sessions`]: routes deserialize, call the
//! controller/dispatcher, and map the error taxonomy to status codes. No
//! business rules live here.

pub mod config;
pub mod error;
pub mod send_routes;
pub mod server;
pub mod session_routes;

pub use {
    config::{GatewayConfig, SeedSession},
    error::ApiError,
    server::{AppState, build_router, build_state, serve},
};
