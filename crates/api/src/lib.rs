//! HTTP API layer for tavern-rs.
//!
//! This crate provides the REST API surface:
//!
//! - **Endpoints**: group and join-request routes
//! - **Extractors**: authenticated-user extraction
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
pub use middleware::AppState;
