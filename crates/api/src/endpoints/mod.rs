//! API endpoint modules.

pub mod groups;

use axum::Router;

use crate::middleware::AppState;

/// Build the API router.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new().merge(groups::router())
}
