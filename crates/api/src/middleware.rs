//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tavern_common::config::PaginationConfig;
use tavern_core::{GroupRequestService, GroupService};
use tavern_db::repositories::UserRepository;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Group CRUD and roster service.
    pub group_service: GroupService,
    /// Join-request lifecycle service.
    pub group_request_service: GroupRequestService,
    /// User lookups for the authentication boundary.
    pub user_repo: UserRepository,
    /// Page-size bounds for list endpoints.
    pub pagination: PaginationConfig,
}

/// Authentication middleware.
///
/// Resolves a bearer token against the user table and stashes the user in
/// request extensions; handlers decide whether authentication is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(Some(user)) = state.user_repo.find_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
