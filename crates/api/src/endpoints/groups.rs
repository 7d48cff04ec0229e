//! Group and join-request endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use tavern_common::pagination::{Page, PageQuery};
use tavern_common::{AppError, AppResult};
use tavern_core::{CreateGroupInput, GroupDetail, GroupRequestDetail, UpdateGroupInput};
use tavern_db::entities::group_request;
use tavern_db::entities::group_request::RequestStatus;
use tavern_db::repositories::GroupFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{extractors::AuthUser, middleware::AppState};

// ==================== Request/Response Types ====================

/// Query string accepted by the group listing.
#[derive(Debug, Deserialize)]
pub struct ListGroupsQuery {
    /// Only groups whose roster contains this user.
    pub user: Option<String>,
    /// Case-insensitive substring filter on name or description.
    pub text: Option<String>,
    /// 1-based page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Query string accepted by the request listing.
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    /// The master whose pending requests are being listed. Mandatory.
    pub master: Option<String>,
}

/// Join request response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub status: RequestStatus,
    pub created_at: String,
}

impl From<group_request::Model> for RequestResponse {
    fn from(r: group_request::Model) -> Self {
        Self {
            id: r.id,
            group_id: r.group_id,
            user_id: r.user_id,
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct GroupEnvelope {
    group: GroupDetail,
}

#[derive(Serialize)]
struct GroupsEnvelope {
    groups: Page<GroupDetail>,
}

#[derive(Serialize)]
struct RequestEnvelope {
    #[serde(rename = "groupRequest")]
    group_request: RequestResponse,
}

#[derive(Serialize)]
struct RequestsEnvelope {
    #[serde(rename = "groupRequest")]
    group_request: Vec<GroupRequestDetail>,
}

// ==================== Handlers ====================

/// List groups, optionally filtered by player and text.
async fn index(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListGroupsQuery>,
) -> AppResult<Json<GroupsEnvelope>> {
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.pagination);

    let filter = GroupFilter {
        player_id: query.user,
        text: query.text,
    };
    let groups = state.group_service.list(&filter, page, limit).await?;

    Ok(Json(GroupsEnvelope { groups }))
}

/// Create a new group.
async fn store(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<(StatusCode, Json<GroupEnvelope>)> {
    let group = state.group_service.create(&user.id, input).await?;

    Ok((StatusCode::CREATED, Json(GroupEnvelope { group })))
}

/// Update a group's descriptive fields.
async fn update(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(input): Json<UpdateGroupInput>,
) -> AppResult<Json<GroupEnvelope>> {
    let group = state.group_service.update(&group_id, input).await?;

    Ok(Json(GroupEnvelope { group }))
}

/// Delete a group.
async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<Json<Value>> {
    state.group_service.delete(&group_id, &user.id).await?;

    Ok(Json(json!({})))
}

/// Remove a player from a group's roster.
async fn remove_player(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path((group_id, player_id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    state
        .group_service
        .remove_player(&group_id, &player_id)
        .await?;

    Ok(Json(json!({})))
}

/// Open a join request for the authenticated user.
async fn store_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<(StatusCode, Json<RequestEnvelope>)> {
    let request = state
        .group_request_service
        .create(&group_id, &user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RequestEnvelope {
            group_request: request.into(),
        }),
    ))
}

/// List a group's pending requests for a master.
async fn index_requests(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<ListRequestsQuery>,
) -> AppResult<Json<RequestsEnvelope>> {
    let master = query
        .master
        .ok_or_else(|| AppError::Validation("master query parameter is required".to_string()))?;

    let requests = state
        .group_request_service
        .list_for_master(&group_id, &master)
        .await?;

    Ok(Json(RequestsEnvelope {
        group_request: requests,
    }))
}

/// Accept a join request.
async fn accept_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((group_id, request_id)): Path<(String, String)>,
) -> AppResult<Json<RequestEnvelope>> {
    let request = state
        .group_request_service
        .accept(&group_id, &request_id, &user.id)
        .await?;

    Ok(Json(RequestEnvelope {
        group_request: request.into(),
    }))
}

/// Reject a join request.
async fn reject_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((group_id, request_id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    state
        .group_request_service
        .reject(&group_id, &request_id, &user.id)
        .await?;

    Ok(Json(json!({})))
}

/// Build the group routes.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(index).post(store))
        .route(
            "/groups/{group_id}",
            patch(update).delete(destroy),
        )
        .route(
            "/groups/{group_id}/players/{player_id}",
            delete(remove_player),
        )
        .route(
            "/groups/{group_id}/requests",
            get(index_requests).post(store_request),
        )
        .route(
            "/groups/{group_id}/requests/{request_id}/accept",
            post(accept_request),
        )
        .route(
            "/groups/{group_id}/requests/{request_id}",
            delete(reject_request),
        )
}
