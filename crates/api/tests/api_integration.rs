//! API integration tests.
//!
//! These tests drive the router end-to-end over a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use chrono::Utc;
use maplit::btreemap;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use tavern_api::{AppState, middleware::auth_middleware, router as api_router};
use tavern_common::config::PaginationConfig;
use tavern_core::{GroupRequestService, GroupService};
use tavern_db::entities::{group, group_member, group_request, user};
use tavern_db::repositories::{GroupRepository, GroupRequestRepository, UserRepository};
use tower::ServiceExt;

fn test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        token: Some("sometoken".to_string()),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn test_group(id: &str, master_id: &str, name: &str) -> group::Model {
    group::Model {
        id: id.to_string(),
        master_id: master_id.to_string(),
        name: name.to_string(),
        description: "weekly campaign".to_string(),
        schedule: "fridays".to_string(),
        location: "the back room".to_string(),
        chronic: "session zero".to_string(),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_app(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let request_repo = GroupRequestRepository::new(Arc::clone(&db));
    let user_repo = UserRepository::new(Arc::clone(&db));

    let state = AppState {
        group_service: GroupService::new(group_repo.clone(), user_repo.clone()),
        group_request_service: GroupRequestService::new(
            request_repo,
            group_repo,
            user_repo.clone(),
        ),
        user_repo,
        pagination: PaginationConfig::default(),
    };

    api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_groups_requires_authentication() {
    let app = create_test_app(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_groups_returns_page_envelope() {
    let actor = test_user("usr1", "master");
    let group = test_group("grp1", "usr1", "The Round Table");
    let member = group_member::Model {
        id: "mem1".to_string(),
        group_id: "grp1".to_string(),
        user_id: "usr1".to_string(),
        joined_at: Utc::now().into(),
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![actor.clone()]])
        .append_query_results([vec![btreemap! { "num_items" => Value::BigInt(Some(1)) }]])
        .append_query_results([vec![group]])
        .append_query_results([vec![member]])
        .append_query_results([vec![actor]])
        .into_connection();

    let app = create_test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups?user=usr1")
                .method("GET")
                .header("Authorization", "Bearer sometoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["groups"]["meta"]["total"], 1);
    assert_eq!(body["groups"]["data"][0]["id"], "grp1");
    assert_eq!(body["groups"]["data"][0]["masterUser"]["username"], "master");
    assert_eq!(body["groups"]["data"][0]["players"][0]["id"], "usr1");
}

#[tokio::test]
async fn test_list_requests_without_master_is_unprocessable() {
    let actor = test_user("usr1", "master");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![actor]])
        .into_connection();

    let app = create_test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups/grp1/requests")
                .method("GET")
                .header("Authorization", "Bearer sometoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn test_remove_master_is_a_bad_request() {
    let actor = test_user("usr1", "master");
    let group = test_group("grp1", "usr1", "The Round Table");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![actor]])
        .append_query_results([vec![group]])
        .into_connection();

    let app = create_test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups/grp1/players/usr1")
                .method("DELETE")
                .header("Authorization", "Bearer sometoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_OPERATION");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_duplicate_pending_request_conflicts() {
    let actor = test_user("usr7", "player");
    let group = test_group("grp1", "usr1", "The Round Table");
    let pending = group_request::Model {
        id: "req1".to_string(),
        group_id: "grp1".to_string(),
        user_id: "usr7".to_string(),
        status: group_request::RequestStatus::Pending,
        created_at: Utc::now().into(),
        updated_at: None,
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![actor]])
        .append_query_results([vec![group]])
        .append_query_results([Vec::<group_member::Model>::new()])
        .append_query_results([vec![pending]])
        .into_connection();

    let app = create_test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups/grp1/requests")
                .method("POST")
                .header("Authorization", "Bearer sometoken")
                .header("Content-Type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_create_group_with_missing_fields_is_unprocessable() {
    let actor = test_user("usr1", "master");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![actor]])
        .into_connection();

    let app = create_test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/groups")
                .method("POST")
                .header("Authorization", "Bearer sometoken")
                .header("Content-Type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
