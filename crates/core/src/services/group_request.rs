//! Join request service.
//!
//! Owns the request state machine: PENDING is the only resting state;
//! acceptance flips the row to ACCEPTED and seats the player in the same
//! transaction, rejection deletes the row.

use chrono::Utc;
use tavern_common::{AppError, AppResult, IdGenerator};
use tavern_db::entities::group_request::RequestStatus;
use tavern_db::entities::{group, group_request};
use tavern_db::repositories::{GroupRepository, GroupRequestRepository, UserRepository};
use sea_orm::Set;
use serde::Serialize;

use super::group::UserSummary;

/// Compact group representation embedded in request payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub master: String,
}

impl From<group::Model> for GroupSummary {
    fn from(g: group::Model) -> Self {
        Self {
            id: g.id,
            name: g.name,
            master: g.master_id,
        }
    }
}

/// Join request enriched with its group and requesting-user summaries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequestDetail {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub group: GroupSummary,
    pub user: Option<UserSummary>,
}

/// Service orchestrating the join-request lifecycle.
#[derive(Clone)]
pub struct GroupRequestService {
    request_repo: GroupRequestRepository,
    group_repo: GroupRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl GroupRequestService {
    /// Create a new join request service.
    #[must_use]
    pub fn new(
        request_repo: GroupRequestRepository,
        group_repo: GroupRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            request_repo,
            group_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Open a join request for a group.
    ///
    /// Members cannot request a seat they already have, and a pair can hold
    /// at most one pending request.
    pub async fn create(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<group_request::Model> {
        self.group_repo.get_by_id(group_id).await?;

        if self.group_repo.is_member(group_id, user_id).await? {
            return Err(AppError::Validation(
                "user is already in the group".to_string(),
            ));
        }

        if self
            .request_repo
            .find_pending_by_pair(group_id, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "group request already exists".to_string(),
            ));
        }

        let request = self
            .request_repo
            .create(group_request::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(group_id.to_string()),
                user_id: Set(user_id.to_string()),
                status: Set(RequestStatus::Pending),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        tracing::info!(group_id, user_id, request_id = %request.id, "Join request opened");
        Ok(request)
    }

    /// List a group's pending requests for the given master.
    ///
    /// Returns an empty list, never an error, when the group is mastered by
    /// someone else or has no pending requests.
    pub async fn list_for_master(
        &self,
        group_id: &str,
        master_id: &str,
    ) -> AppResult<Vec<GroupRequestDetail>> {
        let requests = self
            .request_repo
            .list_pending_for_master(group_id, master_id)
            .await?;

        if requests.is_empty() {
            return Ok(vec![]);
        }

        let group = self.group_repo.get_by_id(group_id).await?;
        let group_summary = GroupSummary::from(group);

        let mut user_ids: Vec<String> = requests.iter().map(|r| r.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let users: std::collections::HashMap<String, UserSummary> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect();

        Ok(requests
            .into_iter()
            .map(|r| GroupRequestDetail {
                user: users.get(&r.user_id).cloned(),
                group: group_summary.clone(),
                id: r.id,
                group_id: r.group_id,
                user_id: r.user_id,
                status: r.status,
                created_at: r.created_at.into(),
            })
            .collect())
    }

    /// Accept a pending request: the status flip and the roster insert are
    /// one logical unit.
    ///
    /// Resolved requests are out of scope here and read as not-found.
    pub async fn accept(
        &self,
        group_id: &str,
        request_id: &str,
        actor_id: &str,
    ) -> AppResult<group_request::Model> {
        let group = self.group_repo.get_by_id(group_id).await?;
        Self::ensure_master(&group, actor_id)?;

        let accepted = self
            .request_repo
            .accept(group_id, request_id, &self.id_gen.generate(), Utc::now().into())
            .await?;

        tracing::info!(
            group_id,
            request_id,
            user_id = %accepted.user_id,
            "Join request accepted"
        );
        Ok(accepted)
    }

    /// Reject a pending request, deleting its row.
    pub async fn reject(
        &self,
        group_id: &str,
        request_id: &str,
        actor_id: &str,
    ) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;
        Self::ensure_master(&group, actor_id)?;

        let request = self
            .request_repo
            .find_pending_by_id_and_group(request_id, group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group request not found: {request_id}")))?;

        self.request_repo.delete(&request.id).await?;

        tracing::info!(group_id, request_id, "Join request rejected");
        Ok(())
    }

    /// Resolving requests is reserved to the group's master, even though the
    /// transport layer has already authenticated the caller.
    fn ensure_master(group: &group::Model, actor_id: &str) -> AppResult<()> {
        if group.master_id != actor_id {
            return Err(AppError::Forbidden(
                "only the group master may resolve join requests".to_string(),
            ));
        }
        Ok(())
    }
}
