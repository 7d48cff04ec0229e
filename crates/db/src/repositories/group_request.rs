//! Join request repository.

use std::sync::Arc;

use tavern_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, Order, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};

use crate::entities::group_request::RequestStatus;
use crate::entities::{GroupRequest, group, group_member, group_request};

/// Repository for join request operations, keyed by (group, user).
#[derive(Clone)]
pub struct GroupRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRequestRepository {
    /// Create a new join request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the pending request of a (group, user) pair, if any.
    pub async fn find_pending_by_pair(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_request::Model>> {
        GroupRequest::find()
            .filter(group_request::Column::GroupId.eq(group_id))
            .filter(group_request::Column::UserId.eq(user_id))
            .filter(group_request::Column::Status.eq(RequestStatus::Pending))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a pending request by its ID, scoped to a group.
    ///
    /// Resolved requests fall out of this lookup scope, so accepting or
    /// rejecting them reads as not-found.
    pub async fn find_pending_by_id_and_group(
        &self,
        request_id: &str,
        group_id: &str,
    ) -> AppResult<Option<group_request::Model>> {
        GroupRequest::find_by_id(request_id)
            .filter(group_request::Column::GroupId.eq(group_id))
            .filter(group_request::Column::Status.eq(RequestStatus::Pending))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new pending request.
    ///
    /// The partial unique index on pending (`group_id`, `user_id`) turns a
    /// concurrent duplicate into a conflict here rather than a torn state.
    pub async fn create(
        &self,
        model: group_request::ActiveModel,
    ) -> AppResult<group_request::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("group request already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Build the master-scoped pending listing query.
    fn pending_for_master_query(
        group_id: &str,
        master_id: &str,
    ) -> sea_orm::Select<GroupRequest> {
        GroupRequest::find()
            .filter(group_request::Column::GroupId.eq(group_id))
            .filter(group_request::Column::Status.eq(RequestStatus::Pending))
            .join(JoinType::InnerJoin, group_request::Relation::Group.def())
            .filter(group::Column::MasterId.eq(master_id))
            .order_by(group_request::Column::CreatedAt, Order::Asc)
    }

    /// List pending requests of a group, restricted to the given master.
    ///
    /// Returns nothing when the group is mastered by someone else.
    pub async fn list_pending_for_master(
        &self,
        group_id: &str,
        master_id: &str,
    ) -> AppResult<Vec<group_request::Model>> {
        Self::pending_for_master_query(group_id, master_id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accept a pending request: flip it to ACCEPTED and add the requester
    /// to the roster, as one transaction.
    ///
    /// The pending row is re-read under an exclusive lock, so a concurrent
    /// accept of the same request observes no pending row and gets
    /// not-found; if the membership insert fails the status flip rolls back
    /// with it.
    pub async fn accept(
        &self,
        group_id: &str,
        request_id: &str,
        member_id: &str,
        now: DateTimeWithTimeZone,
    ) -> AppResult<group_request::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(request) = GroupRequest::find_by_id(request_id)
            .filter(group_request::Column::GroupId.eq(group_id))
            .filter(group_request::Column::Status.eq(RequestStatus::Pending))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        else {
            return Err(AppError::NotFound(format!(
                "Group request not found: {request_id}"
            )));
        };

        let user_id = request.user_id.clone();

        let mut active: group_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Accepted);
        active.updated_at = Set(Some(now));
        let accepted = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let member = group_member::ActiveModel {
            id: Set(member_id.to_string()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id),
            joined_at: Set(now),
        };
        member.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Validation("user is already in the group".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(accepted)
    }

    /// Delete a request row (the reject path).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        GroupRequest::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
