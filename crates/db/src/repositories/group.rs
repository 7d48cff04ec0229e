//! Group repository.

use std::sync::Arc;

use tavern_common::pagination::{Page, PageMeta};
use tavern_common::{AppError, AppResult};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Select, TransactionTrait,
};

use crate::entities::{Group, GroupMember, group, group_member};

/// Filter specification for listing groups.
///
/// Both predicates are optional; when both are present they are ANDed.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    /// Only groups whose roster contains this user.
    pub player_id: Option<String>,
    /// Case-insensitive substring match against name or description.
    pub text: Option<String>,
}

/// Repository for group and roster operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Group Operations ====================

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Build the listing query for a filter specification.
    ///
    /// Zero, one, or two predicates are applied; results come back in
    /// insertion order.
    fn filtered_query(filter: &GroupFilter) -> Select<Group> {
        let mut query = Group::find().order_by(group::Column::CreatedAt, Order::Asc);

        if let Some(player_id) = &filter.player_id {
            query = query.filter(
                group::Column::Id.in_subquery(
                    Query::select()
                        .column(group_member::Column::GroupId)
                        .from(GroupMember)
                        .and_where(group_member::Column::UserId.eq(player_id.as_str()))
                        .to_owned(),
                ),
            );
        }

        if let Some(text) = &filter.text {
            let pattern = format!("%{text}%");
            query = query.filter(
                Condition::any()
                    .add(Expr::col((Group, group::Column::Name)).ilike(pattern.clone()))
                    .add(Expr::col((Group, group::Column::Description)).ilike(pattern)),
            );
        }

        query
    }

    /// List groups matching a filter, one page at a time (1-based pages).
    pub async fn list(
        &self,
        filter: &GroupFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<Page<group::Model>> {
        let paginator = Self::filtered_query(filter).paginate(self.db.as_ref(), limit);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let data = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(data, PageMeta::new(total, limit, page)))
    }

    /// Create a group and attach its master as the first player.
    ///
    /// Both rows commit together so the roster never exists without the
    /// master in it.
    pub async fn create_with_master(
        &self,
        group_model: group::ActiveModel,
        member_model: group_member::ActiveModel,
    ) -> AppResult<group::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let group = group_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        member_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group)
    }

    /// Update a group.
    pub async fn update(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a group permanently.
    ///
    /// Membership rows and join requests go with it via FK cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Group::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Roster Operations ====================

    /// Check if a user is in the roster of a group.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let member = GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(member.is_some())
    }

    /// Remove a player from a group's roster.
    ///
    /// Detaching a user who is not in the roster is a no-op.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        GroupMember::delete_many()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// List the roster rows of a single group in join order.
    pub async fn list_members(&self, group_id: &str) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the roster rows of many groups at once (for list enrichment).
    pub async fn list_members_of_groups(
        &self,
        group_ids: &[String],
    ) -> AppResult<Vec<group_member::Model>> {
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        GroupMember::find()
            .filter(group_member::Column::GroupId.is_in(group_ids.iter().cloned()))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
