//! Group service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tavern_common::pagination::Page;
use tavern_common::{AppError, AppResult, IdGenerator};
use tavern_db::entities::{group, group_member, user};
use tavern_db::repositories::{GroupFilter, GroupRepository, UserRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::authorization::{GroupPolicy, MasterPolicy};

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 2048))]
    pub description: String,
    #[validate(length(min = 1, max = 256))]
    pub schedule: String,
    #[validate(length(min = 1, max = 256))]
    pub location: String,
    #[validate(length(min = 1, max = 4096))]
    pub chronic: String,
    #[validate(length(min = 1, max = 32))]
    pub master: String,
}

/// Input for updating a group.
///
/// Neither the master nor the roster can be changed through this path.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 2048))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub schedule: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub location: Option<String>,
    #[validate(length(min = 1, max = 4096))]
    pub chronic: Option<String>,
}

/// Compact user representation embedded in group and request payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<user::Model> for UserSummary {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

/// Group response with its roster and master summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub id: String,
    pub name: String,
    pub description: String,
    pub schedule: String,
    pub location: String,
    pub chronic: String,
    pub master: String,
    pub master_user: Option<UserSummary>,
    pub players: Vec<UserSummary>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl GroupDetail {
    #[must_use]
    pub fn from_model(
        model: group::Model,
        players: Vec<UserSummary>,
        master_user: Option<UserSummary>,
    ) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            schedule: model.schedule,
            location: model.location,
            chronic: model.chronic,
            master: model.master_id,
            master_user,
            players,
            created_at: model.created_at.into(),
        }
    }
}

/// Service for managing groups and their rosters.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    user_repo: UserRepository,
    policy: Arc<dyn GroupPolicy>,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service with the default master-only policy.
    #[must_use]
    pub fn new(group_repo: GroupRepository, user_repo: UserRepository) -> Self {
        Self::with_policy(group_repo, user_repo, Arc::new(MasterPolicy))
    }

    /// Create a group service with a custom management policy.
    #[must_use]
    pub fn with_policy(
        group_repo: GroupRepository,
        user_repo: UserRepository,
        policy: Arc<dyn GroupPolicy>,
    ) -> Self {
        Self {
            group_repo,
            user_repo,
            policy,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a group by ID, enriched with roster and master summaries.
    pub async fn get_detail(&self, id: &str) -> AppResult<GroupDetail> {
        let group = self.group_repo.get_by_id(id).await?;
        self.detail(group).await
    }

    /// List groups matching a filter, enriched, one page at a time.
    pub async fn list(
        &self,
        filter: &GroupFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<Page<GroupDetail>> {
        let page_models = self.group_repo.list(filter, page, limit).await?;
        let meta = page_models.meta.clone();
        let details = self.enrich_all(page_models.data).await?;

        Ok(Page::new(details, meta))
    }

    /// Create a new group with its master as the sole initial player.
    pub async fn create(&self, actor_id: &str, input: CreateGroupInput) -> AppResult<GroupDetail> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let now = Utc::now();
        let group_model = group::Model {
            id: self.id_gen.generate(),
            master_id: input.master,
            name: input.name,
            description: input.description,
            schedule: input.schedule,
            location: input.location,
            chronic: input.chronic,
            created_at: now.into(),
            updated_at: None,
        };

        // Authorization runs before any write.
        if !self.policy.can_manage(actor_id, &group_model) {
            return Err(AppError::Forbidden(
                "cannot create a group mastered by another user".to_string(),
            ));
        }

        let master = self.user_repo.get_by_id(&group_model.master_id).await?;

        let member_model = group_member::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_model.id.clone()),
            user_id: Set(group_model.master_id.clone()),
            joined_at: Set(group_model.created_at),
        };
        let active = group::ActiveModel {
            id: Set(group_model.id),
            master_id: Set(group_model.master_id),
            name: Set(group_model.name),
            description: Set(group_model.description),
            schedule: Set(group_model.schedule),
            location: Set(group_model.location),
            chronic: Set(group_model.chronic),
            created_at: Set(group_model.created_at),
            updated_at: Set(None),
        };

        let group = self.group_repo.create_with_master(active, member_model).await?;
        tracing::info!(group_id = %group.id, master_id = %group.master_id, "Group created");

        let summary = UserSummary::from(master);
        Ok(GroupDetail::from_model(
            group,
            vec![summary.clone()],
            Some(summary),
        ))
    }

    /// Apply a partial update to a group's descriptive fields.
    pub async fn update(&self, id: &str, input: UpdateGroupInput) -> AppResult<GroupDetail> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let group = self.group_repo.get_by_id(id).await?;
        let mut active: group::ActiveModel = group.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(schedule) = input.schedule {
            active.schedule = Set(schedule);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        if let Some(chronic) = input.chronic {
            active.chronic = Set(chronic);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.group_repo.update(active).await?;
        self.detail(updated).await
    }

    /// Remove a player from a group's roster.
    ///
    /// The master can never be removed; the group exists around them.
    pub async fn remove_player(&self, group_id: &str, player_id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;
        Self::ensure_not_master(&group, player_id)?;

        self.group_repo.remove_member(group_id, player_id).await
    }

    /// Delete a group, cascading its roster and join requests.
    pub async fn delete(&self, group_id: &str, actor_id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;

        if !self.policy.can_manage(actor_id, &group) {
            return Err(AppError::Forbidden(
                "only the group master may delete the group".to_string(),
            ));
        }

        self.group_repo.delete(group_id).await?;
        tracing::info!(group_id, "Group deleted");
        Ok(())
    }

    /// Guard shared by every roster-mutation entry point.
    fn ensure_not_master(group: &group::Model, player_id: &str) -> AppResult<()> {
        if group.master_id == player_id {
            return Err(AppError::InvalidOperation(
                "cannot remove master from group".to_string(),
            ));
        }
        Ok(())
    }

    async fn detail(&self, group: group::Model) -> AppResult<GroupDetail> {
        let mut details = self.enrich_all(vec![group]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::Internal("group enrichment produced no rows".to_string()))
    }

    /// Attach player and master summaries to a batch of groups.
    async fn enrich_all(&self, groups: Vec<group::Model>) -> AppResult<Vec<GroupDetail>> {
        if groups.is_empty() {
            return Ok(vec![]);
        }

        let group_ids: Vec<String> = groups.iter().map(|g| g.id.clone()).collect();
        let members = self.group_repo.list_members_of_groups(&group_ids).await?;

        let mut user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
        user_ids.extend(groups.iter().map(|g| g.master_id.clone()));
        user_ids.sort();
        user_ids.dedup();

        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut rosters: HashMap<String, Vec<UserSummary>> = HashMap::new();
        for member in members {
            if let Some(user) = users.get(&member.user_id) {
                rosters
                    .entry(member.group_id)
                    .or_default()
                    .push(UserSummary::from(user.clone()));
            }
        }

        Ok(groups
            .into_iter()
            .map(|g| {
                let players = rosters.remove(&g.id).unwrap_or_default();
                let master_user = users.get(&g.master_id).cloned().map(UserSummary::from);
                GroupDetail::from_model(g, players, master_user)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};

    fn test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            token: None,
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

    fn test_member(id: &str, group_id: &str, user_id: &str) -> group_member::Model {
        group_member::Model {
            id: id.to_string(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: Utc::now().into(),
        }
    }

    fn service_over(db: DatabaseConnection) -> GroupService {
        let db = Arc::new(db);
        GroupService::new(
            GroupRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        )
    }

    fn create_input(master: &str) -> CreateGroupInput {
        CreateGroupInput {
            name: "The Round Table".to_string(),
            description: "weekly campaign".to_string(),
            schedule: "fridays".to_string(),
            location: "the back room".to_string(),
            chronic: "session zero".to_string(),
            master: master.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields() {
        let service = service_over(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let mut input = create_input("usr1");
        input.name = String::new();
        let result = service.create("usr1", input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_master() {
        let service = service_over(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service.create("usr2", create_input("usr1")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_attaches_master_as_first_player() {
        let master = test_user("usr1", "master");
        let group = test_group("grp1", "usr1", "The Round Table");
        let member = test_member("mem1", "grp1", "usr1");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![master]])
            .append_query_results([vec![group]])
            .append_query_results([vec![member]])
            .into_connection();

        let service = service_over(db);
        let detail = service.create("usr1", create_input("usr1")).await.unwrap();

        assert_eq!(detail.master, "usr1");
        assert_eq!(detail.players.len(), 1);
        assert_eq!(detail.players[0].id, "usr1");
        assert_eq!(detail.master_user.as_ref().unwrap().username, "master");
    }

    #[tokio::test]
    async fn test_update_unknown_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<group::Model>::new()])
            .into_connection();

        let service = service_over(db);
        let result = service.update("missing", UpdateGroupInput::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_player_protects_master() {
        let group = test_group("grp1", "usr1", "The Round Table");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group]])
            .into_connection();

        let service = service_over(db);
        let result = service.remove_player("grp1", "usr1").await;

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_remove_player_detaches_non_master() {
        let group = test_group("grp1", "usr1", "The Round Table");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let service = service_over(db);
        assert!(service.remove_player("grp1", "usr7").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_requires_management_permission() {
        let group = test_group("grp1", "usr1", "The Round Table");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group]])
            .into_connection();

        let service = service_over(db);
        let result = service.delete("grp1", "usr2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_enriches_players_and_master() {
        let group = test_group("grp1", "usr1", "The Round Table");
        let members = vec![
            test_member("mem1", "grp1", "usr1"),
            test_member("mem2", "grp1", "usr7"),
        ];
        let users = vec![test_user("usr1", "master"), test_user("usr7", "player")];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                btreemap! { "num_items" => Value::BigInt(Some(1)) },
            ]])
            .append_query_results([vec![group]])
            .append_query_results([members])
            .append_query_results([users])
            .into_connection();

        let service = service_over(db);
        let page = service.list(&GroupFilter::default(), 1, 5).await.unwrap();

        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data.len(), 1);
        let detail = &page.data[0];
        assert_eq!(detail.players.len(), 2);
        assert_eq!(detail.players[0].id, "usr1");
        assert_eq!(detail.players[1].id, "usr7");
        assert_eq!(detail.master_user.as_ref().unwrap().id, "usr1");
    }

    #[test]
    fn test_ensure_not_master() {
        let group = test_group("grp1", "usr1", "The Round Table");

        assert!(GroupService::ensure_not_master(&group, "usr7").is_ok());
        assert!(matches!(
            GroupService::ensure_not_master(&group, "usr1"),
            Err(AppError::InvalidOperation(_))
        ));
    }
}
