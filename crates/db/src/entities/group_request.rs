//! Join request entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a join request.
///
/// `Pending` is the only resting state: acceptance retains the row as an
/// audit record, rejection deletes it, so `Rejected` is only ever observed
/// in the response of the rejecting call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum RequestStatus {
    /// Waiting for the group's master to resolve it.
    #[sea_orm(string_value = "PENDING")]
    #[default]
    Pending,
    /// The master accepted; the requester is now a player.
    #[sea_orm(string_value = "ACCEPTED")]
    Accepted,
    /// The master rejected; the row is removed.
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

/// Join request - a player asking to sit at a table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The group the request targets.
    #[sea_orm(indexed)]
    pub group_id: String,

    /// The requesting user.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Current status of the request.
    pub status: RequestStatus,

    /// When the request was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the status was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
