//! Group entity for tabletop roleplay tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group entity - a table of players gathered around one campaign.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User who masters (owns) the group. Always present in the roster.
    #[sea_orm(indexed)]
    pub master_id: String,

    /// Group name.
    pub name: String,

    /// What the campaign is about.
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// When the table meets (opaque descriptive string).
    pub schedule: String,

    /// Where the table meets (opaque descriptive string).
    pub location: String,

    /// The chronic/campaign log of the table (opaque descriptive string).
    #[sea_orm(column_type = "Text")]
    pub chronic: String,

    /// When the group was created.
    pub created_at: DateTimeWithTimeZone,

    /// When the group was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::MasterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Master,
    #[sea_orm(has_many = "super::group_member::Entity")]
    Members,
    #[sea_orm(has_many = "super::group_request::Entity")]
    Requests,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Master.def()
    }
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::group_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
