//! Nominee entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nominee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Image URL
    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Eligible for nomination in phase 1
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Aggregate counter from the single-phase voting model (not maintained)
    #[sea_orm(default_value = 0)]
    pub vote_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::nominee_category::Entity")]
    NomineeCategory,
}

impl Related<super::nominee_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NomineeCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
