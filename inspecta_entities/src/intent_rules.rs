use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "intent_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub intent_name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub trigger_words: Json,
    pub synonyms: Json,
    pub parameters: Json,
    #[sea_orm(column_type = "Text")]
    pub action_target: String,
    #[sea_orm(column_type = "Text")]
    pub example_query: String,
    pub priority: i32,
    pub sort_order: i32,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
