use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inspection_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub material_name: String,
    pub supplier: String,
    pub batch_no: String,
    pub inspector: String,
    /// 合格 / 不合格
    pub result: String,
    pub defect_type: Option<String>,
    pub defect_count: i32,
    pub inspected_on: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
