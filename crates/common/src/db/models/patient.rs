//! Patient entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "_id", column_type = "Text")]
    pub id: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Unique health ID
    #[sea_orm(column_type = "Text", unique)]
    pub uhid: String,

    pub age: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub gender: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consultation::Entity")]
    Consultations,
}

impl Related<super::consultation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consultations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
