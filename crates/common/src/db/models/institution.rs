//! Institution entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::InstitutionKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub contact_details: String,

    /// Category string, see [`InstitutionKind`]
    #[sea_orm(column_type = "Text")]
    pub institution_type: String,
}

impl Model {
    /// Typed view over the category string
    pub fn kind(&self) -> InstitutionKind {
        InstitutionKind::from(self.institution_type.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::agreement::Entity")]
    Agreements,

    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,

    #[sea_orm(has_many = "super::author::Entity")]
    Authors,
}

impl Related<super::agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreements.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Authors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
