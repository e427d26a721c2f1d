//! Author entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{self, AppError};
use crate::input::identifiers;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub middle_name: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    #[sea_orm(column_type = "Text", nullable, unique)]
    pub username: Option<String>,

    /// ORCID iD in `0000-0000-0000-000X` form
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub orcid: Option<String>,

    /// Affiliated institution, when it is registered
    pub institution_id: Option<i32>,

    /// Free-text affiliation for institutions not registered in the system
    #[sea_orm(column_type = "Text", nullable)]
    pub affiliation: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub department: String,

    #[sea_orm(column_type = "Text")]
    pub biography: String,
}

impl Model {
    /// Display name: first, middle (if any) and last name
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// An ORCID iD, when present, must pass the MOD 11-2 checksum
    pub fn check_orcid(&self) -> errors::Result<()> {
        match self.orcid.as_deref() {
            Some(orcid) if !identifiers::is_valid_orcid(orcid) => Err(AppError::invalid_field(
                "orcid",
                format!("author {} has invalid ORCID {orcid:?}", self.id),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article::Entity")]
    Articles,

    #[sea_orm(
        belongs_to = "super::institution::Entity",
        from = "Column::InstitutionId",
        to = "super::institution::Column::Id",
        on_delete = "SetNull"
    )]
    Institution,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Articles.def()
    }
}

impl Related<super::institution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
