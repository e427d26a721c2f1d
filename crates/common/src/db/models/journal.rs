//! Journal entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub publisher_id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub pricing_policy_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::publisher::Entity",
        from = "Column::PublisherId",
        to = "super::publisher::Column::Id",
        on_delete = "Restrict"
    )]
    Publisher,

    #[sea_orm(
        belongs_to = "super::pricing_policy::Entity",
        from = "Column::PricingPolicyId",
        to = "super::pricing_policy::Column::Id",
        on_delete = "Restrict"
    )]
    PricingPolicy,

    #[sea_orm(has_many = "super::article::Entity")]
    Articles,
}

impl Related<super::publisher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publisher.def()
    }
}

impl Related<super::pricing_policy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricingPolicy.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Articles.def()
    }
}

impl Related<super::agreement::Entity> for Entity {
    fn to() -> RelationDef {
        super::agreement_journal::Relation::Agreement.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::agreement_journal::Relation::Journal.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
