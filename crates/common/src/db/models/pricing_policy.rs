//! Pricing policy entity
//!
//! Policies form a forest through `parent_policy_id`. A child may override
//! or extend its parent's terms; resolution of the chain lives in
//! [`crate::integrity`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{OpaqueDocument, PolicyKind};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pricing_policies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// None for a top-level policy
    pub parent_policy_id: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub policy_type: String,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub base_price: Decimal,

    /// ISO 4217 code of `base_price`
    #[sea_orm(column_type = "Text")]
    pub currency: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub discount_rules: Option<OpaqueDocument>,

    #[sea_orm(column_type = "Text", nullable)]
    pub special_conditions: Option<OpaqueDocument>,
}

impl Model {
    pub fn is_root(&self) -> bool {
        self.parent_policy_id.is_none()
    }

    pub fn kind(&self) -> PolicyKind {
        PolicyKind::from(self.policy_type.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentPolicyId",
        to = "Column::Id",
        on_delete = "Restrict"
    )]
    Parent,

    #[sea_orm(has_many = "super::journal::Entity")]
    Journals,
}

impl Related<super::journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
