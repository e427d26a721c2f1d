//! Transaction entity: a charge raised against an article

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub article_id: i32,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,

    /// ISO 4217 code of `amount`
    #[sea_orm(column_type = "Text")]
    pub currency: String,

    pub transaction_date: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub payment_method: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text", unique)]
    pub invoice_number: String,

    /// Set only when an institutional agreement sponsors the charge
    pub institution_id: Option<i32>,
}

impl Model {
    pub fn is_institutional(&self) -> bool {
        self.institution_id.is_some()
    }

    /// Calendar date the charge falls on, in its own offset
    pub fn charged_on(&self) -> Date {
        self.transaction_date.date_naive()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Restrict"
    )]
    Article,

    #[sea_orm(
        belongs_to = "super::institution::Entity",
        from = "Column::InstitutionId",
        to = "super::institution::Column::Id",
        on_delete = "Restrict"
    )]
    Institution,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl Related<super::institution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
