//! Agreement entity: a time-bounded arrangement between a publisher and an institution

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AgreementKind, OpaqueDocument};
use crate::errors;
use crate::integrity::check_date_range;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agreements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub publisher_id: i32,

    pub institution_id: i32,

    #[sea_orm(column_type = "Text")]
    pub agreement_type: String,

    pub start_date: Date,

    /// Inclusive
    pub end_date: Date,

    #[sea_orm(column_type = "Text", nullable)]
    pub discount_details: Option<OpaqueDocument>,
}

impl Model {
    pub fn kind(&self) -> AgreementKind {
        AgreementKind::from(self.agreement_type.clone())
    }

    pub fn check_dates(&self) -> errors::Result<()> {
        check_date_range(
            &format!("agreement {}", self.id),
            self.start_date,
            self.end_date,
        )
    }

    /// Whether `date` falls inside the agreement term (both ends inclusive)
    pub fn is_active_on(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
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
        belongs_to = "super::institution::Entity",
        from = "Column::InstitutionId",
        to = "super::institution::Column::Id",
        on_delete = "Restrict"
    )]
    Institution,

    #[sea_orm(has_many = "super::agreement_journal::Entity")]
    EligibleJournalLinks,
}

impl Related<super::publisher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publisher.def()
    }
}

impl Related<super::institution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl Related<super::agreement_journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EligibleJournalLinks.def()
    }
}

impl Related<super::journal::Entity> for Entity {
    fn to() -> RelationDef {
        super::agreement_journal::Relation::Journal.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::agreement_journal::Relation::Agreement.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn agreement(start: (i32, u32, u32), end: (i32, u32, u32)) -> Model {
        Model {
            id: 3,
            publisher_id: 1,
            institution_id: 1,
            agreement_type: "Publishing".into(),
            start_date: Date::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: Date::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            discount_details: None,
        }
    }

    #[test]
    fn test_active_range_is_inclusive() {
        let a = agreement((2025, 1, 1), (2025, 12, 31));
        assert!(a.is_active_on(Date::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(a.is_active_on(Date::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!a.is_active_on(Date::from_ymd_opt(2026, 1, 1).unwrap()));
        assert!(a.check_dates().is_ok());
        assert_eq!(a.kind(), AgreementKind::Publishing);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let a = agreement((2025, 6, 1), (2025, 5, 31));
        assert!(matches!(a.check_dates(), Err(AppError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_single_day_agreement() {
        let a = agreement((2025, 6, 1), (2025, 6, 1));
        assert!(a.check_dates().is_ok());
    }
}
