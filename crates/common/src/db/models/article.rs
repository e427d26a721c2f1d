//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{self, AppError};
use crate::input::identifiers;
use crate::integrity::check_date_range;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    pub author_id: i32,

    pub journal_id: i32,

    /// Set once the article is published
    pub publication_date: Option<Date>,

    pub submission_date: Date,

    /// Editorial workflow stage (opaque category string)
    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Assigned at publication
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub keywords: String,

    /// Publication lifecycle stage (opaque category string)
    #[sea_orm(column_type = "Text")]
    pub publication_status: String,
}

impl Model {
    pub fn is_published(&self) -> bool {
        self.publication_date.is_some()
    }

    /// Submission must not come after publication
    pub fn check_dates(&self) -> errors::Result<()> {
        match self.publication_date {
            Some(published) => check_date_range(
                &format!("article {} submission/publication", self.id),
                self.submission_date,
                published,
            ),
            None => Ok(()),
        }
    }

    /// A DOI is only present on a published article and must be well-formed
    pub fn check_doi(&self) -> errors::Result<()> {
        let Some(doi) = self.doi.as_deref() else {
            return Ok(());
        };

        if self.publication_date.is_none() {
            return Err(AppError::invalid_field(
                "doi",
                format!("article {} has a DOI but no publication date", self.id),
            ));
        }

        if !identifiers::is_valid_doi(doi) {
            return Err(AppError::invalid_field("doi", format!("malformed DOI {doi:?}")));
        }

        Ok(())
    }

    /// Split the free-text keyword field on commas and semicolons
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split([',', ';'])
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id",
        on_delete = "Restrict"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::journal::Entity",
        from = "Column::JournalId",
        to = "super::journal::Column::Id",
        on_delete = "Restrict"
    )]
    Journal,

    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journal.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Model {
        Model {
            id: 1,
            title: "On Forests".into(),
            abstract_text: "Trees.".into(),
            author_id: 1,
            journal_id: 1,
            publication_date: None,
            submission_date: Date::from_ymd_opt(2024, 3, 1).unwrap(),
            status: "submitted".into(),
            doi: None,
            keywords: "graphs, trees; forests,".into(),
            publication_status: "draft".into(),
        }
    }

    #[test]
    fn test_unpublished_article_is_valid() {
        let a = article();
        assert!(a.check_dates().is_ok());
        assert!(a.check_doi().is_ok());
        assert!(!a.is_published());
    }

    #[test]
    fn test_publication_before_submission_rejected() {
        let mut a = article();
        a.publication_date = Some(Date::from_ymd_opt(2024, 2, 1).unwrap());
        let err = a.check_dates().unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange { .. }));

        a.publication_date = Some(a.submission_date);
        assert!(a.check_dates().is_ok());
    }

    #[test]
    fn test_doi_requires_publication() {
        let mut a = article();
        a.doi = Some("10.1000/xyz123".into());
        assert!(a.check_doi().is_err());

        a.publication_date = Some(Date::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(a.check_doi().is_ok());

        a.doi = Some("doi:xyz".into());
        assert!(a.check_doi().is_err());
    }

    #[test]
    fn test_keyword_list() {
        assert_eq!(article().keyword_list(), vec!["graphs", "trees", "forests"]);
    }
}
