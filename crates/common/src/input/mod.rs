//! Write-path drafts
//!
//! Every entity is created through one of these structs. Field-level
//! format rules are enforced here with `validator`; cross-entity rules
//! (references, ancestry, eligibility) are enforced by the repository
//! through [`crate::integrity`].

pub mod identifiers;

use sea_orm::prelude::{Date, DateTimeWithTimeZone, Decimal};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{
    AgreementActiveModel, ArticleActiveModel, AuthorActiveModel, InstitutionActiveModel,
    JournalActiveModel, OpaqueDocument, PricingPolicyActiveModel, PublisherActiveModel,
    TransactionActiveModel,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPublisher {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    #[serde(default)]
    pub contact_info: String,

    #[serde(default)]
    pub address: String,

    #[validate(url)]
    pub website: Option<String>,
}

impl NewPublisher {
    pub fn into_active_model(self) -> PublisherActiveModel {
        PublisherActiveModel {
            name: Set(self.name),
            contact_info: Set(self.contact_info),
            address: Set(self.address),
            website: Set(self.website),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInstitution {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    #[serde(default)]
    pub contact_details: String,

    #[validate(length(min = 1, max = 100))]
    pub institution_type: String,
}

impl NewInstitution {
    pub fn into_active_model(self) -> InstitutionActiveModel {
        InstitutionActiveModel {
            name: Set(self.name),
            contact_details: Set(self.contact_details),
            institution_type: Set(self.institution_type),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPricingPolicy {
    pub parent_policy_id: Option<i32>,

    #[validate(length(min = 1, max = 100))]
    pub policy_type: String,

    #[validate(custom(function = "identifiers::validate_non_negative"))]
    pub base_price: Decimal,

    #[validate(custom(function = "identifiers::validate_currency"))]
    pub currency: String,

    pub discount_rules: Option<OpaqueDocument>,

    pub special_conditions: Option<OpaqueDocument>,
}

impl NewPricingPolicy {
    pub fn into_active_model(self) -> PricingPolicyActiveModel {
        PricingPolicyActiveModel {
            parent_policy_id: Set(self.parent_policy_id),
            policy_type: Set(self.policy_type),
            base_price: Set(self.base_price),
            currency: Set(self.currency),
            discount_rules: Set(self.discount_rules),
            special_conditions: Set(self.special_conditions),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewJournal {
    pub publisher_id: i32,

    #[validate(length(min = 1, max = 500))]
    pub name: String,

    pub pricing_policy_id: i32,
}

impl NewJournal {
    pub fn into_active_model(self) -> JournalActiveModel {
        JournalActiveModel {
            publisher_id: Set(self.publisher_id),
            name: Set(self.name),
            pricing_policy_id: Set(self.pricing_policy_id),
            ..Default::default()
        }
    }
}

/// Journal created together with a new publisher; the publisher id is
/// filled in by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPublisherJournal {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    pub pricing_policy_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAuthor {
    #[validate(length(min = 1, max = 200))]
    pub first_name: String,

    pub middle_name: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub last_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,

    #[validate(custom(function = "identifiers::validate_orcid"))]
    pub orcid: Option<String>,

    pub institution_id: Option<i32>,

    pub affiliation: Option<String>,

    #[serde(default)]
    pub department: String,

    #[serde(default)]
    pub biography: String,
}

impl NewAuthor {
    pub fn into_active_model(self) -> AuthorActiveModel {
        AuthorActiveModel {
            first_name: Set(self.first_name),
            middle_name: Set(self.middle_name),
            last_name: Set(self.last_name),
            email: Set(self.email),
            username: Set(self.username),
            orcid: Set(self.orcid),
            institution_id: Set(self.institution_id),
            affiliation: Set(self.affiliation),
            department: Set(self.department),
            biography: Set(self.biography),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewArticle {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[validate(length(max = 50000))]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub author_id: i32,

    pub journal_id: i32,

    pub submission_date: Date,

    pub publication_date: Option<Date>,

    #[validate(length(min = 1, max = 100))]
    pub status: String,

    #[validate(custom(function = "identifiers::validate_doi"))]
    pub doi: Option<String>,

    #[serde(default)]
    pub keywords: String,

    #[validate(length(min = 1, max = 100))]
    pub publication_status: String,
}

impl NewArticle {
    pub fn into_active_model(self) -> ArticleActiveModel {
        ArticleActiveModel {
            title: Set(self.title),
            abstract_text: Set(self.abstract_text),
            author_id: Set(self.author_id),
            journal_id: Set(self.journal_id),
            publication_date: Set(self.publication_date),
            submission_date: Set(self.submission_date),
            status: Set(self.status),
            doi: Set(self.doi),
            keywords: Set(self.keywords),
            publication_status: Set(self.publication_status),
            ..Default::default()
        }
    }
}

/// Publication details recorded on an existing article
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Publication {
    pub publication_date: Date,

    #[validate(custom(function = "identifiers::validate_doi"))]
    pub doi: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub publication_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAgreement {
    pub publisher_id: i32,

    pub institution_id: i32,

    #[validate(length(min = 1, max = 100))]
    pub agreement_type: String,

    pub start_date: Date,

    pub end_date: Date,

    pub discount_details: Option<OpaqueDocument>,

    /// Journals of `publisher_id` the terms apply to
    #[serde(default)]
    pub eligible_journal_ids: Vec<i32>,
}

impl NewAgreement {
    /// The agreement row; eligibility links are written separately
    pub fn to_active_model(&self) -> AgreementActiveModel {
        AgreementActiveModel {
            publisher_id: Set(self.publisher_id),
            institution_id: Set(self.institution_id),
            agreement_type: Set(self.agreement_type.clone()),
            start_date: Set(self.start_date),
            end_date: Set(self.end_date),
            discount_details: Set(self.discount_details.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTransaction {
    pub article_id: i32,

    #[validate(custom(function = "identifiers::validate_non_negative"))]
    pub amount: Decimal,

    #[validate(custom(function = "identifiers::validate_currency"))]
    pub currency: String,

    pub transaction_date: DateTimeWithTimeZone,

    #[validate(length(min = 1, max = 100))]
    pub payment_method: String,

    #[validate(length(min = 1, max = 100))]
    pub status: String,

    #[validate(length(min = 1, max = 100))]
    pub invoice_number: String,

    pub institution_id: Option<i32>,
}

impl NewTransaction {
    pub fn into_active_model(self) -> TransactionActiveModel {
        TransactionActiveModel {
            article_id: Set(self.article_id),
            amount: Set(self.amount),
            currency: Set(self.currency),
            transaction_date: Set(self.transaction_date),
            payment_method: Set(self.payment_method),
            status: Set(self.status),
            invoice_number: Set(self.invoice_number),
            institution_id: Set(self.institution_id),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> NewAuthor {
        NewAuthor {
            first_name: "Josiah".into(),
            middle_name: Some("Stinkney".into()),
            last_name: "Carberry".into(),
            email: "josiah@example.edu".into(),
            username: None,
            orcid: Some("0000-0002-1825-0097".into()),
            institution_id: None,
            affiliation: Some("Brown University".into()),
            department: "Psychoceramics".into(),
            biography: String::new(),
        }
    }

    #[test]
    fn test_valid_author() {
        assert!(author().validate().is_ok());
    }

    #[test]
    fn test_author_bad_orcid_and_email() {
        let mut a = author();
        a.orcid = Some("0000-0002-1825-0098".into());
        let errors = a.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("orcid"));

        let mut a = author();
        a.email = "not-an-email".into();
        let errors = a.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_policy_rejects_negative_price_and_bad_currency() {
        let policy = NewPricingPolicy {
            parent_policy_id: None,
            policy_type: "Basic".into(),
            base_price: Decimal::new(-500, 2),
            currency: "usd".into(),
            discount_rules: None,
            special_conditions: None,
        };
        let errors = policy.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("base_price"));
        assert!(fields.contains_key("currency"));
    }

    #[test]
    fn test_publisher_website_must_be_url() {
        let publisher = NewPublisher {
            name: "Acme Press".into(),
            contact_info: String::new(),
            address: String::new(),
            website: Some("acme press".into()),
        };
        assert!(publisher.validate().is_err());
    }

    #[test]
    fn test_article_deserializes_abstract_field() {
        let json = serde_json::json!({
            "title": "On Forests",
            "abstract": "Trees.",
            "author_id": 1,
            "journal_id": 2,
            "submission_date": "2024-03-01",
            "publication_date": null,
            "status": "submitted",
            "doi": null,
            "publication_status": "draft"
        });
        let article: NewArticle = serde_json::from_value(json).unwrap();
        assert_eq!(article.abstract_text, "Trees.");
        assert!(article.keywords.is_empty());
        assert!(article.validate().is_ok());
    }
}
