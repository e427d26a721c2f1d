//! SeaORM entity models
//!
//! Database entities for the publishing domain. The "many" side of every
//! relationship holds the foreign key; the "one" side reaches its children
//! through queries, never through a stored collection.

mod agreement;
mod agreement_journal;
mod article;
mod author;
mod institution;
mod journal;
mod pricing_policy;
mod publisher;
mod transaction;

use sea_orm::DeriveValueType;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::errors::Result;

pub use publisher::{
    Entity as PublisherEntity,
    Model as Publisher,
    ActiveModel as PublisherActiveModel,
    Column as PublisherColumn,
};

pub use institution::{
    Entity as InstitutionEntity,
    Model as Institution,
    ActiveModel as InstitutionActiveModel,
    Column as InstitutionColumn,
};

pub use pricing_policy::{
    Entity as PricingPolicyEntity,
    Model as PricingPolicy,
    ActiveModel as PricingPolicyActiveModel,
    Column as PricingPolicyColumn,
};

pub use journal::{
    Entity as JournalEntity,
    Model as Journal,
    ActiveModel as JournalActiveModel,
    Column as JournalColumn,
};

pub use author::{
    Entity as AuthorEntity,
    Model as Author,
    ActiveModel as AuthorActiveModel,
    Column as AuthorColumn,
};

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
};

pub use transaction::{
    Entity as TransactionEntity,
    Model as Transaction,
    ActiveModel as TransactionActiveModel,
    Column as TransactionColumn,
};

pub use agreement::{
    Entity as AgreementEntity,
    Model as Agreement,
    ActiveModel as AgreementActiveModel,
    Column as AgreementColumn,
};

pub use agreement_journal::{
    Entity as AgreementJournalEntity,
    Model as AgreementJournal,
    ActiveModel as AgreementJournalActiveModel,
    Column as AgreementJournalColumn,
};

/// Entity namespaces. Identifiers are unique within one kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Article,
    Author,
    Journal,
    Publisher,
    PricingPolicy,
    Transaction,
    Agreement,
    Institution,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Article => "article",
            EntityKind::Author => "author",
            EntityKind::Journal => "journal",
            EntityKind::Publisher => "publisher",
            EntityKind::PricingPolicy => "pricing policy",
            EntityKind::Transaction => "transaction",
            EntityKind::Agreement => "agreement",
            EntityKind::Institution => "institution",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized rule set carried verbatim for a consuming pricing engine.
///
/// The model stores and returns the text unchanged; interpretation belongs
/// to whoever calls [`OpaqueDocument::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, DeriveValueType, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueDocument(pub String);

impl OpaqueDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Serialize a structured value into its stored form
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self(serde_json::to_string(value)?))
    }

    /// Decode the stored JSON text into the caller's rule type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for OpaqueDocument {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for OpaqueDocument {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// Declares a typed view over a category string column. Known values map to
/// variants; anything else is kept verbatim in `Other`.
macro_rules! category {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(value) => value.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                let known = match s.as_str() {
                    $($label => Some($name::$variant),)+
                    _ => None,
                };
                known.unwrap_or_else(|| $name::Other(s))
            }
        }

        impl From<$name> for String {
            fn from(kind: $name) -> Self {
                match kind {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

category! {
    /// Institution category
    InstitutionKind {
        Academic => "Academic",
        Research => "Research",
        JournalOwner => "JournalOwner",
    }
}

category! {
    /// Agreement category
    AgreementKind {
        Ownership => "Ownership",
        Publishing => "Publishing",
    }
}

category! {
    /// Pricing policy category
    PolicyKind {
        Basic => "Basic",
        PublisherSpecific => "Publisher-specific",
    }
}
