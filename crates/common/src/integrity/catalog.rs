//! In-memory catalog of the publishing model
//!
//! Every entity lives in a map keyed by its identifier. Relationships are
//! followed through those keys, so the one-to-many sides (a publisher's
//! journals, an author's articles) are answered by lookup rather than by
//! stored back-references.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{agreement_covers, check_eligible_journal, walk_policy_chain, DEFAULT_MAX_POLICY_DEPTH};
use crate::db::models::{
    Agreement, Article, Author, EntityKind, Institution, Journal, OpaqueDocument, PricingPolicy,
    Publisher, Transaction,
};
use crate::errors::{AppError, Result};
use crate::input::identifiers;

/// Snapshot of every entity, indexed by identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    publishers: BTreeMap<i32, Publisher>,
    institutions: BTreeMap<i32, Institution>,
    pricing_policies: BTreeMap<i32, PricingPolicy>,
    journals: BTreeMap<i32, Journal>,
    authors: BTreeMap<i32, Author>,
    articles: BTreeMap<i32, Article>,
    transactions: BTreeMap<i32, Transaction>,
    agreements: BTreeMap<i32, Agreement>,

    /// agreement id -> eligible journal ids
    eligibility: BTreeMap<i32, BTreeSet<i32>>,

    max_policy_depth: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POLICY_DEPTH)
    }
}

/// Ancestry of a pricing policy, nearest first
#[derive(Debug, Clone)]
pub struct PolicyChain<'a> {
    policies: Vec<&'a PricingPolicy>,
}

impl<'a> PolicyChain<'a> {
    /// The policy the chain was resolved for
    pub fn leaf(&self) -> &'a PricingPolicy {
        self.policies[0]
    }

    /// The top-level policy with no parent
    pub fn root(&self) -> &'a PricingPolicy {
        self.policies[self.policies.len() - 1]
    }

    /// Parent links followed from leaf to root
    pub fn hops(&self) -> usize {
        self.policies.len() - 1
    }

    pub fn ids(&self) -> Vec<i32> {
        self.policies.iter().map(|p| p.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a PricingPolicy> + '_ {
        self.policies.iter().copied()
    }

    /// First value `field` yields walking from the leaf towards the root.
    ///
    /// A child overrides its ancestors for any field it sets.
    pub fn inherited<T, F>(&self, field: F) -> Option<T>
    where
        F: Fn(&'a PricingPolicy) -> Option<T>,
    {
        self.policies.iter().copied().find_map(|p| field(p))
    }

    pub fn discount_rules(&self) -> Option<&'a OpaqueDocument> {
        self.inherited(|p| p.discount_rules.as_ref().filter(|d| !d.is_empty()))
    }

    pub fn special_conditions(&self) -> Option<&'a OpaqueDocument> {
        self.inherited(|p| p.special_conditions.as_ref().filter(|d| !d.is_empty()))
    }
}

fn missing(entity: EntityKind, id: i32) -> AppError {
    AppError::MissingReference { entity, id }
}

impl Catalog {
    pub fn new(max_policy_depth: usize) -> Self {
        Self {
            publishers: BTreeMap::new(),
            institutions: BTreeMap::new(),
            pricing_policies: BTreeMap::new(),
            journals: BTreeMap::new(),
            authors: BTreeMap::new(),
            articles: BTreeMap::new(),
            transactions: BTreeMap::new(),
            agreements: BTreeMap::new(),
            eligibility: BTreeMap::new(),
            max_policy_depth,
        }
    }

    pub fn max_policy_depth(&self) -> usize {
        self.max_policy_depth
    }

    /// Number of rows across every entity kind, eligibility links excluded
    pub fn len(&self) -> usize {
        self.publishers.len()
            + self.institutions.len()
            + self.pricing_policies.len()
            + self.journals.len()
            + self.authors.len()
            + self.articles.len()
            + self.transactions.len()
            + self.agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Loading
    // ========================================================================
    //
    // Inserts are unchecked so that a snapshot of a damaged database can
    // still be loaded and audited.

    pub fn insert_publisher(&mut self, publisher: Publisher) {
        self.publishers.insert(publisher.id, publisher);
    }

    pub fn insert_institution(&mut self, institution: Institution) {
        self.institutions.insert(institution.id, institution);
    }

    pub fn insert_pricing_policy(&mut self, policy: PricingPolicy) {
        self.pricing_policies.insert(policy.id, policy);
    }

    pub fn insert_journal(&mut self, journal: Journal) {
        self.journals.insert(journal.id, journal);
    }

    pub fn insert_author(&mut self, author: Author) {
        self.authors.insert(author.id, author);
    }

    pub fn insert_article(&mut self, article: Article) {
        self.articles.insert(article.id, article);
    }

    pub fn insert_transaction(&mut self, transaction: Transaction) {
        self.transactions.insert(transaction.id, transaction);
    }

    pub fn insert_agreement(&mut self, agreement: Agreement) {
        self.eligibility.entry(agreement.id).or_default();
        self.agreements.insert(agreement.id, agreement);
    }

    pub fn link_eligible_journal(&mut self, agreement_id: i32, journal_id: i32) {
        self.eligibility.entry(agreement_id).or_default().insert(journal_id);
    }

    /// Add a journal to an agreement's eligible set, enforcing that it
    /// belongs to the agreement's publisher
    #[instrument(level = "debug", skip(self))]
    pub fn add_eligible_journal(&mut self, agreement_id: i32, journal_id: i32) -> Result<()> {
        let agreement = self.agreement(agreement_id)
            .ok_or_else(|| missing(EntityKind::Agreement, agreement_id))?;
        let journal = self.journal(journal_id)
            .ok_or_else(|| missing(EntityKind::Journal, journal_id))?;

        check_eligible_journal(agreement.publisher_id, journal)?;

        self.link_eligible_journal(agreement_id, journal_id);
        Ok(())
    }

    pub fn remove_eligible_journal(&mut self, agreement_id: i32, journal_id: i32) -> bool {
        self.eligibility
            .get_mut(&agreement_id)
            .map(|set| set.remove(&journal_id))
            .unwrap_or(false)
    }

    // ========================================================================
    // Lookup by identifier
    // ========================================================================

    pub fn publisher(&self, id: i32) -> Option<&Publisher> {
        self.publishers.get(&id)
    }

    pub fn institution(&self, id: i32) -> Option<&Institution> {
        self.institutions.get(&id)
    }

    pub fn pricing_policy(&self, id: i32) -> Option<&PricingPolicy> {
        self.pricing_policies.get(&id)
    }

    pub fn journal(&self, id: i32) -> Option<&Journal> {
        self.journals.get(&id)
    }

    pub fn author(&self, id: i32) -> Option<&Author> {
        self.authors.get(&id)
    }

    pub fn article(&self, id: i32) -> Option<&Article> {
        self.articles.get(&id)
    }

    pub fn transaction(&self, id: i32) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn agreement(&self, id: i32) -> Option<&Agreement> {
        self.agreements.get(&id)
    }

    pub fn publishers(&self) -> impl Iterator<Item = &Publisher> {
        self.publishers.values()
    }

    pub fn institutions(&self) -> impl Iterator<Item = &Institution> {
        self.institutions.values()
    }

    pub fn pricing_policies(&self) -> impl Iterator<Item = &PricingPolicy> {
        self.pricing_policies.values()
    }

    pub fn journals(&self) -> impl Iterator<Item = &Journal> {
        self.journals.values()
    }

    pub fn authors(&self) -> impl Iterator<Item = &Author> {
        self.authors.values()
    }

    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    pub fn agreements(&self) -> impl Iterator<Item = &Agreement> {
        self.agreements.values()
    }

    // ========================================================================
    // Navigation: many -> one
    // ========================================================================

    pub fn publisher_of(&self, journal: &Journal) -> Result<&Publisher> {
        self.publisher(journal.publisher_id)
            .ok_or_else(|| missing(EntityKind::Publisher, journal.publisher_id))
    }

    pub fn policy_of(&self, journal: &Journal) -> Result<&PricingPolicy> {
        self.pricing_policy(journal.pricing_policy_id)
            .ok_or_else(|| missing(EntityKind::PricingPolicy, journal.pricing_policy_id))
    }

    pub fn journal_of(&self, article: &Article) -> Result<&Journal> {
        self.journal(article.journal_id)
            .ok_or_else(|| missing(EntityKind::Journal, article.journal_id))
    }

    pub fn author_of(&self, article: &Article) -> Result<&Author> {
        self.author(article.author_id)
            .ok_or_else(|| missing(EntityKind::Author, article.author_id))
    }

    pub fn article_of(&self, transaction: &Transaction) -> Result<&Article> {
        self.article(transaction.article_id)
            .ok_or_else(|| missing(EntityKind::Article, transaction.article_id))
    }

    /// `Ok(None)` when the charge is not institutionally sponsored
    pub fn institution_of(&self, transaction: &Transaction) -> Result<Option<&Institution>> {
        match transaction.institution_id {
            Some(id) => self.institution(id)
                .map(Some)
                .ok_or_else(|| missing(EntityKind::Institution, id)),
            None => Ok(None),
        }
    }

    /// Registered institution of an author, if the author names one
    pub fn affiliation_of(&self, author: &Author) -> Result<Option<&Institution>> {
        match author.institution_id {
            Some(id) => self.institution(id)
                .map(Some)
                .ok_or_else(|| missing(EntityKind::Institution, id)),
            None => Ok(None),
        }
    }

    pub fn agreement_publisher(&self, agreement: &Agreement) -> Result<&Publisher> {
        self.publisher(agreement.publisher_id)
            .ok_or_else(|| missing(EntityKind::Publisher, agreement.publisher_id))
    }

    pub fn agreement_institution(&self, agreement: &Agreement) -> Result<&Institution> {
        self.institution(agreement.institution_id)
            .ok_or_else(|| missing(EntityKind::Institution, agreement.institution_id))
    }

    // ========================================================================
    // Navigation: one -> many (by query)
    // ========================================================================

    pub fn journals_of(&self, publisher_id: i32) -> Vec<&Journal> {
        self.journals.values().filter(|j| j.publisher_id == publisher_id).collect()
    }

    pub fn journals_priced_by(&self, policy_id: i32) -> Vec<&Journal> {
        self.journals.values().filter(|j| j.pricing_policy_id == policy_id).collect()
    }

    pub fn articles_by(&self, author_id: i32) -> Vec<&Article> {
        self.articles.values().filter(|a| a.author_id == author_id).collect()
    }

    pub fn articles_in(&self, journal_id: i32) -> Vec<&Article> {
        self.articles.values().filter(|a| a.journal_id == journal_id).collect()
    }

    pub fn agreements_of(&self, institution_id: i32) -> Vec<&Agreement> {
        self.agreements.values().filter(|a| a.institution_id == institution_id).collect()
    }

    pub fn agreements_with(&self, publisher_id: i32) -> Vec<&Agreement> {
        self.agreements.values().filter(|a| a.publisher_id == publisher_id).collect()
    }

    pub fn child_policies(&self, policy_id: i32) -> Vec<&PricingPolicy> {
        self.pricing_policies
            .values()
            .filter(|p| p.parent_policy_id == Some(policy_id))
            .collect()
    }

    pub fn transactions_for(&self, article_id: i32) -> Vec<&Transaction> {
        self.transactions.values().filter(|t| t.article_id == article_id).collect()
    }

    pub fn eligible_journal_ids(&self, agreement_id: i32) -> BTreeSet<i32> {
        self.eligibility.get(&agreement_id).cloned().unwrap_or_default()
    }

    /// Eligible journals that resolve; dangling links are reported by the audit
    pub fn eligible_journals(&self, agreement_id: i32) -> Vec<&Journal> {
        self.eligibility
            .get(&agreement_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.journal(*id))
            .collect()
    }

    // ========================================================================
    // Pricing policies
    // ========================================================================

    /// Resolve the ancestry of `policy_id` up to its root
    pub fn policy_chain(&self, policy_id: i32) -> Result<PolicyChain<'_>> {
        let ids = walk_policy_chain(policy_id, self.max_policy_depth, |id| {
            self.pricing_policy(id).map(|p| p.parent_policy_id)
        })?;

        let policies = ids
            .into_iter()
            .map(|id| self.pricing_policy(id).ok_or_else(|| missing(EntityKind::PricingPolicy, id)))
            .collect::<Result<Vec<_>>>()?;

        Ok(PolicyChain { policies })
    }

    /// The policy chain governing a journal's charges
    pub fn journal_policy(&self, journal_id: i32) -> Result<PolicyChain<'_>> {
        let journal = self.journal(journal_id)
            .ok_or_else(|| missing(EntityKind::Journal, journal_id))?;
        self.policy_chain(journal.pricing_policy_id)
    }

    // ========================================================================
    // Agreements
    // ========================================================================

    /// Agreements of the transaction's institution that cover its article's
    /// journal on the transaction date. Empty for non-institutional charges.
    pub fn covering_agreements(&self, transaction: &Transaction) -> Result<Vec<&Agreement>> {
        let Some(institution_id) = transaction.institution_id else {
            return Ok(Vec::new());
        };

        let journal_id = self.article_of(transaction)?.journal_id;
        let date = transaction.charged_on();

        Ok(self
            .agreements_of(institution_id)
            .into_iter()
            .filter(|a| agreement_covers(a, &self.eligible_journal_ids(a.id), journal_id, date))
            .collect())
    }

    // ========================================================================
    // Per-entity checks
    // ========================================================================

    pub fn check_journal(&self, journal: &Journal) -> Result<()> {
        first(self.journal_violations(journal))
    }

    pub fn check_pricing_policy(&self, policy: &PricingPolicy) -> Result<()> {
        first(self.pricing_policy_violations(policy))
    }

    pub fn check_author(&self, author: &Author) -> Result<()> {
        first(self.author_violations(author))
    }

    pub fn check_article(&self, article: &Article) -> Result<()> {
        first(self.article_violations(article))
    }

    pub fn check_agreement(&self, agreement: &Agreement) -> Result<()> {
        first(self.agreement_violations(agreement))
    }

    pub fn check_transaction(&self, transaction: &Transaction) -> Result<()> {
        first(self.transaction_violations(transaction))
    }

    // ========================================================================
    // Violation collection
    // ========================================================================

    pub fn journal_violations(&self, journal: &Journal) -> Vec<AppError> {
        let mut found = Vec::new();
        note(&mut found, self.publisher_of(journal));
        note(&mut found, self.policy_chain(journal.pricing_policy_id));
        found
    }

    pub fn pricing_policy_violations(&self, policy: &PricingPolicy) -> Vec<AppError> {
        let mut found = Vec::new();
        if !identifiers::is_valid_currency(&policy.currency) {
            found.push(AppError::invalid_field(
                "currency",
                format!("pricing policy {} has currency {:?}", policy.id, policy.currency),
            ));
        }
        note(&mut found, self.policy_chain(policy.id));
        found
    }

    pub fn author_violations(&self, author: &Author) -> Vec<AppError> {
        let mut found = Vec::new();
        note(&mut found, self.affiliation_of(author));
        note(&mut found, author.check_orcid());
        found
    }

    pub fn article_violations(&self, article: &Article) -> Vec<AppError> {
        let mut found = Vec::new();
        note(&mut found, self.author_of(article));
        note(&mut found, self.journal_of(article));
        note(&mut found, article.check_dates());
        note(&mut found, article.check_doi());
        found
    }

    pub fn agreement_violations(&self, agreement: &Agreement) -> Vec<AppError> {
        let mut found = Vec::new();
        note(&mut found, self.agreement_publisher(agreement));
        note(&mut found, self.agreement_institution(agreement));
        note(&mut found, agreement.check_dates());

        for journal_id in self.eligible_journal_ids(agreement.id) {
            let journal = self.journal(journal_id)
                .ok_or_else(|| missing(EntityKind::Journal, journal_id));
            if let Some(journal) = note(&mut found, journal) {
                note(&mut found, check_eligible_journal(agreement.publisher_id, journal));
            }
        }
        found
    }

    pub fn transaction_violations(&self, transaction: &Transaction) -> Vec<AppError> {
        let mut found = Vec::new();

        if !identifiers::is_valid_currency(&transaction.currency) {
            found.push(AppError::invalid_field(
                "currency",
                format!("transaction {} has currency {:?}", transaction.id, transaction.currency),
            ));
        }

        let article = note(&mut found, self.article_of(transaction));
        let institution = note(&mut found, self.institution_of(transaction)).flatten();

        // coverage is only decidable once both ends resolve
        if let (Some(article), Some(institution)) = (article, institution) {
            match self.covering_agreements(transaction) {
                Ok(covering) if covering.is_empty() => {
                    found.push(AppError::UncoveredInstitutionalCharge {
                        institution_id: institution.id,
                        journal_id: article.journal_id,
                        date: transaction.charged_on(),
                    });
                }
                Ok(_) => {}
                Err(err) => found.push(err),
            }
        }
        found
    }
}

/// Keep the value, or record the error and move on
fn note<T>(found: &mut Vec<AppError>, outcome: Result<T>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            found.push(err);
            None
        }
    }
}

fn first(violations: Vec<AppError>) -> Result<()> {
    match violations.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn publisher(id: i32) -> Publisher {
        Publisher {
            id,
            name: format!("Publisher {id}"),
            contact_info: "desk@example.org".into(),
            address: "1 Press Lane".into(),
            website: None,
        }
    }

    pub(crate) fn policy(id: i32, parent: Option<i32>, price: i64) -> PricingPolicy {
        PricingPolicy {
            id,
            parent_policy_id: parent,
            policy_type: (if parent.is_some() { "Publisher-specific" } else { "Basic" }).into(),
            base_price: Decimal::new(price, 2),
            currency: "USD".into(),
            discount_rules: None,
            special_conditions: None,
        }
    }

    pub(crate) fn journal(id: i32, publisher_id: i32, policy_id: i32) -> Journal {
        Journal { id, publisher_id, name: format!("Journal {id}"), pricing_policy_id: policy_id }
    }

    pub(crate) fn institution(id: i32) -> Institution {
        Institution {
            id,
            name: format!("University {id}"),
            contact_details: String::new(),
            institution_type: "Academic".into(),
        }
    }

    pub(crate) fn agreement(id: i32, publisher_id: i32, institution_id: i32) -> Agreement {
        Agreement {
            id,
            publisher_id,
            institution_id,
            agreement_type: "Publishing".into(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 12, 31),
            discount_details: Some(OpaqueDocument::from(r#"{"percent": 15}"#)),
        }
    }

    pub(crate) fn author(id: i32) -> Author {
        Author {
            id,
            first_name: "Ada".into(),
            middle_name: None,
            last_name: "Lovelace".into(),
            email: format!("ada{id}@example.org"),
            username: None,
            orcid: None,
            institution_id: None,
            affiliation: None,
            department: "Mathematics".into(),
            biography: String::new(),
        }
    }

    pub(crate) fn article(id: i32, author_id: i32, journal_id: i32) -> Article {
        Article {
            id,
            title: format!("Article {id}"),
            abstract_text: String::new(),
            author_id,
            journal_id,
            publication_date: None,
            submission_date: date(2025, 2, 1),
            status: "submitted".into(),
            doi: None,
            keywords: String::new(),
            publication_status: "draft".into(),
        }
    }

    pub(crate) fn transaction(id: i32, article_id: i32, institution_id: Option<i32>, on: NaiveDate) -> Transaction {
        let offset = FixedOffset::east_opt(0).unwrap();
        Transaction {
            id,
            article_id,
            amount: Decimal::new(150000, 2),
            currency: "USD".into(),
            transaction_date: offset
                .from_local_datetime(&on.and_hms_opt(12, 0, 0).unwrap())
                .unwrap(),
            payment_method: "invoice".into(),
            status: "paid".into(),
            invoice_number: format!("INV-{id}"),
            institution_id,
        }
    }

    /// P1 with J1, P2 with J2, institution I1 with agreement A1 (P1) covering J1
    pub(crate) fn sample() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.insert_publisher(publisher(1));
        catalog.insert_publisher(publisher(2));
        catalog.insert_pricing_policy(policy(1, None, 10000));
        catalog.insert_pricing_policy(policy(2, Some(1), 8000));
        catalog.insert_journal(journal(1, 1, 2));
        catalog.insert_journal(journal(2, 2, 1));
        catalog.insert_institution(institution(1));
        catalog.insert_agreement(agreement(1, 1, 1));
        catalog.link_eligible_journal(1, 1);
        catalog.insert_author(author(1));
        catalog.insert_article(article(1, 1, 1));
        catalog.insert_article(article(2, 1, 2));
        catalog
    }

    #[test]
    fn test_journal_resolves_publisher_both_ways() {
        let catalog = sample();
        let j1 = catalog.journal(1).unwrap();
        assert_eq!(catalog.publisher_of(j1).unwrap().id, 1);

        let ids: Vec<i32> = catalog.journals_of(1).iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_one_to_many_lookups() {
        let catalog = sample();
        let ids = |journals: Vec<&Journal>| journals.iter().map(|j| j.id).collect::<Vec<_>>();

        assert_eq!(ids(catalog.journals_priced_by(1)), vec![2]);
        assert_eq!(ids(catalog.journals_priced_by(2)), vec![1]);

        let in_j1: Vec<i32> = catalog.articles_in(1).iter().map(|a| a.id).collect();
        assert_eq!(in_j1, vec![1]);
        assert_eq!(catalog.articles_by(1).len(), 2);

        assert_eq!(catalog.agreements_with(1).len(), 1);
        assert!(catalog.agreements_with(2).is_empty());
        assert_eq!(catalog.agreements_of(1)[0].id, 1);
    }

    #[test]
    fn test_child_policy_reaches_root_in_one_hop() {
        let catalog = sample();
        let chain = catalog.policy_chain(2).unwrap();
        assert_eq!(chain.hops(), 1);
        assert_eq!(chain.leaf().base_price, Decimal::new(8000, 2));
        assert_eq!(chain.root().id, 1);
        assert_eq!(chain.root().base_price, Decimal::new(10000, 2));
        assert_eq!(catalog.child_policies(1).len(), 1);
    }

    #[test]
    fn test_inherited_rules_nearest_first() {
        let mut catalog = sample();
        let mut root = policy(1, None, 10000);
        root.discount_rules = Some(OpaqueDocument::from("root-rules"));
        root.special_conditions = Some(OpaqueDocument::from("root-conditions"));
        catalog.insert_pricing_policy(root);

        let mut child = policy(2, Some(1), 8000);
        child.discount_rules = Some(OpaqueDocument::from("child-rules"));
        catalog.insert_pricing_policy(child);

        let chain = catalog.journal_policy(1).unwrap();
        assert_eq!(chain.discount_rules().unwrap().as_str(), "child-rules");
        assert_eq!(chain.special_conditions().unwrap().as_str(), "root-conditions");
        assert_eq!(chain.ids(), vec![2, 1]);
    }

    #[test]
    fn test_ineligible_journal_rejected() {
        let mut catalog = sample();
        let err = catalog.add_eligible_journal(1, 2).unwrap_err();
        assert!(matches!(err, AppError::IneligibleJournalReference { journal_id: 2, .. }));
        assert_eq!(catalog.eligible_journal_ids(1), BTreeSet::from([1]));

        catalog.insert_journal(journal(3, 1, 1));
        catalog.add_eligible_journal(1, 3).unwrap();
        assert_eq!(catalog.eligible_journals(1).len(), 2);
        assert!(catalog.remove_eligible_journal(1, 3));
        assert!(!catalog.remove_eligible_journal(1, 3));
    }

    #[test]
    fn test_add_eligible_journal_unknown_ids() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.add_eligible_journal(9, 1),
            Err(AppError::MissingReference { entity: EntityKind::Agreement, id: 9 })
        ));
        assert!(matches!(
            catalog.add_eligible_journal(1, 9),
            Err(AppError::MissingReference { entity: EntityKind::Journal, id: 9 })
        ));
    }

    #[test]
    fn test_covering_agreements() {
        let mut catalog = sample();
        catalog.insert_transaction(transaction(1, 1, Some(1), date(2025, 6, 1)));
        catalog.insert_transaction(transaction(2, 2, Some(1), date(2025, 6, 1)));
        catalog.insert_transaction(transaction(3, 1, Some(1), date(2026, 6, 1)));
        catalog.insert_transaction(transaction(4, 1, None, date(2026, 6, 1)));

        let covered = catalog.transaction(1).unwrap();
        assert_eq!(catalog.covering_agreements(covered).unwrap().len(), 1);
        assert!(catalog.check_transaction(covered).is_ok());

        // journal 2 is not eligible under agreement 1
        let wrong_journal = catalog.transaction(2).unwrap();
        assert!(matches!(
            catalog.check_transaction(wrong_journal),
            Err(AppError::UncoveredInstitutionalCharge { journal_id: 2, .. })
        ));

        let expired = catalog.transaction(3).unwrap();
        assert!(catalog.check_transaction(expired).is_err());

        let direct = catalog.transaction(4).unwrap();
        assert!(catalog.covering_agreements(direct).unwrap().is_empty());
        assert!(catalog.check_transaction(direct).is_ok());
    }

    #[test]
    fn test_missing_references_reported() {
        let mut catalog = sample();
        catalog.insert_journal(journal(9, 77, 1));
        let j = catalog.journal(9).unwrap();
        assert!(matches!(
            catalog.check_journal(j),
            Err(AppError::MissingReference { entity: EntityKind::Publisher, id: 77 })
        ));

        catalog.insert_article(article(9, 55, 1));
        let a = catalog.article(9).unwrap();
        assert!(matches!(
            catalog.check_article(a),
            Err(AppError::MissingReference { entity: EntityKind::Author, id: 55 })
        ));
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let mut catalog = sample();
        catalog.insert_transaction(transaction(1, 1, Some(1), date(2025, 6, 1)));

        let json = serde_json::to_string(&catalog).unwrap();
        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
        assert_eq!(back.len(), catalog.len());
    }
}
