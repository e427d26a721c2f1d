//! Whole-catalog consistency audit
//!
//! Runs every per-entity check over a [`Catalog`] snapshot and collects the
//! failures instead of stopping at the first one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Catalog;
use crate::db::models::EntityKind;
use crate::errors::{AppError, ErrorCode};

/// One invariant violation found by the audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub entity: EntityKind,
    pub id: i32,
    pub code: ErrorCode,
    pub message: String,
}

impl Finding {
    pub fn new(entity: EntityKind, id: i32, error: &AppError) -> Self {
        Self {
            entity,
            id,
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Result of auditing a catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub rows_checked: usize,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn count_by_code(&self) -> BTreeMap<ErrorCode, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.code).or_insert(0) += 1;
        }
        counts
    }

    pub fn findings_for(&self, entity: EntityKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.entity == entity)
    }
}

impl Catalog {
    /// Check every entity against every referential rule
    pub fn audit(&self) -> AuditReport {
        let started_at = Utc::now();
        let mut findings = Vec::new();

        let mut record = |entity: EntityKind, id: i32, violations: Vec<AppError>| {
            for err in violations {
                debug!(entity = %entity, id, code = err.code().as_str(), "Integrity finding");
                findings.push(Finding::new(entity, id, &err));
            }
        };

        for policy in self.pricing_policies() {
            record(EntityKind::PricingPolicy, policy.id, self.pricing_policy_violations(policy));
        }
        for journal in self.journals() {
            record(EntityKind::Journal, journal.id, self.journal_violations(journal));
        }
        for author in self.authors() {
            record(EntityKind::Author, author.id, self.author_violations(author));
        }
        for article in self.articles() {
            record(EntityKind::Article, article.id, self.article_violations(article));
        }
        for agreement in self.agreements() {
            record(EntityKind::Agreement, agreement.id, self.agreement_violations(agreement));
        }
        for transaction in self.transactions() {
            record(EntityKind::Transaction, transaction.id, self.transaction_violations(transaction));
        }

        AuditReport {
            run_id: Uuid::now_v7(),
            started_at,
            rows_checked: self.len(),
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::catalog::tests::*;
    use super::*;

    #[test]
    fn test_sample_catalog_is_clean() {
        let report = sample().audit();
        assert!(report.is_clean(), "unexpected findings: {:?}", report.findings);
        assert_eq!(report.rows_checked, 11);
    }

    #[test]
    fn test_audit_collects_every_violation() {
        let mut catalog = sample();

        // policy cycle 3 <-> 4
        catalog.insert_pricing_policy(policy(3, Some(4), 100));
        catalog.insert_pricing_policy(policy(4, Some(3), 100));

        // agreement listing another publisher's journal, with reversed dates
        let mut bad = agreement(2, 1, 1);
        bad.start_date = date(2026, 1, 1);
        bad.end_date = date(2025, 1, 1);
        catalog.insert_agreement(bad);
        catalog.link_eligible_journal(2, 2);

        // article published before it was submitted
        let mut early = article(3, 1, 1);
        early.publication_date = Some(date(2024, 1, 1));
        catalog.insert_article(early);

        // institutional charge with no agreement behind it
        catalog.insert_transaction(transaction(1, 2, Some(1), date(2025, 5, 5)));

        let report = catalog.audit();
        let counts = report.count_by_code();

        assert_eq!(counts.get(&ErrorCode::CyclicPolicyAncestry), Some(&2));
        assert_eq!(counts.get(&ErrorCode::InvalidDateRange), Some(&2));
        assert_eq!(counts.get(&ErrorCode::IneligibleJournalReference), Some(&1));
        assert_eq!(counts.get(&ErrorCode::UncoveredInstitutionalCharge), Some(&1));
        assert_eq!(report.findings_for(EntityKind::Agreement).count(), 2);
        assert_eq!(report.findings.len(), 6);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_one_row_reports_each_broken_rule() {
        let mut catalog = sample();

        let mut bad = agreement(2, 1, 1);
        bad.start_date = date(2026, 1, 1);
        bad.end_date = date(2025, 1, 1);
        catalog.insert_agreement(bad);
        catalog.link_eligible_journal(2, 2);
        catalog.link_eligible_journal(2, 9);

        let codes: Vec<ErrorCode> = catalog
            .audit()
            .findings_for(EntityKind::Agreement)
            .map(|f| f.code)
            .collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::InvalidDateRange,
                ErrorCode::IneligibleJournalReference,
                ErrorCode::MissingReference,
            ]
        );

        let bad = catalog.agreement(2).unwrap();
        assert!(matches!(catalog.check_agreement(bad), Err(AppError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_ineligible_link_reported() {
        let mut catalog = sample();
        catalog.link_eligible_journal(1, 2);

        let report = catalog.audit();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].code, ErrorCode::IneligibleJournalReference);
        assert_eq!(report.findings[0].entity, EntityKind::Agreement);
        assert_eq!(report.findings[0].id, 1);
    }
}
