//! Referential integrity rules for the publishing model
//!
//! Provides:
//! - Pure rule functions shared by the repository and the in-memory catalog
//! - [`Catalog`], an arena of every entity keyed by identifier
//! - [`AuditReport`], the result of checking a whole catalog

mod audit;
mod catalog;

pub use audit::{AuditReport, Finding};
pub use catalog::{Catalog, PolicyChain};

use crate::db::models::{Agreement, EntityKind, Journal};
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Maximum number of parent hops from any pricing policy to its root
pub const DEFAULT_MAX_POLICY_DEPTH: usize = 32;

/// `start` must not come after `end`
pub fn check_date_range(subject: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(AppError::InvalidDateRange {
            subject: subject.to_string(),
            start,
            end,
        });
    }
    Ok(())
}

/// Walk parent links from `start` to a root policy.
///
/// `parent_of` returns `None` when the policy does not exist and
/// `Some(parent)` otherwise. The returned chain starts at `start` and ends
/// at the root; it never holds more than `max_depth` hops.
pub fn walk_policy_chain<F>(start: i32, max_depth: usize, mut parent_of: F) -> Result<Vec<i32>>
where
    F: FnMut(i32) -> Option<Option<i32>>,
{
    let mut chain = vec![start];
    let mut next = parent_of(start).ok_or(AppError::MissingReference {
        entity: EntityKind::PricingPolicy,
        id: start,
    })?;

    while let Some(parent) = next {
        if let Some(pos) = chain.iter().position(|&id| id == parent) {
            let mut cycle = chain[pos..].to_vec();
            cycle.push(parent);
            return Err(AppError::CyclicPolicyAncestry { policy_id: start, cycle });
        }

        if chain.len() > max_depth {
            return Err(AppError::PolicyChainTooDeep { policy_id: start, max_depth });
        }

        next = parent_of(parent).ok_or(AppError::MissingReference {
            entity: EntityKind::PricingPolicy,
            id: parent,
        })?;
        chain.push(parent);
    }

    Ok(chain)
}

/// An agreement may only list journals of its own publisher
pub fn check_eligible_journal(agreement_publisher_id: i32, journal: &Journal) -> Result<()> {
    if journal.publisher_id != agreement_publisher_id {
        return Err(AppError::IneligibleJournalReference {
            journal_id: journal.id,
            journal_publisher_id: journal.publisher_id,
            agreement_publisher_id,
        });
    }
    Ok(())
}

/// Whether `agreement` covers a charge for `journal_id` on `date`
pub fn agreement_covers(
    agreement: &Agreement,
    eligible_journal_ids: &BTreeSet<i32>,
    journal_id: i32,
    date: NaiveDate,
) -> bool {
    agreement.is_active_on(date) && eligible_journal_ids.contains(&journal_id)
}
