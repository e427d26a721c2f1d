//! Audit runner
//!
//! Loads a catalog snapshot from a [`CatalogSource`], audits it and reports
//! the outcome through logs and metrics.

use folio_common::{metrics, AuditReport, CatalogSource, Result};
use std::time::Instant;
use tracing::{info, warn};

pub struct AuditRunner<S> {
    source: S,
}

impl<S: CatalogSource> AuditRunner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run one audit pass
    pub async fn run_once(&self) -> Result<AuditReport> {
        let started = Instant::now();

        let catalog = self.source.load_catalog().await?;
        let report = catalog.audit();

        let duration = started.elapsed().as_secs_f64();
        metrics::record_audit(&report, duration);
        log_report(&report, duration);

        Ok(report)
    }
}

fn log_report(report: &AuditReport, duration: f64) {
    if report.is_clean() {
        info!(
            run_id = %report.run_id,
            rows = report.rows_checked,
            duration_secs = duration,
            "Audit clean"
        );
        return;
    }

    for finding in &report.findings {
        warn!(
            run_id = %report.run_id,
            entity = %finding.entity,
            id = finding.id,
            code = finding.code.as_str(),
            "{}", finding.message
        );
    }

    for (code, count) in report.count_by_code() {
        warn!(run_id = %report.run_id, code = code.as_str(), count, "Audit findings");
    }

    warn!(
        run_id = %report.run_id,
        rows = report.rows_checked,
        findings = report.findings.len(),
        duration_secs = duration,
        "Audit found violations"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use folio_common::db::models::{Agreement, Institution, Publisher};
    use folio_common::{AppError, Catalog, ErrorCode};
    use tokio_test::{assert_err, assert_ok};

    struct Fixed(Catalog);

    #[async_trait]
    impl CatalogSource for Fixed {
        async fn load_catalog(&self) -> Result<Catalog> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CatalogSource for Unreachable {
        async fn load_catalog(&self) -> Result<Catalog> {
            Err(AppError::DatabaseConnection { message: "connection refused".into() })
        }
    }

    fn catalog(end: NaiveDate) -> Catalog {
        let mut catalog = Catalog::default();
        catalog.insert_publisher(Publisher {
            id: 1,
            name: "Acme Press".into(),
            contact_info: String::new(),
            address: String::new(),
            website: None,
        });
        catalog.insert_institution(Institution {
            id: 1,
            name: "Brown University".into(),
            contact_details: String::new(),
            institution_type: "Academic".into(),
        });
        catalog.insert_agreement(Agreement {
            id: 1,
            publisher_id: 1,
            institution_id: 1,
            agreement_type: "Publishing".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: end,
            discount_details: None,
        });
        catalog
    }

    #[tokio::test]
    async fn test_clean_run() {
        let runner = AuditRunner::new(Fixed(catalog(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())));
        let report = assert_ok!(runner.run_once().await);
        assert!(report.is_clean());
        assert_eq!(report.rows_checked, 3);
    }

    #[tokio::test]
    async fn test_findings_reported() {
        let runner = AuditRunner::new(Fixed(catalog(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())));
        let report = assert_ok!(runner.run_once().await);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].code, ErrorCode::InvalidDateRange);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let runner = AuditRunner::new(Unreachable);
        let err = assert_err!(runner.run_once().await);
        assert_eq!(err.code(), ErrorCode::ConnectionError);
    }
}
