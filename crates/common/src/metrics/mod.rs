//! Metrics and observability utilities
//!
//! Counters for the write path and gauges/histograms for the consistency
//! audit, under a common prefix.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

use crate::db::models::EntityKind;
use crate::errors::ErrorCode;
use crate::integrity::AuditReport;

/// Metrics prefix for all Folio metrics
pub const METRICS_PREFIX: &str = "folio";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Entity writes by entity and outcome"
    );

    describe_counter!(
        format!("{}_integrity_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Writes rejected by a referential rule"
    );

    describe_gauge!(
        format!("{}_audit_findings", METRICS_PREFIX),
        Unit::Count,
        "Findings in the latest consistency audit"
    );

    describe_gauge!(
        format!("{}_audit_rows_checked", METRICS_PREFIX),
        Unit::Count,
        "Rows examined by the latest consistency audit"
    );

    describe_histogram!(
        format!("{}_audit_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Consistency audit latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record a successful write
pub fn record_write(entity: EntityKind, operation: &'static str) {
    counter!(
        format!("{}_writes_total", METRICS_PREFIX),
        "entity" => entity.as_str(),
        "operation" => operation,
        "outcome" => "ok"
    )
    .increment(1);
}

/// Record a write rejected before commit
pub fn record_rejection(entity: EntityKind, operation: &'static str, code: ErrorCode) {
    counter!(
        format!("{}_writes_total", METRICS_PREFIX),
        "entity" => entity.as_str(),
        "operation" => operation,
        "outcome" => "rejected"
    )
    .increment(1);

    counter!(
        format!("{}_integrity_rejections_total", METRICS_PREFIX),
        "entity" => entity.as_str(),
        "code" => code.as_str()
    )
    .increment(1);
}

/// Record the outcome of an audit run
pub fn record_audit(report: &AuditReport, duration_secs: f64) {
    gauge!(format!("{}_audit_rows_checked", METRICS_PREFIX)).set(report.rows_checked as f64);
    gauge!(format!("{}_audit_findings", METRICS_PREFIX)).set(report.findings.len() as f64);

    for (code, count) in findings_per_code(report) {
        gauge!(
            format!("{}_audit_findings", METRICS_PREFIX),
            "code" => code.as_str()
        )
        .set(count as f64);
    }

    histogram!(format!("{}_audit_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Finding count for every code, zero included, so a clean run clears
/// the gauges a previous run raised
fn findings_per_code(report: &AuditReport) -> Vec<(ErrorCode, usize)> {
    let counts = report.count_by_code();
    ErrorCode::ALL
        .iter()
        .map(|code| (*code, counts.get(code).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::integrity::{Catalog, Finding};

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call is a no-op
        register_metrics();
        record_write(EntityKind::Journal, "create");
        record_rejection(EntityKind::Agreement, "add_eligible_journal", ErrorCode::IneligibleJournalReference);
        record_audit(&Catalog::default().audit(), 0.01);
    }

    #[test]
    fn test_clean_audit_zeroes_every_code() {
        let clean = Catalog::default().audit();
        let counts = findings_per_code(&clean);
        assert_eq!(counts.len(), ErrorCode::ALL.len());
        assert!(counts.iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn test_findings_counted_per_code() {
        let mut report = Catalog::default().audit();
        let missing = AppError::MissingReference { entity: EntityKind::Journal, id: 9 };
        report.findings.push(Finding::new(EntityKind::Article, 1, &missing));
        report.findings.push(Finding::new(EntityKind::Article, 2, &missing));

        let counts = findings_per_code(&report);
        for (code, count) in counts {
            let expected = if code == ErrorCode::MissingReference { 2 } else { 0 };
            assert_eq!(count, expected, "{}", code.as_str());
        }
    }
}
