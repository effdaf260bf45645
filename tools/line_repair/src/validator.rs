//! Re-runs the compiler after a live run and compares counts with the baseline.

use mender_core::{DiagnosticSource, MenderResult, count_code};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub target_code: String,
    pub before_target_count: usize,
    pub after_target_count: usize,
    pub before_total_count: usize,
    pub after_total_count: usize,
    /// Target diagnostics removed. Negative if the run introduced more.
    pub net_improvement: i64,
    /// The target count did not rise and the total did not rise either, so no error was traded
    /// for another.
    pub success: bool,
    pub failures: Vec<String>,
}

impl ValidationReport {
    pub fn from_counts(
        target_code: &str,
        before_target_count: usize,
        after_target_count: usize,
        before_total_count: usize,
        after_total_count: usize,
    ) -> ValidationReport {
        let target_reduction = before_target_count as i64 - after_target_count as i64;
        let total_change = after_total_count as i64 - before_total_count as i64;

        let mut failures = Vec::new();
        if target_reduction < 0 {
            failures.push(format!(
                "{target_code} diagnostics rose from {before_target_count} to {after_target_count}"
            ));
        }
        if total_change > 0 {
            failures.push(format!(
                "total diagnostics rose from {before_total_count} to {after_total_count}"
            ));
        }

        ValidationReport {
            target_code: target_code.to_string(),
            before_target_count,
            after_target_count,
            before_total_count,
            after_total_count,
            net_improvement: target_reduction,
            success: failures.is_empty(),
            failures,
        }
    }
}

/// Collects fresh diagnostics from `source` and judges them against the baseline counts.
pub fn validate(
    source: &dyn DiagnosticSource,
    target_code: &str,
    before_target_count: usize,
    before_total_count: usize,
) -> MenderResult<ValidationReport> {
    info!("Recompiling to validate...");
    let after = source.collect()?;
    let report = ValidationReport::from_counts(
        target_code,
        before_target_count,
        count_code(&after, target_code),
        before_total_count,
        after.len(),
    );
    if report.success {
        info!(
            "✅ {}: {} -> {} ({} total -> {})",
            target_code,
            report.before_target_count,
            report.after_target_count,
            report.before_total_count,
            report.after_total_count
        );
    } else {
        for failure in &report.failures {
            warn!("Validation failed: {failure}");
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_core::test_util::MockDiagnosticSource;
    use mender_core::{DiagnosticRecord, MenderError};

    fn records(codes: &[&str]) -> Vec<DiagnosticRecord> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| DiagnosticRecord::new("/p/a.ts", i + 1, 1, *code, ""))
            .collect()
    }

    #[test]
    fn improvement() {
        let report = ValidationReport::from_counts("TS1005", 5, 1, 9, 5);
        assert!(report.success);
        assert_eq!(report.net_improvement, 4);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn no_change_is_not_a_failure() {
        let report = ValidationReport::from_counts("TS1005", 3, 3, 3, 3);
        assert!(report.success);
        assert_eq!(report.net_improvement, 0);
    }

    #[test]
    fn trading_one_error_for_another_fails() {
        let report = ValidationReport::from_counts("TS1005", 2, 0, 4, 6);
        assert!(!report.success);
        assert_eq!(report.net_improvement, 2);
        assert_eq!(report.failures, ["total diagnostics rose from 4 to 6"]);
    }

    #[test]
    fn target_regression_fails() {
        let report = ValidationReport::from_counts("TS1003", 1, 3, 1, 3);
        assert!(!report.success);
        assert_eq!(report.net_improvement, -2);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn validate_recompiles_once() {
        let source = MockDiagnosticSource::new().then(records(&["TS1005", "TS2304"]));
        let report = validate(&source, "TS1005", 3, 5).unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(report.after_target_count, 1);
        assert_eq!(report.after_total_count, 2);
        assert!(report.success);
    }

    #[test]
    fn compiler_failure_propagates() {
        let source = MockDiagnosticSource::new().then_fail(MenderError::CompilerLaunch {
            program: "npx".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(validate(&source, "TS1005", 1, 1).is_err());
    }
}
