//! The diagnostic model: records produced by the extractor and consumed by the repairer.

use crate::error::MenderResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A single compiler-reported error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Absolute path of the file the diagnostic points into.
    pub file_path: PathBuf,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
    /// Diagnostic identifier, e.g. `"TS1005"` or an ESLint rule id.
    pub code: String,
    pub message: String,
}

impl DiagnosticRecord {
    pub fn new(
        file_path: impl Into<PathBuf>,
        line: usize,
        column: usize,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> DiagnosticRecord {
        DiagnosticRecord {
            file_path: file_path.into(),
            line,
            column,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({},{}): error {}: {}",
            self.file_path.display(),
            self.line,
            self.column,
            self.code,
            self.message
        )
    }
}

/// Anything that can produce the current set of diagnostics for a project. Implemented by the
/// compiler-backed extractor; tests substitute `test_util::MockDiagnosticSource`.
pub trait DiagnosticSource {
    /// Returns every diagnostic currently reported, for all codes.
    fn collect(&self) -> MenderResult<Vec<DiagnosticRecord>>;
}

/// Keeps only the records for `code`, preserving order.
pub fn filter_code(records: &[DiagnosticRecord], code: &str) -> Vec<DiagnosticRecord> {
    records.iter().filter(|r| r.code == code).cloned().collect()
}

/// Number of records carrying `code`.
pub fn count_code(records: &[DiagnosticRecord], code: &str) -> usize {
    records.iter().filter(|r| r.code == code).count()
}

/// Number of records per code, sorted by code.
pub fn count_by_code(records: &[DiagnosticRecord]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.code.as_str()).or_default() += 1;
    }
    counts
}

/// Partitions records by file. Within a file, records keep the order they were discovered in.
pub fn group_by_file(records: Vec<DiagnosticRecord>) -> BTreeMap<PathBuf, Vec<DiagnosticRecord>> {
    let mut groups: BTreeMap<PathBuf, Vec<DiagnosticRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.file_path.clone())
            .or_default()
            .push(record);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(file: &str, line: usize, code: &str) -> DiagnosticRecord {
        DiagnosticRecord::new(file, line, 1, code, "msg")
    }

    #[test]
    fn grouping_keeps_discovery_order() {
        let records = vec![
            rec("/p/b.ts", 9, "TS1005"),
            rec("/p/a.ts", 3, "TS1005"),
            rec("/p/b.ts", 2, "TS1003"),
            rec("/p/a.ts", 1, "TS1005"),
        ];
        let groups = group_by_file(records);
        assert_eq!(groups.len(), 2);
        let b: Vec<_> = groups[&PathBuf::from("/p/b.ts")]
            .iter()
            .map(|r| r.line)
            .collect();
        assert_eq!(b, [9, 2]);
        let a: Vec<_> = groups[&PathBuf::from("/p/a.ts")]
            .iter()
            .map(|r| r.line)
            .collect();
        assert_eq!(a, [3, 1]);
    }

    #[test]
    fn filtering_by_code() {
        let records = vec![
            rec("/p/a.ts", 1, "TS1005"),
            rec("/p/a.ts", 2, "TS1003"),
            rec("/p/a.ts", 3, "TS1005"),
        ];
        assert_eq!(count_code(&records, "TS1005"), 2);
        assert_eq!(count_code(&records, "TS2304"), 0);
        let only: Vec<_> = filter_code(&records, "TS1003")
            .into_iter()
            .map(|r| r.line)
            .collect();
        assert_eq!(only, [2]);
        let counts = count_by_code(&records);
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), [("TS1003", 1), ("TS1005", 2)]);
    }

    #[test]
    fn display_matches_tsc_shape() {
        let r = DiagnosticRecord::new("/p/a.ts", 4, 7, "TS1005", "';' expected.");
        assert_eq!(r.to_string(), "/p/a.ts(4,7): error TS1005: ';' expected.");
    }
}
