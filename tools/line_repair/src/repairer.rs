//! Picks the repair for a single diagnostic from the rule catalog.

use mender_core::DiagnosticRecord;
use mender_core::rules::{LineContext, Rewrite, RuleCatalog};
use tracing::{debug, trace};

/// A rewrite of the window ending at the diagnostic's line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub rule: &'static str,
    /// How many lines above the diagnostic's line `text` also replaces.
    pub lines_before: usize,
    /// Replacement for the whole window. May contain `\n`.
    pub text: String,
}

/// Dispatches diagnostics to the catalog's rules. The catalog is built once by the caller.
#[derive(Clone, Copy)]
pub struct LineRepairer<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> LineRepairer<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> LineRepairer<'a> {
        LineRepairer { catalog }
    }

    /// Tries the rules for `record.code` in order. The first rule that matches decides: if it
    /// has a working fixer the repair is returned, if it is detector-only the line is left for
    /// manual repair. Rules whose fixer fails or changes nothing are passed over.
    pub fn repair(
        &self,
        record: &DiagnosticRecord,
        current: &str,
        previous: Option<&str>,
        next: Option<&str>,
    ) -> Option<Repair> {
        let ctx = LineContext {
            previous,
            current,
            next,
            diagnostic: Some(record),
        };
        for rule in self.catalog.rules_for(&record.code) {
            match rule.evaluate(&ctx) {
                Rewrite::Changed(text) => {
                    debug!(
                        "{}:{} {} fixed by {}",
                        record.file_path.display(),
                        record.line,
                        record.code,
                        rule.name
                    );
                    return Some(Repair {
                        rule: rule.name,
                        lines_before: rule.window.lines_before(),
                        text,
                    });
                }
                Rewrite::Flagged => {
                    debug!(
                        "{}:{} {} matched {}, left for manual repair",
                        record.file_path.display(),
                        record.line,
                        record.code,
                        rule.name
                    );
                    return None;
                }
                Rewrite::Unchanged => trace!("{} matched without a usable fix", rule.name),
                Rewrite::Unmatched => {}
            }
        }
        None
    }

    /// Like [`LineRepairer::repair`], reading the window out of `lines`. A diagnostic that points
    /// outside the file (stale output from an earlier version) yields `None`.
    pub fn repair_at(&self, record: &DiagnosticRecord, lines: &[String]) -> Option<Repair> {
        if record.line == 0 || record.line > lines.len() {
            debug!(
                "{}:{} is outside the file ({} lines), skipping",
                record.file_path.display(),
                record.line,
                lines.len()
            );
            return None;
        }
        let index = record.line - 1;
        let previous = index.checked_sub(1).map(|i| lines[i].as_str());
        let next = lines.get(index + 1).map(String::as_str);
        self.repair(record, &lines[index], previous, next)
    }
}
