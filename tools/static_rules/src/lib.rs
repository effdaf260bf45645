//! Runs the rule catalog over whole files without a compiler, in the style of a lint pass.
//!
//! Only rules that stand on their own qualify: a rule with a guard needs neighbouring lines or a
//! diagnostic message to be trusted, and compile-only rules are too eager without a compiler
//! confirming there is an error at all. Matches inside string literals and comments are skipped.

pub mod files;

pub use files::{FileFindings, fix_paths, scan_paths};

use mender_core::rules::{LiteralSpans, RuleCatalog, RuleEntry, Severity};
use serde::Serialize;
use tracing::debug;

/// A suggested replacement for `start..end` (byte offsets) of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: &'static str,
    pub severity: Severity,
    /// 1-indexed.
    pub line: usize,
    /// 1-indexed, in characters.
    pub column: usize,
    pub matched: String,
    pub message: &'static str,
    pub fix: Option<TextEdit>,
}

/// The subset of a catalog usable without a compiler.
#[derive(Debug, Clone)]
pub struct StaticRuleSet {
    rules: Vec<RuleEntry>,
}

impl StaticRuleSet {
    pub fn from_catalog(catalog: &RuleCatalog) -> StaticRuleSet {
        let rules: Vec<RuleEntry> = catalog
            .all_rules()
            .into_iter()
            .filter(|rule| rule.is_static())
            .cloned()
            .collect();
        debug!("{} static rules", rules.len());
        StaticRuleSet { rules }
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// Every match of every rule in `text`, ordered by position.
    pub fn scan(&self, text: &str) -> Vec<Finding> {
        let index = LineIndex::new(text);
        let literals = LiteralSpans::new(text);
        let mut findings = Vec::new();
        for rule in &self.rules {
            for caps in rule.code_matches(text, &literals) {
                let Some(whole) = caps.get(0) else { continue };
                let (line, column) = index.position(text, whole.start());
                findings.push(Finding {
                    rule: rule.name,
                    severity: rule.severity,
                    line,
                    column,
                    matched: whole.as_str().to_string(),
                    message: rule.description,
                    fix: rule.suggest(&caps).map(|replacement| TextEdit {
                        start: whole.start(),
                        end: whole.end(),
                        replacement,
                    }),
                });
            }
        }
        // Stable, so rules matching at the same spot keep catalog order.
        findings.sort_by_key(|f| (f.line, f.column));
        findings
    }
}

/// Applies the fixes carried by `findings` to `text`. Where fixes overlap, the one starting
/// first wins and the others are dropped. Returns the new text and the number of fixes applied.
pub fn apply_fixes(text: &str, findings: &[Finding]) -> (String, usize) {
    let mut edits: Vec<&TextEdit> = findings.iter().filter_map(|f| f.fix.as_ref()).collect();
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut applied = 0;
    for edit in edits {
        if edit.start < last {
            debug!("dropping overlapping fix at byte {}", edit.start);
            continue;
        }
        out.push_str(&text[last..edit.start]);
        out.push_str(&edit.replacement);
        last = edit.end;
        applied += 1;
    }
    out.push_str(&text[last..]);
    (out, applied)
}

/// Byte offset to line/column lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> LineIndex {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    fn position(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        (line, text[start..offset].chars().count() + 1)
    }
}
