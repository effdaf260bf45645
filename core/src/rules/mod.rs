//! The rule catalog: per-diagnostic-code lists of (detector, optional fixer) pairs.
//!
//! Rules are plain data. The post-compile repairer evaluates them against a small window of lines
//! around a diagnostic; the static scanner runs the same patterns over whole documents. Every
//! pattern is compiled in multi-line mode so `^`/`$` anchor to line boundaries in both settings.
//! A match that starts inside a string literal or comment is ignored in both.
//!
//! Rules are deliberately narrow: a rule should only fire when local context alone identifies a
//! malformed pattern with a single unambiguous repair. Anything else is left alone.

mod literals;
mod typescript;

pub use literals::LiteralSpans;

use crate::diagnostic::DiagnosticRecord;
use crate::error::MenderResult;
use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Lines visible to a rule. `previous` and `next` are `None` at the edges of the file.
#[derive(Clone, Copy, Debug)]
pub struct LineContext<'a> {
    pub previous: Option<&'a str>,
    pub current: &'a str,
    pub next: Option<&'a str>,
    pub diagnostic: Option<&'a DiagnosticRecord>,
}

impl<'a> LineContext<'a> {
    /// A context with no surrounding lines and no diagnostic.
    pub fn line(current: &'a str) -> LineContext<'a> {
        LineContext {
            previous: None,
            current,
            next: None,
            diagnostic: None,
        }
    }

    /// The diagnostic message, or `""` if there is no diagnostic.
    pub fn message(&self) -> &str {
        self.diagnostic.map_or("", |d| d.message.as_str())
    }
}

/// Semantic precondition over the line window. Must not have side effects.
pub type Guard = fn(&LineContext<'_>) -> bool;

/// Computes the replacement for one match. Group 0 is the matched text. Returning `None`, or text
/// identical to the match, means no fix is available.
pub type Fixer = fn(&Captures<'_>) -> Option<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// How many lines a rule's pattern sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    /// The current line only.
    Line,
    /// The previous line and the current line, joined by `\n`. A replacement collapses both.
    WithPrevious,
}

impl Window {
    /// Number of lines above the current line that the window covers.
    pub fn lines_before(self) -> usize {
        match self {
            Window::Line => 0,
            Window::WithPrevious => 1,
        }
    }
}

/// Result of evaluating one rule against some text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rewrite {
    /// The pattern did not match (or the guard rejected the window).
    Unmatched,
    /// The pattern matched a rule that has no fixer.
    Flagged,
    /// The pattern matched but the fixer produced nothing new.
    Unchanged,
    /// The full rewritten window text.
    Changed(String),
}

/// One (detector, optional fixer) pair.
#[derive(Clone, Debug)]
pub struct RuleEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub window: Window,
    pub pattern: Regex,
    pub guard: Option<Guard>,
    pub fixer: Option<Fixer>,
    /// Only rewrite the first match in the window.
    pub first_only: bool,
    /// The rule needs a compiler diagnostic to be trustworthy and is never run by the static
    /// scanner, even without a guard.
    pub compile_only: bool,
}

impl RuleEntry {
    /// Creates a detector-only rule. `pattern` is compiled in multi-line mode, with `\r\n`
    /// treated as a line terminator.
    pub fn new(name: &'static str, pattern: &str) -> MenderResult<RuleEntry> {
        Ok(RuleEntry {
            name,
            description: "",
            severity: Severity::Error,
            window: Window::Line,
            pattern: Regex::new(&format!("(?mR){pattern}"))?,
            guard: None,
            fixer: None,
            first_only: false,
            compile_only: false,
        })
    }

    pub fn describe(mut self, description: &'static str) -> RuleEntry {
        self.description = description;
        self
    }

    pub fn severity(mut self, severity: Severity) -> RuleEntry {
        self.severity = severity;
        self
    }

    pub fn window(mut self, window: Window) -> RuleEntry {
        self.window = window;
        self
    }

    pub fn guard(mut self, guard: Guard) -> RuleEntry {
        self.guard = Some(guard);
        self
    }

    pub fn fixer(mut self, fixer: Fixer) -> RuleEntry {
        self.fixer = Some(fixer);
        self
    }

    pub fn first_only(mut self) -> RuleEntry {
        self.first_only = true;
        self
    }

    pub fn compile_only(mut self) -> RuleEntry {
        self.compile_only = true;
        self
    }

    /// Whether the static scanner may run this rule: it must not depend on a guard or on a
    /// compiler diagnostic.
    pub fn is_static(&self) -> bool {
        self.guard.is_none() && !self.compile_only
    }

    /// The fix for a single match, if there is one that actually changes the text.
    pub fn suggest(&self, caps: &Captures<'_>) -> Option<String> {
        let fixer = self.fixer?;
        let matched = caps.get(0)?.as_str();
        fixer(caps).filter(|replacement| replacement != matched)
    }

    /// Matches of the pattern that start in code, given the literal spans of `text`.
    pub fn code_matches<'t>(
        &self,
        text: &'t str,
        literals: &LiteralSpans,
    ) -> impl Iterator<Item = Captures<'t>> {
        self.pattern
            .captures_iter(text)
            .filter(move |caps| caps.get(0).is_some_and(|m| !literals.contains(m.start())))
    }

    /// Evaluates the rule against a line window: the guard first, then the pattern over the
    /// window text.
    pub fn evaluate(&self, ctx: &LineContext<'_>) -> Rewrite {
        if let Some(guard) = self.guard {
            if !guard(ctx) {
                return Rewrite::Unmatched;
            }
        }
        let text: Cow<str> = match self.window {
            Window::Line => Cow::Borrowed(ctx.current),
            Window::WithPrevious => match ctx.previous {
                Some(previous) => Cow::Owned(format!("{previous}\n{}", ctx.current)),
                None => return Rewrite::Unmatched,
            },
        };
        self.rewrite(&text)
    }

    /// Applies the rule to `text` with no context. Matches whose fix is unavailable are left as
    /// they are.
    pub fn rewrite(&self, text: &str) -> Rewrite {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut matched = false;
        let mut changed = false;
        let literals = LiteralSpans::new(text);
        for caps in self.code_matches(text, &literals) {
            let Some(whole) = caps.get(0) else { continue };
            matched = true;
            if self.fixer.is_none() {
                return Rewrite::Flagged;
            }
            if let Some(replacement) = self.suggest(&caps) {
                out.push_str(&text[last..whole.start()]);
                out.push_str(&replacement);
                last = whole.end();
                changed = true;
                if self.first_only {
                    break;
                }
            }
        }
        match (matched, changed) {
            (false, _) => Rewrite::Unmatched,
            (true, false) => Rewrite::Unchanged,
            (true, true) => {
                out.push_str(&text[last..]);
                Rewrite::Changed(out)
            }
        }
    }
}

/// Mapping from diagnostic code to its ordered rules, plus universal rules that are consulted
/// (first) for every code. Order is precedence.
#[derive(Clone, Debug, Default)]
pub struct RuleCatalog {
    universal: Vec<RuleEntry>,
    by_code: HashMap<String, Vec<RuleEntry>>,
}

impl RuleCatalog {
    /// An empty catalog.
    pub fn new() -> RuleCatalog {
        RuleCatalog::default()
    }

    /// The catalog for TypeScript compiler codes and the typescript-eslint rules the repair
    /// scripts handle.
    pub fn typescript() -> MenderResult<RuleCatalog> {
        typescript::catalog()
    }

    /// Appends a rule for `code`.
    pub fn insert(&mut self, code: &str, rule: RuleEntry) -> &mut RuleCatalog {
        self.by_code.entry(code.to_string()).or_default().push(rule);
        self
    }

    /// Appends a rule that applies to every code.
    pub fn insert_universal(&mut self, rule: RuleEntry) -> &mut RuleCatalog {
        self.universal.push(rule);
        self
    }

    /// Rules to try for `code`, in precedence order.
    pub fn rules_for<'a>(&'a self, code: &str) -> impl Iterator<Item = &'a RuleEntry> + use<'a> {
        self.universal.iter().chain(self.specific(code))
    }

    pub fn universal(&self) -> &[RuleEntry] {
        &self.universal
    }

    /// Rules registered for `code` alone.
    pub fn specific(&self, code: &str) -> &[RuleEntry] {
        self.by_code.get(code).map(Vec::as_slice).unwrap_or_default()
    }

    /// Codes with at least one specific rule, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.by_code.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// Every rule once, universal rules first, then by code. A rule registered under several
    /// codes appears once.
    pub fn all_rules(&self) -> Vec<&RuleEntry> {
        let mut seen = Vec::new();
        let mut rules = Vec::new();
        let specific = self.codes().into_iter().flat_map(|c| &self.by_code[c]);
        for rule in self.universal.iter().chain(specific) {
            if !seen.contains(&rule.name) {
                seen.push(rule.name);
                rules.push(rule);
            }
        }
        rules
    }
}
