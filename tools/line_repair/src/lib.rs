//! Post-compile repair of one diagnostic code across a project.
//!
//! A run:
//! 1. Collects diagnostics once and records the baseline counts
//! 2. Groups the target code's diagnostics by file
//! 3. Repairs each file from the rule catalog (previewing only, unless live)
//! 4. After a live run, recompiles and checks that nothing got worse

pub mod file_fixer;
pub mod repairer;
pub mod validator;

pub use file_fixer::{EditResult, PlannedEdit, fix_content, fix_file, plan_edits};
pub use repairer::{LineRepairer, Repair};
pub use validator::{ValidationReport, validate};

use chrono::{DateTime, Utc};
use mender_core::rules::RuleCatalog;
use mender_core::{DiagnosticSource, MenderError, MenderResult, filter_code, group_by_file};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Diagnostic code to repair, e.g. `"TS1005"`.
    pub target_code: String,
    /// Compute and report edits without writing any file.
    pub dry_run: bool,
}

/// Per-file record in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file_path: PathBuf,
    pub diagnostics: usize,
    pub edits_applied: usize,
    pub rules: Vec<String>,
    pub written: bool,
    /// Set when the file could not be read or written and was left alone.
    pub skipped: Option<String>,
}

/// Summary of one repair run, saved as JSON when a report path is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairSummary {
    pub target_code: String,
    pub dry_run: bool,
    pub total_diagnostics: usize,
    pub target_diagnostics: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub edits_applied: usize,
    pub files: Vec<FileOutcome>,
    /// Only present after a live run.
    pub validation: Option<ValidationReport>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl RepairSummary {
    /// Whether the run did what it set out to do. A dry run always succeeds.
    pub fn success(&self) -> bool {
        self.validation.as_ref().is_none_or(|v| v.success)
    }

    pub fn save(&self, path: &Path) -> MenderResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| MenderError::io(path, e))?;
        debug!("Saved summary to {}", path.display());
        Ok(())
    }
}

/// Runs one repair pass for `options.target_code`.
///
/// Per-file I/O failures are logged and the file is skipped. Failing to run the compiler is
/// fatal, before or after the pass.
pub fn run_repair(
    source: &dyn DiagnosticSource,
    catalog: &RuleCatalog,
    options: &RepairOptions,
) -> MenderResult<RepairSummary> {
    let start_time = Utc::now();
    let code = options.target_code.as_str();
    let mode = if options.dry_run { "dry run" } else { "live" };
    info!("=== Repairing {} ({}) ===", code, mode);

    let all = source.collect()?;
    let targets = filter_code(&all, code);
    let total_diagnostics = all.len();
    let target_diagnostics = targets.len();
    info!("Found {target_diagnostics} {code} diagnostics ({total_diagnostics} total)");
    if catalog.rules_for(code).count() == 0 {
        warn!("No rules registered for {code}");
    }

    let repairer = LineRepairer::new(catalog);
    let mut files = Vec::new();
    for (file_path, batch) in group_by_file(targets) {
        info!("Fixing {} ({} diagnostics)", file_path.display(), batch.len());
        let outcome = match fix_file(&file_path, &batch, &repairer, options.dry_run) {
            Ok(result) => {
                if result.edits_applied > 0 {
                    info!(
                        "  ✓ {} {} edit(s) in {}",
                        if result.written { "Applied" } else { "Would apply" },
                        result.edits_applied,
                        file_path.display()
                    );
                }
                FileOutcome {
                    diagnostics: batch.len(),
                    edits_applied: result.edits_applied,
                    rules: result.rules().map(str::to_string).collect(),
                    written: result.written,
                    skipped: None,
                    file_path,
                }
            }
            Err(e) if !e.is_fatal() => {
                warn!("  ✗ Skipping {}: {}", file_path.display(), e);
                FileOutcome {
                    diagnostics: batch.len(),
                    edits_applied: 0,
                    rules: vec![],
                    written: false,
                    skipped: Some(e.to_string()),
                    file_path,
                }
            }
            Err(e) => return Err(e),
        };
        files.push(outcome);
    }

    let files_skipped = files.iter().filter(|f| f.skipped.is_some()).count();
    let edits_applied = files.iter().map(|f| f.edits_applied).sum();
    info!(
        "{} edit(s) across {} file(s), {} skipped",
        edits_applied,
        files.len() - files_skipped,
        files_skipped
    );

    let validation = if options.dry_run {
        None
    } else {
        Some(validate(source, code, target_diagnostics, total_diagnostics)?)
    };

    Ok(RepairSummary {
        target_code: code.to_string(),
        dry_run: options.dry_run,
        total_diagnostics,
        target_diagnostics,
        files_processed: files.len() - files_skipped,
        files_skipped,
        edits_applied,
        files,
        validation,
        start_time,
        end_time: Utc::now(),
    })
}

#[cfg(all(test, not(miri)))]
mod tests;
