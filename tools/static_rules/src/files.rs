//! Walking source trees for the static scanner.

use crate::{Finding, StaticRuleSet, apply_fixes};
use mender_core::config::ScanConfig;
use mender_core::{MenderError, MenderResult, write_atomically};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Serialize)]
pub struct FileFindings {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
    /// Fixes written back. Always zero unless fixing.
    pub fixes_applied: usize,
}

/// Source files under `roots` with one of the configured extensions, skipping excluded
/// directories. A root that is itself a file is always included.
pub fn source_files(roots: &[PathBuf], config: &ScanConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry, config));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot walk {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && (entry.depth() == 0 || has_extension(entry.path(), config))
            {
                files.push(entry.into_path());
            }
        }
    }
    files
}

fn is_excluded(entry: &DirEntry, config: &ScanConfig) -> bool {
    entry.file_type().is_dir()
        && config
            .exclude_dirs
            .iter()
            .any(|name| entry.file_name() == name.as_str())
}

fn has_extension(path: &Path, config: &ScanConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config.extensions.iter().any(|e| e == ext))
}

/// Scans every source file under `roots`. Files that cannot be read are logged and left out.
pub fn scan_paths(rules: &StaticRuleSet, roots: &[PathBuf], config: &ScanConfig) -> Vec<FileFindings> {
    visit(roots, config, |path| scan_file(rules, path, false))
}

/// Like [`scan_paths`], also writing the fixable findings back to each file.
pub fn fix_paths(rules: &StaticRuleSet, roots: &[PathBuf], config: &ScanConfig) -> Vec<FileFindings> {
    visit(roots, config, |path| scan_file(rules, path, true))
}

fn visit(
    roots: &[PathBuf],
    config: &ScanConfig,
    mut per_file: impl FnMut(&Path) -> MenderResult<FileFindings>,
) -> Vec<FileFindings> {
    let files = source_files(roots, config);
    info!("Scanning {} files", files.len());
    let mut results = Vec::new();
    for path in files {
        match per_file(&path) {
            Ok(result) if result.findings.is_empty() => {}
            Ok(result) => results.push(result),
            Err(e) => warn!("  ✗ Skipping {}: {}", path.display(), e),
        }
    }
    results
}

/// Scans one file, and if `fix` is set writes the fixable findings back atomically.
pub fn scan_file(rules: &StaticRuleSet, path: &Path, fix: bool) -> MenderResult<FileFindings> {
    let text = fs::read_to_string(path).map_err(|e| MenderError::io(path, e))?;
    let findings = rules.scan(&text);
    let mut fixes_applied = 0;
    if fix && findings.iter().any(|f| f.fix.is_some()) {
        let (fixed, applied) = apply_fixes(&text, &findings);
        if fixed != text {
            write_atomically(path, &fixed)?;
            fixes_applied = applied;
            debug!("Applied {} fixes to {}", applied, path.display());
        }
    }
    Ok(FileFindings {
        path: path.to_path_buf(),
        findings,
        fixes_applied,
    })
}
