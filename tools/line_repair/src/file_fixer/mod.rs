//! Applies one file's batch of diagnostics without letting earlier edits shift later ones.
//!
//! Repairs are planned against the file as it was when the compiler saw it, bottom-up, and only
//! then spliced into the line buffer (also bottom-up). A diagnostic's line number therefore
//! always refers to the text it was reported against.

use crate::repairer::LineRepairer;
use mender_core::{DiagnosticRecord, MenderError, MenderResult, write_atomically};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A replacement of the 1-indexed inclusive line range `first_line..=last_line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEdit {
    pub first_line: usize,
    pub last_line: usize,
    pub replacement: Vec<String>,
    /// Rules applied, in application order. One per repaired diagnostic.
    pub rules: Vec<&'static str>,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    pub file_path: PathBuf,
    pub final_content: String,
    /// Number of diagnostics that changed the file.
    pub edits_applied: usize,
    pub edits: Vec<PlannedEdit>,
    /// Whether `final_content` was written back to disk.
    pub written: bool,
}

impl EditResult {
    pub fn rules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edits.iter().flat_map(|e| e.rules.iter().copied())
    }
}

/// File text split into lines, remembering each line's terminator so that untouched lines are
/// reproduced byte for byte.
#[derive(Debug, Default)]
struct LineBuffer {
    lines: Vec<String>,
    endings: Vec<&'static str>,
}

impl LineBuffer {
    fn parse(content: &str) -> LineBuffer {
        let mut buffer = LineBuffer::default();
        for piece in content.split_inclusive('\n') {
            let (body, ending) = if let Some(body) = piece.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = piece.strip_suffix('\n') {
                (body, "\n")
            } else {
                (piece, "")
            };
            buffer.lines.push(body.to_string());
            buffer.endings.push(ending);
        }
        buffer
    }

    /// Edits must not overlap. They are applied from the bottom of the file up.
    fn apply(&mut self, edits: &[PlannedEdit]) {
        let mut ordered: Vec<&PlannedEdit> = edits.iter().collect();
        ordered.sort_by(|a, b| b.first_line.cmp(&a.first_line));
        for edit in ordered {
            let range = edit.first_line - 1..edit.last_line;
            // Added lines take the terminator of the last replaced line, which keeps the
            // file's convention and its final-newline state.
            let ending = self.endings[edit.last_line - 1];
            let count = edit.replacement.len();
            let inner = match ending {
                "" => self
                    .endings
                    .iter()
                    .copied()
                    .find(|e| !e.is_empty())
                    .unwrap_or("\n"),
                ending => ending,
            };
            self.lines
                .splice(range.clone(), edit.replacement.iter().cloned());
            self.endings.splice(
                range,
                (0..count).map(|i| if i + 1 == count { ending } else { inner }),
            );
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            out.push_str(line);
            out.push_str(ending);
        }
        out
    }
}

/// Sorts records so the bottom-most, right-most diagnostic comes first.
pub fn sort_bottom_up(batch: &mut [DiagnosticRecord]) {
    batch.sort_by(|a, b| (b.line, b.column).cmp(&(a.line, a.column)));
}

/// Plans repairs for `batch` against `lines`, the file as the compiler saw it.
///
/// Diagnostics sharing a line are folded right to left into one edit. A repair that also
/// rewrites the line above claims it: diagnostics on claimed lines are skipped rather than
/// applied to text that no longer exists. Diagnostics outside the file are skipped.
pub fn plan_edits(
    lines: &[String],
    batch: &[DiagnosticRecord],
    repairer: &LineRepairer<'_>,
) -> Vec<PlannedEdit> {
    let mut ordered = batch.to_vec();
    sort_bottom_up(&mut ordered);

    let mut edits = Vec::new();
    // Lowest line touched by a planned edit. Everything at or below it is spoken for.
    let mut claimed_from = usize::MAX;
    for group in ordered.chunk_by(|a, b| a.line == b.line) {
        let line = group[0].line;
        if line == 0 || line > lines.len() {
            debug!(
                "{}:{} is outside the file ({} lines), skipping {} diagnostic(s)",
                group[0].file_path.display(),
                line,
                lines.len(),
                group.len()
            );
            continue;
        }
        if line >= claimed_from {
            trace!("line {line} already rewritten by a joining repair, skipping");
            continue;
        }

        let index = line - 1;
        let previous = index.checked_sub(1).map(|i| lines[i].as_str());
        let next = lines.get(index + 1).map(String::as_str);
        let mut current = lines[index].clone();
        let mut first_line = line;
        let mut rules = Vec::new();
        for record in group {
            let Some(repair) = repairer.repair(record, &current, previous, next) else {
                continue;
            };
            rules.push(repair.rule);
            current = repair.text;
            if repair.lines_before > 0 {
                // The window now spans several lines; the remaining same-line diagnostics'
                // columns no longer point at anything meaningful.
                first_line = line - repair.lines_before;
                break;
            }
        }
        if rules.is_empty() {
            continue;
        }
        edits.push(PlannedEdit {
            first_line,
            last_line: line,
            replacement: current.split('\n').map(str::to_string).collect(),
            rules,
        });
        claimed_from = first_line;
    }
    edits
}

/// Repairs `content` in memory.
pub fn fix_content(
    file_path: &Path,
    content: &str,
    batch: &[DiagnosticRecord],
    repairer: &LineRepairer<'_>,
) -> EditResult {
    let mut buffer = LineBuffer::parse(content);
    let edits = plan_edits(&buffer.lines, batch, repairer);
    let edits_applied = edits.iter().map(|e| e.rules.len()).sum();
    let final_content = if edits.is_empty() {
        content.to_string()
    } else {
        buffer.apply(&edits);
        buffer.render()
    };
    EditResult {
        file_path: file_path.to_path_buf(),
        final_content,
        edits_applied,
        edits,
        written: false,
    }
}

/// Reads, repairs and (unless `dry_run`) rewrites one file. The file is only written if at least
/// one edit was applied, and the write is atomic: the new content goes to a temporary file in
/// the same directory which then replaces the original.
pub fn fix_file(
    file_path: &Path,
    batch: &[DiagnosticRecord],
    repairer: &LineRepairer<'_>,
    dry_run: bool,
) -> MenderResult<EditResult> {
    debug!("Fixing file: {}", file_path.display());
    let content = fs::read_to_string(file_path).map_err(|e| MenderError::io(file_path, e))?;
    let mut result = fix_content(file_path, &content, batch, repairer);
    if !dry_run && result.edits_applied > 0 {
        write_atomically(file_path, &result.final_content)?;
        result.written = true;
        debug!("Wrote {} edits to {}", result.edits_applied, file_path.display());
    }
    Ok(result)
}
