//! Parsers that turn raw compiler output into `DiagnosticRecord`s.

use mender_core::{DiagnosticRecord, MenderResult};
use regex::Regex;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static TSC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>.+?)\((?P<line>\d+),(?P<column>\d+)\): error (?P<code>\S+): (?P<message>.*)$")
        .expect("tsc diagnostic regex")
});

/// Parses `tsc --pretty false` output. Only lines of the form
/// `<path>(<line>,<column>): error <CODE>: <message>` produce records; everything else
/// (continuation lines, summaries, blank lines) is skipped.
pub fn parse_tsc_output(text: &str, project_root: &Path) -> Vec<DiagnosticRecord> {
    let records: Vec<DiagnosticRecord> = text
        .lines()
        .filter_map(|line| {
            let caps = TSC_LINE.captures(line.trim_end())?;
            Some(DiagnosticRecord {
                file_path: resolve(project_root, &caps["path"]),
                line: caps["line"].parse().ok()?,
                column: caps["column"].parse().ok()?,
                code: caps["code"].to_string(),
                message: caps["message"].to_string(),
            })
        })
        .collect();
    debug!("Parsed {} tsc diagnostics", records.len());
    records
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFile {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    rule_id: Option<String>,
    severity: u8,
    line: Option<usize>,
    column: Option<usize>,
    message: String,
}

/// ESLint severity for errors; warnings (1) are not repaired.
const ESLINT_ERROR: u8 = 2;

/// Parses `eslint --format json` output. Messages without a rule id (parse errors) get the code
/// `"eslint"`.
pub fn parse_eslint_json(text: &str, project_root: &Path) -> MenderResult<Vec<DiagnosticRecord>> {
    let files: Vec<EslintFile> = serde_json::from_str(text.trim())?;
    let records: Vec<DiagnosticRecord> = files
        .into_iter()
        .flat_map(|file| {
            let path = resolve(project_root, &file.file_path);
            file.messages
                .into_iter()
                .filter(|m| m.severity == ESLINT_ERROR)
                .map(move |m| DiagnosticRecord {
                    file_path: path.clone(),
                    line: m.line.unwrap_or(1),
                    column: m.column.unwrap_or(1),
                    code: m.rule_id.unwrap_or_else(|| "eslint".into()),
                    message: m.message,
                })
        })
        .collect();
    debug!("Parsed {} eslint errors", records.len());
    Ok(records)
}

/// Makes `path` absolute against `project_root`, dropping `.` components.
fn resolve(project_root: &Path, path: &str) -> PathBuf {
    project_root
        .join(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsc_lines() {
        let output = "\
src/season.ts(12,5): error TS1005: ';' expected.
src/season.ts(40,1): error TS1128: Declaration or statement expected.\r
  Some continuation text that is not a diagnostic.
./src/util/obj.ts(3,9): error TS1003: Identifier expected.
/abs/other.ts(1,1): error TS1127: Invalid character.
src/warn.ts(2,2): warning TS6133: 'x' is declared but its value is never read.

Found 4 errors in 3 files.
";
        let records = parse_tsc_output(output, Path::new("/work/app"));
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            DiagnosticRecord::new("/work/app/src/season.ts", 12, 5, "TS1005", "';' expected.")
        );
        assert_eq!(records[1].message, "Declaration or statement expected.");
        assert_eq!(records[2].file_path, PathBuf::from("/work/app/src/util/obj.ts"));
        assert_eq!((records[2].line, records[2].column), (3, 9));
        assert_eq!(records[3].file_path, PathBuf::from("/abs/other.ts"));
    }

    #[test]
    fn tsc_paths_with_parentheses() {
        let output = "src/(group)/page.ts(7,3): error TS1005: ',' expected.";
        let records = parse_tsc_output(output, Path::new("/w"));
        assert_eq!(records[0].file_path, PathBuf::from("/w/src/(group)/page.ts"));
        assert_eq!(records[0].line, 7);
    }

    #[test]
    fn eslint_json() {
        let output = r#"[
            {"filePath": "/work/app/src/a.ts", "messages": [
                {"ruleId": "@typescript-eslint/await-thenable", "severity": 2, "line": 4, "column": 11, "message": "Unexpected await of a non-Promise value."},
                {"ruleId": "no-console", "severity": 1, "line": 5, "column": 1, "message": "Unexpected console statement."},
                {"ruleId": null, "severity": 2, "fatal": true, "line": 9, "column": 2, "message": "Parsing error: ';' expected."}
            ]},
            {"filePath": "src/b.ts", "messages": [], "errorCount": 0}
        ]"#;
        let records = parse_eslint_json(output, Path::new("/work/app")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "@typescript-eslint/await-thenable");
        assert_eq!((records[0].line, records[0].column), (4, 11));
        assert_eq!(records[1].code, "eslint");
    }

    #[test]
    fn eslint_garbage_is_an_error() {
        assert!(parse_eslint_json("Oops! Something went wrong", Path::new("/w")).is_err());
    }
}
