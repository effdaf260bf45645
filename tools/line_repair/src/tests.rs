use super::*;
use mender_core::DiagnosticRecord;
use mender_core::test_util::{MockDiagnosticSource, tempdir};
use std::io;

const BROKEN: &str = "const a = 1\nlet list = [1,, 2];\nfunction f() {\n    return 'spring'\n  }\n}\n";
const REPAIRED: &str = "const a = 1;\nlet list = [1, 2];\nfunction f() {\n    return 'spring';\n}\n";

fn diagnostics(path: &Path) -> Vec<DiagnosticRecord> {
    vec![
        DiagnosticRecord::new(path, 1, 12, "TS1005", "';' expected."),
        DiagnosticRecord::new(path, 2, 15, "TS1005", "Expression expected."),
        DiagnosticRecord::new(path, 5, 3, "TS1128", "Declaration or statement expected."),
        DiagnosticRecord::new(path, 9, 1, "TS2304", "Cannot find name 'x'."),
    ]
}

fn options(code: &str, dry_run: bool) -> RepairOptions {
    RepairOptions {
        target_code: code.to_string(),
        dry_run,
    }
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.ts");
    fs::write(&path, BROKEN).unwrap();
    let source = MockDiagnosticSource::new().then(diagnostics(&path));
    let catalog = RuleCatalog::typescript().unwrap();

    let summary = run_repair(&source, &catalog, &options("TS1005", true)).unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(summary.total_diagnostics, 4);
    assert_eq!(summary.target_diagnostics, 2);
    assert_eq!(summary.edits_applied, 2);
    assert_eq!(summary.files_processed, 1);
    assert!(!summary.files[0].written);
    assert_eq!(summary.files[0].rules, ["duplicate-comma", "missing-terminator"]);
    assert!(summary.validation.is_none());
    assert!(summary.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), BROKEN);
}

#[test]
fn live_run_writes_and_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.ts");
    fs::write(&path, BROKEN).unwrap();
    let catalog = RuleCatalog::typescript().unwrap();

    let after_ts1005 = vec![
        DiagnosticRecord::new(&path, 5, 3, "TS1128", "Declaration or statement expected."),
        DiagnosticRecord::new(&path, 9, 1, "TS2304", "Cannot find name 'x'."),
    ];
    let source = MockDiagnosticSource::new()
        .then(diagnostics(&path))
        .then(after_ts1005.clone());
    let summary = run_repair(&source, &catalog, &options("TS1005", false)).unwrap();
    assert_eq!(source.calls(), 2);
    assert!(summary.files[0].written);
    let validation = summary.validation.as_ref().unwrap();
    assert_eq!(validation.after_target_count, 0);
    assert_eq!(validation.net_improvement, 2);
    assert!(summary.success());

    let source = MockDiagnosticSource::new()
        .then(after_ts1005)
        .then(vec![DiagnosticRecord::new(&path, 7, 1, "TS2304", "Cannot find name 'x'.")]);
    let summary = run_repair(&source, &catalog, &options("TS1128", false)).unwrap();
    assert_eq!(summary.edits_applied, 1);
    assert!(summary.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), REPAIRED);
}

#[test]
fn regression_is_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.ts");
    fs::write(&path, BROKEN).unwrap();
    let catalog = RuleCatalog::typescript().unwrap();
    let mut worse = diagnostics(&path);
    worse.push(DiagnosticRecord::new(&path, 2, 1, "TS1109", "Expression expected."));
    worse.push(DiagnosticRecord::new(&path, 3, 1, "TS1109", "Expression expected."));
    let source = MockDiagnosticSource::new().then(diagnostics(&path)).then(worse);

    let summary = run_repair(&source, &catalog, &options("TS1005", false)).unwrap();
    let validation = summary.validation.as_ref().unwrap();
    assert!(!validation.success);
    assert_eq!(validation.net_improvement, 0);
    assert!(!summary.success());
}

#[test]
fn unreadable_files_are_skipped() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.ts");
    fs::write(&good, "const a = 1\n").unwrap();
    let missing = dir.path().join("missing.ts");
    let source = MockDiagnosticSource::new().then(vec![
        DiagnosticRecord::new(&missing, 1, 1, "TS1005", "';' expected."),
        DiagnosticRecord::new(&good, 1, 12, "TS1005", "';' expected."),
    ]);
    let catalog = RuleCatalog::typescript().unwrap();

    let summary = run_repair(&source, &catalog, &options("TS1005", true)).unwrap();
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.edits_applied, 1);
    let skipped = summary.files.iter().find(|f| f.file_path == missing).unwrap();
    assert!(skipped.skipped.is_some());
}

#[test]
fn compiler_launch_failure_is_fatal() {
    let source = MockDiagnosticSource::new().then_fail(MenderError::CompilerLaunch {
        program: "npx".into(),
        source: io::Error::from(io::ErrorKind::NotFound),
    });
    let catalog = RuleCatalog::typescript().unwrap();
    let error = run_repair(&source, &catalog, &options("TS1005", true)).unwrap_err();
    assert!(matches!(error, MenderError::CompilerLaunch { .. }));
}

#[test]
fn nothing_to_repair() {
    let source = MockDiagnosticSource::new().then(vec![]).then(vec![]);
    let catalog = RuleCatalog::typescript().unwrap();
    let summary = run_repair(&source, &catalog, &options("TS1005", false)).unwrap();
    assert_eq!(summary.target_diagnostics, 0);
    assert!(summary.files.is_empty());
    assert!(summary.success());
}

#[test]
fn summary_round_trips_through_json() {
    let dir = tempdir().unwrap();
    let source = MockDiagnosticSource::new().then(vec![]);
    let catalog = RuleCatalog::typescript().unwrap();
    let summary = run_repair(&source, &catalog, &options("TS1003", true)).unwrap();
    let report = dir.path().join("summary.json");
    summary.save(&report).unwrap();
    let loaded: RepairSummary =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(loaded.target_code, "TS1003");
    assert!(loaded.dry_run);
}
