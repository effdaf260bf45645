//! Runs the project's type checker and turns its output into structured diagnostics.
//!
//! The compiler exiting non-zero is expected (that is why we are running it); only failing to
//! start it at all is an error.

pub mod compiler;
pub mod parse;

pub use compiler::{CompilerCommand, CompilerOutput, run_compiler};
pub use parse::{parse_eslint_json, parse_tsc_output};

use mender_core::config::{Config, OutputFormat};
use mender_core::{DiagnosticRecord, DiagnosticSource, MenderError, MenderResult, filter_code};
use std::path::{Path, PathBuf};
use tracing::info;

/// A compiler bound to a fixed project root.
#[derive(Debug, Clone)]
pub struct DiagnosticExtractor {
    project_root: PathBuf,
    command: CompilerCommand,
}

impl DiagnosticExtractor {
    /// Fails with `InvalidProjectRoot` unless `project_root` is an existing directory.
    pub fn new(project_root: &Path, command: CompilerCommand) -> MenderResult<DiagnosticExtractor> {
        let project_root = project_root
            .canonicalize()
            .map_err(|_| MenderError::InvalidProjectRoot(project_root.to_path_buf()))?;
        if !project_root.is_dir() {
            return Err(MenderError::InvalidProjectRoot(project_root));
        }
        Ok(DiagnosticExtractor {
            project_root,
            command,
        })
    }

    pub fn from_config(config: &Config) -> MenderResult<DiagnosticExtractor> {
        DiagnosticExtractor::new(&config.project_root, CompilerCommand::from(&config.compiler))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Diagnostics for one code only.
    pub fn extract(&self, code: &str) -> MenderResult<Vec<DiagnosticRecord>> {
        Ok(filter_code(&self.collect()?, code))
    }
}

impl DiagnosticSource for DiagnosticExtractor {
    fn collect(&self) -> MenderResult<Vec<DiagnosticRecord>> {
        let output = run_compiler(&self.project_root, &self.command)?;
        let records = match self.command.format {
            OutputFormat::Tsc => parse_tsc_output(&output.combined_output(), &self.project_root),
            OutputFormat::EslintJson => parse_eslint_json(&output.stdout, &self.project_root)?,
        };
        info!("Compiler reported {} diagnostics", records.len());
        Ok(records)
    }
}

#[cfg(all(test, unix, not(miri)))]
mod tests {
    use super::*;
    use mender_core::test_util::tempdir;

    fn shell(script: &str, format: OutputFormat) -> CompilerCommand {
        CompilerCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            format,
        }
    }

    #[test]
    fn nonzero_exit_with_diagnostics_is_not_an_error() {
        let dir = tempdir().unwrap();
        let extractor = DiagnosticExtractor::new(
            dir.path(),
            shell(
                "echo \"src/a.ts(2,10): error TS1005: ';' expected.\"; \
                 echo \"src/a.ts(5,1): error TS1003: Identifier expected.\" >&2; exit 2",
                OutputFormat::Tsc,
            ),
        )
        .unwrap();
        let all = extractor.collect().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].file_path, extractor.project_root().join("src/a.ts"));
        let only = extractor.extract("TS1003").unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].line, 5);
    }

    #[test]
    fn eslint_reads_stdout_only() {
        let dir = tempdir().unwrap();
        let extractor = DiagnosticExtractor::new(
            dir.path(),
            shell(
                r#"echo '[{"filePath":"a.ts","messages":[{"ruleId":"no-empty-pattern","severity":2,"line":1,"column":7,"message":"Unexpected empty object pattern."}]}]'; echo 'deprecation noise' >&2; exit 1"#,
                OutputFormat::EslintJson,
            ),
        )
        .unwrap();
        let records = extractor.collect().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "no-empty-pattern");
    }

    #[test]
    fn missing_compiler_is_fatal() {
        let dir = tempdir().unwrap();
        let command = CompilerCommand {
            program: "definitely-not-a-real-compiler-binary".into(),
            args: vec![],
            format: OutputFormat::Tsc,
        };
        let error = DiagnosticExtractor::new(dir.path(), command)
            .unwrap()
            .collect()
            .unwrap_err();
        assert!(matches!(error, MenderError::CompilerLaunch { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn invalid_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.ts");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            DiagnosticExtractor::new(&file, CompilerCommand::tsc()),
            Err(MenderError::InvalidProjectRoot(_))
        ));
        assert!(matches!(
            DiagnosticExtractor::new(&dir.path().join("missing"), CompilerCommand::tsc()),
            Err(MenderError::InvalidProjectRoot(_))
        ));
    }
}
