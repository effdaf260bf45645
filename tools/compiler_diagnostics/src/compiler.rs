//! Type-checker invocation wrapper.

use mender_core::config::{CompilerConfig, OutputFormat};
use mender_core::{MenderError, MenderResult};
use std::path::Path;
use std::process::Command;
use tracing::{debug, trace};

/// How to run the compiler and how to read what it prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub format: OutputFormat,
}

impl CompilerCommand {
    /// `tsc --noEmit --pretty false` through `npx`.
    pub fn tsc() -> CompilerCommand {
        CompilerCommand {
            program: "npx".into(),
            args: ["tsc", "--noEmit", "--pretty", "false"].map(String::from).to_vec(),
            format: OutputFormat::Tsc,
        }
    }
}

impl From<&CompilerConfig> for CompilerCommand {
    fn from(config: &CompilerConfig) -> CompilerCommand {
        CompilerCommand {
            program: config.program.clone(),
            args: config.args.clone(),
            format: config.format,
        }
    }
}

/// Everything the compiler printed. `success` is informational only: a failing type check with
/// well-formed output is the normal case.
#[derive(Debug, Clone)]
pub struct CompilerOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CompilerOutput {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs the compiler to completion in `project_root`.
pub fn run_compiler(project_root: &Path, command: &CompilerCommand) -> MenderResult<CompilerOutput> {
    debug!(
        "Running {} {} in {}",
        command.program,
        command.args.join(" "),
        project_root.display()
    );

    let output = Command::new(&command.program)
        .args(&command.args)
        .current_dir(project_root)
        .output()
        .map_err(|source| MenderError::CompilerLaunch {
            program: command.program.clone(),
            source,
        })?;

    let result = CompilerOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    trace!("Compiler output:\n{}", result.combined_output());
    debug!(
        "Compiler exited with {} ({} bytes of output)",
        output.status,
        result.stdout.len() + result.stderr.len()
    );
    Ok(result)
}
