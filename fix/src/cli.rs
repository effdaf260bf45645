//! The command-line arguments and configuration system for the `mender` binary.

use clap::{Parser, Subcommand};
use config::FileFormat::Toml;
use mender_core::config::Config;
use mender_core::{MenderError, MenderResult};
use std::path::{Path, PathBuf};

/// Repairs TypeScript syntax errors reported by the compiler, one diagnostic code at a time.
#[derive(Debug, Parser)]
#[command(name = "mender")]
pub struct Cli {
    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short, global = true)]
    pub config: Vec<String>,

    /// Project root (overrides `project_root` from the config).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Prints out the location of the config file.
    #[arg(long)]
    pub print_config_path: bool,

    // Always present unless using a flag like --print-config-path.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Repair every diagnostic of one code. Previews by default.
    Repair {
        /// Diagnostic code to repair, e.g. TS1005.
        #[arg(long)]
        code: String,

        /// Write the repairs to disk and re-run the compiler to validate them.
        #[arg(long)]
        live: bool,

        /// Write a JSON summary of the run to this file.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Run the compiler and count diagnostics without changing anything.
    Count {
        /// Only count this code.
        #[arg(long)]
        code: Option<String>,
    },

    /// Scan sources for patterns that need no compiler to recognize.
    Scan {
        /// Files or directories to scan (default: the project root).
        paths: Vec<PathBuf>,

        /// Apply the fixable findings in place.
        #[arg(long)]
        fix: bool,

        /// Print findings as JSON instead of one per line.
        #[arg(long)]
        json: bool,
    },

    /// List the rules in the catalog.
    Rules,
}

impl Cli {
    fn live(&self) -> bool {
        matches!(self.command, Some(Command::Repair { live: true, .. }))
    }

    fn report(&self) -> Option<&Path> {
        match &self.command {
            Some(Command::Repair { report, .. }) => report.as_deref(),
            _ => None,
        }
    }
}

/// Builds the configuration: built-in defaults, then the user's config file, then
/// `./mender.toml`, then `--config` values, then dedicated flags.
pub fn load_config(cli: &Cli, config_dir: &Path) -> MenderResult<Config> {
    let mut settings = config::Config::builder()
        .add_source(config::File::from_str(
            include_str!("../default_config.toml"),
            Toml,
        ))
        .add_source(config::File::from(config_file(config_dir)).required(false))
        .add_source(config::File::from(PathBuf::from("mender.toml")).required(false));
    for config_arg in &cli.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            return Err(MenderError::Config(format!(
                "failed to parse config value {config_arg:?}; no '=' found"
            )));
        };
        settings = settings
            .set_override(name, override_value(value))
            .map_err(config_error)?;
    }

    if cli.live() {
        settings = settings
            .set_override("dry_run", false)
            .map_err(config_error)?;
    }

    let mut config: Config = settings
        .build()
        .and_then(config::Config::try_deserialize)
        .map_err(config_error)?;
    // Paths do not survive a round trip through the config crate's string values, so path
    // flags are applied after deserialization.
    if let Some(root) = &cli.root {
        config.project_root = root.clone();
    }
    if let Some(report) = cli.report() {
        config.report = Some(report.to_path_buf());
    }
    Ok(config)
}

/// Keeps `--config dry_run=false` a boolean: unknown keys are collected into a map, and values
/// passed through it stay strings unless typed here.
fn override_value(value: &str) -> config::Value {
    if let Ok(flag) = value.parse::<bool>() {
        return flag.into();
    }
    if let Ok(number) = value.parse::<i64>() {
        return number.into();
    }
    value.into()
}

fn config_error(error: config::ConfigError) -> MenderError {
    MenderError::Config(error.to_string())
}

/// Returns the config file path, given the config directory.
pub fn config_file(config_dir: &Path) -> PathBuf {
    [config_dir, "mender.toml".as_ref()].iter().collect()
}

#[cfg(test)]
mod tests {
    #[cfg(not(miri))]
    #[test]
    fn load_config_test() {
        use super::*;
        use mender_core::config::OutputFormat;
        use mender_core::test_util::tempdir;
        use std::{fs, io::Write as _};
        let config_dir = tempdir().unwrap();

        let config = load_config(
            &Cli::parse_from(["", "repair", "--code", "TS1005"]),
            config_dir.path(),
        )
        .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.compiler.program, "npx");
        assert_eq!(config.compiler.format, OutputFormat::Tsc);

        fs::File::create(config_file(config_dir.path()))
            .unwrap()
            .write_all(
                br#"
                    project_root = "web"
                    [compiler]
                    program = "eslint"
                    args = ["--format", "json", "src"]
                    format = "eslint-json"
                "#,
            )
            .unwrap();
        let config = load_config(&Cli::parse_from(["", "count"]), config_dir.path()).unwrap();
        assert_eq!(config.project_root, AsRef::<Path>::as_ref("web"));
        assert_eq!(config.compiler.format, OutputFormat::EslintJson);
        assert_eq!(config.compiler.args.len(), 3);

        // Verify the --config flag overrides the user's config file.
        let config = load_config(
            &Cli::parse_from(["", "--config", "project_root=app", "count"]),
            config_dir.path(),
        )
        .unwrap();
        assert_eq!(config.project_root, AsRef::<Path>::as_ref("app"));

        // Verify --root overrides all the configuration options.
        let config = load_config(
            &Cli::parse_from(["", "-c", "project_root=app", "--root", "site", "count"]),
            config_dir.path(),
        )
        .unwrap();
        assert_eq!(config.project_root, AsRef::<Path>::as_ref("site"));

        // Verify --live and --config both leave dry-run mode.
        let live = Cli::parse_from(["", "repair", "--code", "TS1005", "--live", "--report", "out.json"]);
        let config = load_config(&live, config_dir.path()).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.report.as_deref(), Some(AsRef::<Path>::as_ref("out.json")));
        let config = load_config(
            &Cli::parse_from(["", "-c", "dry_run=false", "count"]),
            config_dir.path(),
        )
        .unwrap();
        assert!(!config.dry_run);

        assert!(matches!(
            load_config(&Cli::parse_from(["", "-c", "dry_run", "count"]), config_dir.path()),
            Err(MenderError::Config(_))
        ));
    }
}
