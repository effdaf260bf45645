//! Configuration shared by the mender tools. Loaded (and layered) by the `mender` binary; see
//! `fix/default_config.toml` for the defaults.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Root that relative diagnostic paths are resolved against, and where the compiler runs.
    pub project_root: PathBuf,

    /// Compute edits without writing them. Live mode must be opted into.
    #[serde(default = "Config::default_dry_run")]
    pub dry_run: bool,

    pub compiler: CompilerConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Where to write the JSON run summary, if anywhere.
    #[serde(default)]
    pub report: Option<PathBuf>,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl Config {
    fn default_dry_run() -> bool {
        true
    }

    /// Warns about every key that was not recognized, at any level.
    pub fn validate(&self) {
        unknown_field_warning("", &self.unknown);
        unknown_field_warning("compiler", &self.compiler.unknown);
        unknown_field_warning("scan", &self.scan.unknown);
    }
}

/// How to invoke the type checker.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

/// Shape of the diagnostic stream the compiler writes.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// `path(line,col): error CODE: message`, one per line.
    #[default]
    Tsc,
    /// `eslint --format json`.
    EslintJson,
}

#[derive(Debug, Deserialize)]
pub struct ScanConfig {
    /// File extensions the static scanner looks at.
    #[serde(default = "ScanConfig::default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names that are never descended into.
    #[serde(default = "ScanConfig::default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl ScanConfig {
    fn default_extensions() -> Vec<String> {
        vec!["ts".into(), "tsx".into()]
    }

    fn default_exclude_dirs() -> Vec<String> {
        vec!["node_modules".into(), ".git".into(), "dist".into()]
    }
}

impl Default for ScanConfig {
    fn default() -> ScanConfig {
        ScanConfig {
            extensions: ScanConfig::default_extensions(),
            exclude_dirs: ScanConfig::default_exclude_dirs(),
            unknown: HashMap::new(),
        }
    }
}

/// Logs a warning for every field in `unknown`.
///
/// `prefix` should be the path to this entry (e.g. `CompilerConfig` is validated with a `prefix`
/// of `compiler`).
pub fn unknown_field_warning(prefix: &str, unknown: &HashMap<String, Value>) {
    let mut entries: Vec<_> = unknown.keys().collect();
    entries.sort_unstable();
    entries.into_iter().for_each(|name| match prefix {
        "" => warn!("unknown config key {name}"),
        p => warn!("unknown config key {p}.{name}"),
    });
}
