mod cli;

use clap::Parser;
use cli::{Cli, Command, config_file, load_config};
use compiler_diagnostics::DiagnosticExtractor;
use directories::ProjectDirs;
use line_repair::{RepairOptions, run_repair};
use mender_core::config::Config;
use mender_core::rules::RuleCatalog;
use mender_core::{DiagnosticSource, count_by_code, count_code};
use static_rules::{StaticRuleSet, fix_paths, scan_paths};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let dirs = ProjectDirs::from("", "", "mender").ok_or("Could not determine config directory")?;
    if cli.print_config_path {
        println!("Config file location: {:?}", config_file(dirs.config_dir()));
        return Ok(());
    }
    let config = load_config(&cli, dirs.config_dir())?;
    config.validate();

    match cli.command {
        Some(Command::Repair { code, .. }) => repair(&config, code),
        Some(Command::Count { code }) => count(&config, code.as_deref()),
        Some(Command::Scan { paths, fix, json }) => scan(&config, paths, fix, json),
        Some(Command::Rules) => rules(),
        None => Err("No command given; see --help".into()),
    }
}

fn repair(config: &Config, target_code: String) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = DiagnosticExtractor::from_config(config)?;
    let catalog = RuleCatalog::typescript()?;
    let options = RepairOptions {
        target_code,
        dry_run: config.dry_run,
    };
    let summary = run_repair(&extractor, &catalog, &options)?;

    info!("\n=== Repair Summary ===");
    info!("Code: {}", summary.target_code);
    info!("Diagnostics: {} of {}", summary.target_diagnostics, summary.total_diagnostics);
    info!("Files processed: {}", summary.files_processed);
    info!("Files skipped: {}", summary.files_skipped);
    info!("Edits: {}", summary.edits_applied);
    info!("Duration: {}s", (summary.end_time - summary.start_time).num_seconds());
    match &summary.validation {
        None => info!("Dry run; nothing was written. Re-run with --live to apply."),
        Some(report) if report.success => info!(
            "✅ {} {} -> {} (net improvement {})",
            report.target_code,
            report.before_target_count,
            report.after_target_count,
            report.net_improvement
        ),
        Some(report) => warn!("⚠️  Validation failed: {}", report.failures.join("; ")),
    }

    if let Some(path) = &config.report {
        summary.save(path)?;
        info!("Detailed summary saved to: {}", path.display());
    }
    Ok(())
}

fn count(config: &Config, code: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = DiagnosticExtractor::from_config(config)?;
    let records = extractor.collect()?;
    match code {
        Some(code) => println!("{code}: {}", count_code(&records, code)),
        None => {
            for (code, count) in count_by_code(&records) {
                println!("{code}: {count}");
            }
            println!("total: {}", records.len());
        }
    }
    Ok(())
}

fn scan(
    config: &Config,
    paths: Vec<PathBuf>,
    fix: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rules = StaticRuleSet::from_catalog(&RuleCatalog::typescript()?);
    let roots = if paths.is_empty() {
        vec![config.project_root.clone()]
    } else {
        paths
    };
    let results = if fix {
        fix_paths(&rules, &roots, &config.scan)
    } else {
        scan_paths(&rules, &roots, &config.scan)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for file in &results {
            for finding in &file.findings {
                println!(
                    "{}:{}:{}: {} [{}] {}",
                    file.path.display(),
                    finding.line,
                    finding.column,
                    finding.severity,
                    finding.rule,
                    finding.message
                );
            }
        }
    }
    let findings: usize = results.iter().map(|f| f.findings.len()).sum();
    let fixed: usize = results.iter().map(|f| f.fixes_applied).sum();
    info!("{} finding(s) in {} file(s), {} fixed", findings, results.len(), fixed);
    Ok(())
}

fn rules() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = RuleCatalog::typescript()?;
    let universal = catalog.universal().iter().map(|rule| ("*", rule));
    let specific = catalog
        .codes()
        .into_iter()
        .flat_map(|code| catalog.specific(code).iter().map(move |rule| (code, rule)));
    for (code, rule) in universal.chain(specific) {
        println!(
            "{code:<42} {:<28} {:<8} {}",
            rule.name,
            rule.severity.to_string(),
            rule.description
        );
    }
    Ok(())
}
