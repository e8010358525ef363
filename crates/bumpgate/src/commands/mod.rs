//! Command implementations

pub mod bump;

pub mod doctor;

pub mod info;

pub mod preflight;

use std::io::IsTerminal;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use owo_colors::OwoColorize;

use bumpgate_core::config::Config;
use bumpgate_core::git::Git;
use bumpgate_core::validate::{ValidationEngine, ValidationSummary};
use bumpgate_core::version::{BumpLevel, VersionRegistry};

/// Git runner for `cwd` using the configured timeout.
pub fn git_for(config: &Config, cwd: &camino::Utf8Path) -> Git {
    Git::new(cwd).with_timeout(config.validation.timeout())
}

/// Run the validation engine, with a spinner on interactive terminals.
pub async fn run_validation(
    config: &Config,
    cwd: &camino::Utf8Path,
    global_json: bool,
) -> anyhow::Result<ValidationSummary> {
    let engine = ValidationEngine::new(git_for(config, cwd)).with_remote(&config.validation.remote);

    let spinner = (!global_json && std::io::stderr().is_terminal()).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Validating repository...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let summary = engine.run().await.context("repository validation failed");
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    summary
}

/// Print per-step validation results.
pub fn print_summary(summary: &ValidationSummary) {
    println!("{}", "Repository Validation".bold().underline());
    println!();

    for result in &summary.results {
        let step = &result.step;
        let icon = if !result.success {
            "✗".red().to_string()
        } else if !result.warnings.is_empty() {
            "!".yellow().to_string()
        } else {
            "✓".green().to_string()
        };
        println!(
            "  {icon} {} {}",
            format!("[{}/{}]", step.ordinal, step.total).dimmed(),
            step.description.bold()
        );
        for error in &result.errors {
            println!("      {} {error}", "error:".red());
        }
        for warning in &result.warnings {
            println!("      {} {warning}", "warning:".yellow());
        }
    }

    println!();
    if summary.has_errors {
        let count = summary.errors().count();
        println!(
            "  {} - fix the errors above before bumping",
            format!("{count} blocking issue(s)").red().bold()
        );
    } else if summary.has_warnings {
        println!(
            "  {} with {} warning(s)",
            "Ready to bump".green().bold(),
            summary.warnings().count()
        );
    } else {
        println!("  {}", "Ready to bump".green().bold());
    }
}

/// Ask which component to bump, showing the resulting versions.
pub fn prompt_bump_level(registry: &VersionRegistry) -> anyhow::Result<BumpLevel> {
    let options: Vec<String> = BumpLevel::ALL
        .iter()
        .map(|level| match registry.bump(*level) {
            Ok(next) => format!("{level} ({next})"),
            Err(_) => format!("{level} (unavailable)"),
        })
        .collect();

    let selection = Select::new(
        &format!("Current version is {}. Bump which part?", registry.current()),
        options,
    )
    .prompt()
    .context("bump level selection cancelled")?;

    BumpLevel::ALL
        .into_iter()
        .find(|level| selection.starts_with(&level.to_string()))
        .ok_or_else(|| anyhow::anyhow!("unexpected selection: {selection}"))
}
