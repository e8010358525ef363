//! Doctor command: diagnose configuration and environment.

use std::io::IsTerminal;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use bumpgate_core::config;
use bumpgate_core::git;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    git: GitStatus,
    directories: DirectoryPaths,
    config: ConfigStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct GitStatus {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    found: bool,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    cwd: Option<String>,
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const ENV_VARS: &[(&str, &str)] = &[
    ("BUMPGATE_LOG_PATH", "Exact log file path"),
    ("BUMPGATE_LOG_DIR", "Log directory"),
    ("RUST_LOG", "Log filter directive"),
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("XDG_DATA_HOME", "Override data directory"),
];

impl DoctorReport {
    fn gather(cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        let git_path = git::git_executable();

        Self {
            git: GitStatus {
                available: git_path.is_some(),
                path: git_path.map(|p| p.display().to_string()),
            },
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: ENV_VARS
                    .iter()
                    .map(|&(name, description)| EnvVar {
                        name,
                        value: std::env::var(name).ok(),
                        description,
                    })
                    .collect(),
            },
        }
    }
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = (!global_json && std::io::stderr().is_terminal()).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Gathering diagnostics...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let report = DoctorReport::gather(cwd);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Git".bold().underline());
    match report.git.path {
        Some(ref path) => println!("  {} git: {}", "✓".green(), path.cyan()),
        None => println!(
            "  {} {}",
            "✗".red(),
            "git not found on PATH - bumpgate cannot validate repositories".red()
        ),
    }
    println!();

    println!("{}", "Configuration".bold().underline());
    match report.config.file {
        Some(ref file) => println!("  {} Config file: {}", "✓".green(), file.cyan()),
        None => {
            println!("  {} No config file found", "○".yellow());
            offer_config_creation()?;
        }
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Data", report.directories.data.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());
    let mut any_set = false;
    for var in &report.environment.env_vars {
        if let Some(ref value) = var.value {
            any_set = true;
            println!("  {}: {}", var.name.dimmed(), value.cyan());
        }
    }
    if !any_set {
        println!("  {} No logging or XDG overrides set", "○".dimmed());
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default user config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };
    let config_path = config_dir.join("config.yaml");
    if config_path.exists() {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    // Declined or interrupted
    if !matches!(create, Ok(true)) {
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let yaml = serde_saphyr::to_string(&config::Config::default())?;
    std::fs::write(&config_path, yaml)?;
    println!("  {} Created {}", "✓".green(), config_path.cyan());

    Ok(())
}
