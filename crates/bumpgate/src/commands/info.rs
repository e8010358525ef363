//! Info command: show package, config, and detected version files.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use bumpgate_core::config::{self, Config};
use bumpgate_core::version::{ProjectFile, VersionRegistry};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    homepage: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            homepage: env!("CARGO_PKG_HOMEPAGE"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    remote: String,
    timeout_secs: u64,
    tag_prefix: String,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            remote: config.validation.remote.clone(),
            timeout_secs: config.validation.timeout().as_secs(),
            tag_prefix: config.release.tag_prefix.clone(),
        }
    }
}

#[derive(Serialize)]
struct VersionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_list: Option<String>,
    files: Vec<ProjectFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl VersionInfo {
    async fn detect(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let mut registry = VersionRegistry::new(super::git_for(config, cwd))
            .with_config_files(config.version.files.clone());
        match registry.detect().await {
            Ok(()) => Self {
                current: Some(registry.current().to_string()),
                override_list: registry.override_origin().map(String::from),
                files: registry.files().to_vec(),
                error: None,
            },
            Err(e) => Self {
                current: None,
                override_list: None,
                files: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    version: VersionInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery and detection
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub async fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let info = PackageInfo::new();

    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: info,
        config: ConfigInfo::from_config(config, cwd),
        version: VersionInfo::detect(config, cwd).await,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
    } else {
        println!(
            "{} {}",
            full_info.package.name.bold(),
            full_info.package.version.green()
        );
        if !full_info.package.description.is_empty() {
            println!("{}", full_info.package.description);
        }
        if !full_info.package.license.is_empty() {
            println!("{}: {}", "License".dimmed(), full_info.package.license);
        }
        if !full_info.package.repository.is_empty() {
            println!(
                "{}: {}",
                "Repository".dimmed(),
                full_info.package.repository.cyan()
            );
        }
        if !full_info.package.homepage.is_empty() {
            println!(
                "{}: {}",
                "Homepage".dimmed(),
                full_info.package.homepage.cyan()
            );
        }

        // Configuration section
        println!();
        println!("{}", "Configuration".bold().underline());
        if let Some(ref path) = full_info.config.config_file {
            println!("{}: {}", "Config file".dimmed(), path.cyan());
        } else {
            println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
        }
        println!("{}: {}", "Log level".dimmed(), full_info.config.log_level);
        if let Some(ref dir) = full_info.config.log_dir {
            println!("{}: {}", "Log directory".dimmed(), dir);
        }

        println!("{}: {}", "Remote".dimmed(), full_info.config.remote);
        println!("{}: {}s", "Git timeout".dimmed(), full_info.config.timeout_secs);
        println!("{}: {}", "Tag prefix".dimmed(), full_info.config.tag_prefix);

        // Version section
        println!();
        println!("{}", "Version Files".bold().underline());
        let version = &full_info.version;
        if let Some(ref error) = version.error {
            println!("  {} {}", "✗".red(), error.red());
        } else {
            if let Some(ref current) = version.current {
                println!("{}: {}", "Current version".dimmed(), current.green());
            }
            if let Some(ref origin) = version.override_list {
                println!("{}: {}", "Files from".dimmed(), origin.cyan());
            }
            if version.files.is_empty() {
                println!(
                    "  {} {}",
                    "○".yellow(),
                    "No version files detected".yellow()
                );
            }
            for file in &version.files {
                let found = file
                    .version
                    .as_ref()
                    .map_or_else(|| "unreadable".yellow().to_string(), |v| v.to_string());
                println!(
                    "  {} {} {} {}",
                    "→".dimmed(),
                    file.path.as_str().cyan(),
                    found,
                    format!("({})", file.description).dimmed()
                );
            }
        }
    }

    Ok(())
}
