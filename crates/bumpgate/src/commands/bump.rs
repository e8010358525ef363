//! Bump command: validate, compute the next version, and rewrite version files.

use std::io::IsTerminal;

use anyhow::{Context, bail};
use clap::Args;
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, info, instrument};

use bumpgate_core::config::Config;
use bumpgate_core::release;
use bumpgate_core::semver::Version;
use bumpgate_core::version::{BumpLevel, ProjectFile, VersionRegistry, parse_plain_version};

/// Arguments for the `bump` subcommand.
#[derive(Args, Debug, Default)]
pub struct BumpArgs {
    /// Which part of the version to bump (prompted when omitted on a terminal)
    #[arg(value_enum, conflicts_with = "version")]
    pub level: Option<BumpLevel>,

    /// Set the version explicitly (e.g., "1.2.3" or "v1.2.3")
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Skip repository validation
    #[arg(long)]
    pub skip_validation: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Run without making changes (show what would happen)
    #[arg(long)]
    pub dry_run: bool,

    /// Commit the updated version files
    #[arg(long)]
    pub commit: bool,

    /// Create an annotated tag for the new version (implies --commit)
    #[arg(long)]
    pub tag: bool,

    /// Push the commit and tag to the configured remote (implies --commit)
    #[arg(long)]
    pub push: bool,
}

#[derive(Debug, Serialize)]
struct BumpPlan<'a> {
    previous: &'a Version,
    next: Version,
    files: &'a [ProjectFile],
    #[serde(skip_serializing_if = "Option::is_none")]
    override_list: Option<&'a str>,
    dry_run: bool,
}

#[derive(Debug, Default, Serialize)]
struct BumpOutcome {
    version: String,
    modified_files: Vec<String>,
    committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    pushed: bool,
}

/// Execute the bump command.
#[instrument(name = "cmd_bump", skip_all, fields(json_output))]
pub async fn cmd_bump(
    args: BumpArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, ?args, "executing bump command");

    if args.skip_validation {
        debug!("validation skipped");
    } else {
        let summary = super::run_validation(config, cwd, global_json).await?;
        if !summary.can_proceed {
            if global_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                super::print_summary(&summary);
            }
            bail!("repository is not ready for a version bump");
        }
        if !global_json && summary.has_warnings {
            for (step, warning) in summary.warnings() {
                println!("{} [{step}] {warning}", "warning:".yellow());
            }
            println!();
        }
    }

    let git = super::git_for(config, cwd);
    let mut registry =
        VersionRegistry::new(git.clone()).with_config_files(config.version.files.clone());
    registry
        .detect()
        .await
        .context("version file detection failed")?;

    let next = resolve_next_version(&args, &registry, config, global_json).await?;
    let plan = BumpPlan {
        previous: registry.current(),
        next: next.clone(),
        files: registry.files(),
        override_list: registry.override_origin(),
        dry_run: args.dry_run,
    };

    if global_json {
        if args.dry_run {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
    } else {
        print_plan(&plan);
        if args.dry_run {
            println!();
            println!("{}", "Dry run - no changes made.".yellow());
            return Ok(());
        }
    }

    let needs_confirm = config.release.confirm && !args.yes && !global_json;
    if needs_confirm && std::io::stdin().is_terminal() {
        let proceed = Confirm::new(&format!("Update version to {next}?"))
            .with_default(true)
            .prompt()
            .context("confirmation cancelled")?;
        if !proceed {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    let written = registry
        .update_all(&next.to_string())
        .context("failed to update version files")?;
    registry
        .check_sync()
        .await
        .context("version files out of sync after update")?;
    info!(version = %next, files = written.len(), "version files updated");

    let mut outcome = BumpOutcome {
        version: next.to_string(),
        modified_files: written.iter().map(ToString::to_string).collect(),
        ..BumpOutcome::default()
    };

    let remote = config.validation.remote.as_str();
    if args.commit || args.tag || args.push {
        let message = release::commit_message(&config.release.commit_message, &next);
        outcome.committed = release::commit_version_bump(&git, &written, &message)
            .await
            .context("failed to commit version bump")?;
    }
    if args.tag {
        let tag = release::tag_name(&config.release.tag_prefix, &next);
        release::create_tag(&git, &tag, &next)
            .await
            .context("failed to create tag")?;
        outcome.tag = Some(tag);
    }
    if args.push {
        release::push_branch(&git, remote)
            .await
            .context("failed to push branch")?;
        if let Some(ref tag) = outcome.tag {
            release::push_tag(&git, remote, tag)
                .await
                .context("failed to push tag")?;
        }
        outcome.pushed = true;
    }

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, remote);
    }

    Ok(())
}

/// Work out the target version from `--version`, a level, or a prompt.
async fn resolve_next_version(
    args: &BumpArgs,
    registry: &VersionRegistry,
    config: &Config,
    global_json: bool,
) -> anyhow::Result<Version> {
    if let Some(ref explicit) = args.version {
        let version = parse_plain_version(explicit).context("invalid --version")?;
        if version <= *registry.current() {
            bail!(
                "new version {version} must be greater than current version {}",
                registry.current()
            );
        }
        return Ok(version);
    }

    let level = match args.level {
        Some(level) => level,
        None if !global_json && std::io::stdin().is_terminal() => {
            let git = super::git_for(config, registry.root());
            let tag = release::tag_name(&config.release.tag_prefix, registry.current());
            print_recent_commits(&tag, &release::commits_since(&git, &tag).await);
            super::prompt_bump_level(registry)?
        }
        None => bail!("specify a bump level (major, minor, patch) or --version"),
    };
    registry
        .bump(level)
        .context("cannot compute the next version")
}

fn print_recent_commits(tag: &str, commits: &[String]) {
    if commits.is_empty() {
        println!("{}", format!("No commits since {tag}.").yellow());
    } else {
        println!("{}", format!("Commits since {tag}:").bold().underline());
        for line in commits.iter().take(10) {
            let (hash, subject) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            println!("  {} {subject}", hash.dimmed());
        }
        let remaining = commits.len().saturating_sub(10);
        if remaining > 0 {
            println!("  ... and {remaining} more");
        }
    }
    println!();
}

fn print_plan(plan: &BumpPlan<'_>) {
    println!(
        "{}: {} → {}",
        "Version".bold(),
        plan.previous.to_string().dimmed(),
        plan.next.to_string().green().bold()
    );
    if let Some(origin) = plan.override_list {
        println!("{}: {}", "Files from".dimmed(), origin.cyan());
    }
    if plan.files.is_empty() {
        println!("  {} {}", "○".yellow(), "No version files found".yellow());
    }
    for file in plan.files {
        println!(
            "  {} {} {}",
            "→".dimmed(),
            file.path.as_str().cyan(),
            format!("({})", file.description).dimmed()
        );
    }
}

fn print_outcome(outcome: &BumpOutcome, remote: &str) {
    println!();
    println!(
        "  {} Version updated to {}",
        "✓".green(),
        outcome.version.green().bold()
    );
    for file in &outcome.modified_files {
        println!("  {} {}", "→".dimmed(), file.cyan());
    }
    if outcome.committed {
        println!("  {} Committed version bump", "✓".green());
    }
    if let Some(ref tag) = outcome.tag {
        println!("  {} Created tag {}", "✓".green(), tag.cyan());
    }
    if outcome.pushed {
        println!("  {} Pushed to {}", "✓".green(), remote.cyan());
    }
}
