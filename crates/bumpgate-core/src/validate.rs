//! Repository readiness checks run before a version bump.
//!
//! [`ValidationEngine::run`] executes six steps and returns one
//! [`ValidationResult`] per step. Errors block the bump; warnings are
//! reported but never block. The first three steps are independent and run
//! concurrently.

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, instrument, warn};

use crate::git::{Git, RemoteFailure};
use crate::path_guard::validate_submodule_path;
use crate::submodule::{Submodule, SubmoduleState, parse_status_output};

/// Remote checked when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Number of steps in a run.
pub const TOTAL_STEPS: usize = 6;

/// Static description of one validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationStep {
    /// Stable identifier.
    pub name: &'static str,
    /// What the step checks.
    pub description: &'static str,
    /// 1-based position.
    pub ordinal: usize,
    /// Number of steps in a run.
    pub total: usize,
}

const fn step(name: &'static str, description: &'static str, ordinal: usize) -> ValidationStep {
    ValidationStep {
        name,
        description,
        ordinal,
        total: TOTAL_STEPS,
    }
}

/// Every step, in execution order.
pub const STEPS: [ValidationStep; TOTAL_STEPS] = [
    step("repository-status", "Checking repository status", 1),
    step("working-directory", "Checking working directory", 2),
    step("branch-status", "Checking branch status", 3),
    step("submodule-scan", "Scanning submodules", 4),
    step("submodule-validation", "Validating submodules", 5),
    step("final", "Checking remote connectivity", 6),
];

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// The step that produced this result.
    pub step: ValidationStep,
    /// `true` when there are no errors.
    pub success: bool,
    /// Non-blocking findings.
    pub warnings: Vec<String>,
    /// Blocking findings.
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn new(step: ValidationStep, warnings: Vec<String>, errors: Vec<String>) -> Self {
        Self {
            step,
            success: errors.is_empty(),
            warnings,
            errors,
        }
    }
}

/// All step results from one run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    /// One result per step, in order.
    pub results: Vec<ValidationResult>,
    /// Any step reported an error.
    pub has_errors: bool,
    /// Any step reported a warning.
    pub has_warnings: bool,
    /// The bump may go ahead. Depends on errors only.
    pub can_proceed: bool,
    /// Submodules that passed path validation.
    pub submodules: Vec<Submodule>,
}

impl ValidationSummary {
    fn new(results: Vec<ValidationResult>, submodules: Vec<Submodule>) -> Self {
        let has_errors = results.iter().any(|r| !r.errors.is_empty());
        let has_warnings = results.iter().any(|r| !r.warnings.is_empty());
        Self {
            results,
            has_errors,
            has_warnings,
            can_proceed: !has_errors,
            submodules,
        }
    }

    /// Every error, prefixed with its step name.
    pub fn errors(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.results
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| (r.step.name, e.as_str())))
    }

    /// Every warning, prefixed with its step name.
    pub fn warnings(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.results
            .iter()
            .flat_map(|r| r.warnings.iter().map(move |w| (r.step.name, w.as_str())))
    }
}

/// A validation run could not complete.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// A concurrently run step panicked or was cancelled.
    #[error("validation step {step} did not complete: {source}")]
    Join {
        /// The step's name.
        step: &'static str,
        /// Why the task failed.
        source: JoinError,
    },
}

/// Result alias for validation runs.
pub type ValidateResult<T> = Result<T, ValidateError>;

/// Runs the readiness checks against one working tree.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    git: Git,
    remote: String,
}

impl ValidationEngine {
    /// Create an engine that checks against [`DEFAULT_REMOTE`].
    pub fn new(git: Git) -> Self {
        Self {
            git,
            remote: DEFAULT_REMOTE.to_string(),
        }
    }

    /// Use a different remote for branch and connectivity checks.
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Run every step and summarize.
    #[instrument(skip(self), fields(root = %self.git.workdir(), remote = %self.remote))]
    pub async fn run(&self) -> ValidateResult<ValidationSummary> {
        let (repo, tree, branch) = tokio::join!(
            tokio::spawn(check_repository(self.git.clone())),
            tokio::spawn(check_working_directory(self.git.clone())),
            tokio::spawn(check_branch(self.git.clone(), self.remote.clone())),
        );
        let joined = |ordinal: usize, r: Result<ValidationResult, JoinError>| {
            r.map_err(|source| ValidateError::Join {
                step: STEPS[ordinal].name,
                source,
            })
        };
        let repo = joined(0, repo)?;
        let tree = joined(1, tree)?;
        let branch = joined(2, branch)?;

        let (scan, submodules) = scan_submodules(&self.git).await;
        let subs = validate_submodules(&self.git, &submodules).await;
        let remote = check_connectivity(&self.git, &self.remote).await;

        let summary = ValidationSummary::new(vec![repo, tree, branch, scan, subs, remote], submodules);
        debug!(
            can_proceed = summary.can_proceed,
            has_warnings = summary.has_warnings,
            "validation complete"
        );
        Ok(summary)
    }
}

async fn check_repository(git: Git) -> ValidationResult {
    let mut errors = Vec::new();
    match git.is_inside_work_tree().await {
        Ok(true) => {}
        Ok(false) => errors.push("not inside a git repository".to_string()),
        Err(e) => errors.push(format!("failed to check repository status: {e}")),
    }
    ValidationResult::new(STEPS[0], Vec::new(), errors)
}

async fn check_working_directory(git: Git) -> ValidationResult {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    match git.tracked_changes().await {
        Ok(changes) if changes.is_empty() => {}
        Ok(changes) => errors.push(format!(
            "uncommitted changes to tracked files: {}",
            summarize(&changes)
        )),
        Err(e) => errors.push(format!("failed to check working directory: {e}")),
    }

    match git.untracked_files().await {
        Ok(files) if files.is_empty() => {}
        Ok(files) => warnings.push(format!("untracked files present: {}", summarize(&files))),
        Err(e) => warnings.push(format!("could not list untracked files: {e}")),
    }

    ValidationResult::new(STEPS[1], warnings, errors)
}

async fn check_branch(git: Git, remote: String) -> ValidationResult {
    let mut warnings = Vec::new();

    let branch = match git.current_branch().await {
        Ok(Some(branch)) => branch,
        Ok(None) => {
            warnings.push("detached HEAD: not on any branch".to_string());
            return ValidationResult::new(STEPS[2], warnings, Vec::new());
        }
        Err(e) => {
            warnings.push(format!("could not determine current branch: {e}"));
            return ValidationResult::new(STEPS[2], warnings, Vec::new());
        }
    };

    match git.remote_url(&remote).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!(%remote, "remote not configured, skipping sync check");
            warnings.push(RemoteFailure::MissingRemote(remote.clone()).to_string());
            return ValidationResult::new(STEPS[2], warnings, Vec::new());
        }
        Err(e) => {
            warnings.push(format!("could not read remote {remote}: {e}"));
            return ValidationResult::new(STEPS[2], warnings, Vec::new());
        }
    }

    if let Err(e) = git.fetch_dry_run(&remote).await {
        warnings.push(RemoteFailure::from_error(&e).to_string());
        return ValidationResult::new(STEPS[2], warnings, Vec::new());
    }

    let upstream = format!("{remote}/{branch}");
    match git.ahead_behind(&upstream).await {
        Ok((0, 0)) => {}
        Ok((behind, 0)) => warnings.push(format!("branch is {behind} commit(s) behind {upstream}")),
        Ok((0, ahead)) => warnings.push(format!("branch is {ahead} commit(s) ahead of {upstream}")),
        Ok((behind, ahead)) => warnings.push(format!(
            "branch has diverged from {upstream} ({ahead} ahead, {behind} behind)"
        )),
        Err(e) => {
            debug!(error = %e, "ahead/behind comparison failed");
            warnings.push(format!("could not compare {branch} with {upstream}"));
        }
    }

    ValidationResult::new(STEPS[2], warnings, Vec::new())
}

async fn scan_submodules(git: &Git) -> (ValidationResult, Vec<Submodule>) {
    let mut warnings = Vec::new();

    let tracked = match git.is_tracked(".gitmodules").await {
        Ok(tracked) => tracked,
        Err(e) => {
            warnings.push(format!("could not check for .gitmodules: {e}"));
            false
        }
    };

    let submodules = if tracked {
        match git.submodule_status().await {
            Ok(output) => {
                let (safe, rejected) = partition_safe(parse_status_output(&output));
                warnings.extend(rejected);
                safe
            }
            Err(e) => {
                warnings.push(format!("could not query submodule status: {e}"));
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    debug!(count = submodules.len(), "submodules found");
    (ValidationResult::new(STEPS[3], warnings, Vec::new()), submodules)
}

/// Split parsed submodules into safe ones and warnings for the rest.
fn partition_safe(submodules: Vec<Submodule>) -> (Vec<Submodule>, Vec<String>) {
    let mut safe = Vec::with_capacity(submodules.len());
    let mut rejected = Vec::new();
    for sub in submodules {
        match validate_submodule_path(&sub.path) {
            Ok(()) => safe.push(sub),
            Err(e) => {
                warn!(path = ?sub.path, error = %e, "skipping unsafe submodule path");
                rejected.push(format!("skipping submodule {:?}: {e}", sub.path));
            }
        }
    }
    (safe, rejected)
}

async fn validate_submodules(git: &Git, submodules: &[Submodule]) -> ValidationResult {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    for sub in submodules {
        let initialized = sub.state != SubmoduleState::Uninitialized
            && git.run_in(&sub.path, &["rev-parse", "--git-dir"]).await.is_ok();
        if !initialized {
            errors.push(format!("submodule {} ({}) is not initialized", sub.name, sub.path));
            continue;
        }

        match git.run_in(&sub.path, &["rev-parse", "HEAD"]).await {
            Ok(head) => {
                let head = head.trim();
                match git.run_in(&sub.path, &["tag", "--points-at", head]).await {
                    Ok(tags) if tags.trim().is_empty() => warnings.push(format!(
                        "submodule {} is at untagged commit {}",
                        sub.name,
                        short(head)
                    )),
                    Ok(_) => {}
                    Err(e) => warnings.push(format!("could not read tags for submodule {}: {e}", sub.name)),
                }
            }
            Err(e) => warnings.push(format!("could not read HEAD of submodule {}: {e}", sub.name)),
        }

        match git.run_in(&sub.path, &["status", "--porcelain"]).await {
            Ok(status) if status.trim().is_empty() => {}
            Ok(_) => errors.push(format!("submodule {} has uncommitted changes", sub.name)),
            Err(e) => warnings.push(format!("could not check submodule {} for changes: {e}", sub.name)),
        }
    }

    ValidationResult::new(STEPS[4], warnings, errors)
}

async fn check_connectivity(git: &Git, remote: &str) -> ValidationResult {
    let mut warnings = Vec::new();

    match git.remotes().await {
        Ok(remotes) if remotes.is_empty() => {
            warnings.push("no remotes configured; changes cannot be pushed".to_string());
        }
        Ok(remotes) => {
            let target = if remotes.iter().any(|r| r == remote) {
                remote
            } else {
                remotes[0].as_str()
            };
            if let Err(e) = git.ls_remote(target).await {
                warnings.push(format!("{target}: {}", RemoteFailure::from_error(&e)));
            }
        }
        Err(e) => warnings.push(format!("could not list remotes: {e}")),
    }

    ValidationResult::new(STEPS[5], warnings, Vec::new())
}

/// Join up to five entries, noting how many were left out.
fn summarize(items: &[String]) -> String {
    const SHOWN: usize = 5;
    let head = items.iter().take(SHOWN).map(String::as_str).collect::<Vec<_>>().join(", ");
    match items.len().saturating_sub(SHOWN) {
        0 => head,
        more => format!("{head} (and {more} more)"),
    }
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
