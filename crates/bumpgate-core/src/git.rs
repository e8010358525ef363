//! Git queries for release gating.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, credential helpers, and other configuration. Every invocation is
//! bounded by the runner's timeout and killed if it overruns.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// The command did not finish within the timeout.
    #[error("git {command} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// The git subcommand that timed out.
        command: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Runs `git` in a fixed working directory with a fixed timeout.
///
/// Cheap to clone; each clone runs commands independently.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: Utf8PathBuf,
    timeout: Duration,
}

impl Git {
    /// Create a runner rooted at `workdir` with [`DEFAULT_TIMEOUT`].
    pub fn new(workdir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-command timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The directory commands run in.
    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }

    /// The per-command timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a git command and return its stdout.
    pub async fn run(&self, args: &[&str]) -> GitResult<String> {
        let command = subcommand_name(args).to_string();

        let child = Command::new("git")
            .args(args)
            .current_dir(self.workdir.as_std_path())
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GitError::Timeout {
                command: command.clone(),
                timeout: self.timeout,
            })??;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepo);
            }

            Err(GitError::Command { command, stderr })
        }
    }

    /// Run a git command inside `subdir` (via `git -C <subdir>`).
    ///
    /// Callers must have validated `subdir` with
    /// [`validate_submodule_path`](crate::path_guard::validate_submodule_path).
    pub async fn run_in(&self, subdir: &str, args: &[&str]) -> GitResult<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.extend_from_slice(&["-C", subdir]);
        full.extend_from_slice(args);
        self.run(&full).await
    }

    /// Check if we're inside a git work tree.
    #[instrument(skip(self))]
    pub async fn is_inside_work_tree(&self) -> GitResult<bool> {
        match self.run(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Porcelain status lines for tracked files with staged or unstaged
    /// changes.
    ///
    /// Untracked files are not listed; see [`Git::untracked_files`].
    #[instrument(skip(self))]
    pub async fn tracked_changes(&self) -> GitResult<Vec<String>> {
        let output = self
            .run(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        let changes = non_empty_lines(&output);
        debug!(count = changes.len(), "tracked changes");
        Ok(changes)
    }

    /// Untracked files that are not ignored.
    #[instrument(skip(self))]
    pub async fn untracked_files(&self) -> GitResult<Vec<String>> {
        let output = self
            .run(&["ls-files", "--others", "--exclude-standard"])
            .await?;
        Ok(non_empty_lines(&output))
    }

    /// Get the current branch name.
    ///
    /// Returns `None` if in a detached HEAD state.
    #[instrument(skip(self))]
    pub async fn current_branch(&self) -> GitResult<Option<String>> {
        let output = self.run(&["branch", "--show-current"]).await?;
        let branch = output.trim();
        if branch.is_empty() {
            debug!("detached HEAD");
            Ok(None)
        } else {
            debug!(%branch, "current branch");
            Ok(Some(branch.to_string()))
        }
    }

    /// Get the URL for a named remote, or `None` if it isn't configured.
    #[instrument(skip(self))]
    pub async fn remote_url(&self, remote: &str) -> GitResult<Option<String>> {
        match self.run(&["remote", "get-url", remote]).await {
            Ok(url) => Ok(Some(url.trim().to_string())),
            Err(GitError::Command { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Names of all configured remotes.
    #[instrument(skip(self))]
    pub async fn remotes(&self) -> GitResult<Vec<String>> {
        let output = self.run(&["remote"]).await?;
        Ok(non_empty_lines(&output))
    }

    /// Check the remote with `git fetch --dry-run`; nothing is written.
    #[instrument(skip(self))]
    pub async fn fetch_dry_run(&self, remote: &str) -> GitResult<()> {
        self.run(&["fetch", "--dry-run", "--quiet", remote]).await?;
        Ok(())
    }

    /// Check the remote with `git ls-remote --heads`.
    #[instrument(skip(self))]
    pub async fn ls_remote(&self, remote: &str) -> GitResult<()> {
        self.run(&["ls-remote", "--heads", remote]).await?;
        Ok(())
    }

    /// Count commits `(behind, ahead)` of HEAD relative to `upstream`.
    #[instrument(skip(self))]
    pub async fn ahead_behind(&self, upstream: &str) -> GitResult<(u64, u64)> {
        let range = format!("{upstream}...HEAD");
        let output = self
            .run(&["rev-list", "--count", "--left-right", &range])
            .await?;
        let counts = parse_left_right(&output).ok_or_else(|| GitError::Command {
            command: "rev-list".into(),
            stderr: format!("unexpected output: {}", output.trim()),
        })?;
        debug!(behind = counts.0, ahead = counts.1, "ahead/behind");
        Ok(counts)
    }

    /// Whether `path` is tracked in the index.
    #[instrument(skip(self))]
    pub async fn is_tracked(&self, path: &str) -> GitResult<bool> {
        let output = self.run(&["ls-files", "--", path]).await?;
        Ok(!output.trim().is_empty())
    }

    /// Raw `git submodule status` output.
    #[instrument(skip(self))]
    pub async fn submodule_status(&self) -> GitResult<String> {
        self.run(&["submodule", "status"]).await
    }

    /// The most recent tag reachable from HEAD, if any.
    #[instrument(skip(self))]
    pub async fn latest_tag(&self) -> GitResult<Option<String>> {
        match self.run(&["describe", "--tags", "--abbrev=0"]).await {
            Ok(output) => {
                let tag = output.trim().to_string();
                debug!(%tag, "latest tag");
                Ok((!tag.is_empty()).then_some(tag))
            }
            Err(GitError::Command { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Why probing a remote failed, classified from git's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Credentials were rejected.
    Auth(String),
    /// The host could not be reached.
    Network(String),
    /// The named remote is not configured.
    MissingRemote(String),
    /// The remote URL points at a repository that does not exist.
    MissingRepository(String),
    /// Anything else.
    Other(String),
}

impl RemoteFailure {
    /// Classify a failed remote check.
    pub fn from_error(err: &GitError) -> Self {
        match err {
            GitError::Command { stderr, .. } => Self::classify(stderr),
            GitError::Timeout { .. } => Self::Network(err.to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    /// Classify stderr text from `git fetch` / `git ls-remote`.
    pub fn classify(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if any(&["authentication failed", "permission denied", "access denied", "could not read username"]) {
            Self::Auth(message)
        } else if any(&["repository not found", "does not exist", "does not appear to be a git repository"]) {
            if any(&["no such remote", "'origin' does not appear"]) {
                Self::MissingRemote(message)
            } else {
                Self::MissingRepository(message)
            }
        } else if any(&["no such remote"]) {
            Self::MissingRemote(message)
        } else if any(&["network", "connection", "timeout", "timed out", "unreachable", "could not resolve host"]) {
            Self::Network(message)
        } else {
            Self::Other(message)
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(m) => write!(f, "authentication failed - check your credentials: {m}"),
            Self::Network(m) => {
                write!(f, "network connectivity issue - check internet connection: {m}")
            }
            Self::MissingRemote(m) => write!(f, "remote not configured: {m}"),
            Self::MissingRepository(m) => {
                write!(f, "remote repository not found - check remote URL: {m}")
            }
            Self::Other(m) if m.is_empty() => write!(
                f,
                "unable to reach remote - check network connection and credentials"
            ),
            Self::Other(m) => write!(f, "remote connectivity issue: {m}"),
        }
    }
}

/// Locate the `git` executable on `PATH`.
pub fn git_executable() -> Option<std::path::PathBuf> {
    which::which("git").ok()
}

/// Check whether `git` is available on `PATH`.
pub fn git_available() -> bool {
    git_executable().is_some()
}

/// First non-option argument, skipping the values of `-C` and `-c`.
fn subcommand_name<'a>(args: &[&'a str]) -> &'a str {
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        match arg {
            "-C" | "-c" => {
                iter.next();
            }
            a if a.starts_with('-') => {}
            a => return a,
        }
    }
    ""
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `rev-list --count --left-right` output: `"<behind>\t<ahead>"`.
fn parse_left_right(output: &str) -> Option<(u64, u64)> {
    let mut parts = output.split_whitespace();
    let behind = parts.next()?.parse().ok()?;
    let ahead = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((behind, ahead))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Throwaway repositories for tests.

    use std::path::Path;
    use std::process::Command as StdCommand;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    pub fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// An initialized repository with one committed file and no remote.
    pub fn make_git_repo() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", "--quiet", "--initial-branch=main"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        run_git(dir.path(), &["config", "tag.gpgsign", "false"]);
        std::fs::write(dir.path().join("test.txt"), "test content\n").unwrap();
        run_git(dir.path(), &["add", "test.txt"]);
        run_git(dir.path(), &["commit", "--quiet", "-m", "initial commit"]);
        dir
    }

    pub fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("tempdir is UTF-8")
    }
}
