//! Committing, tagging, and pushing a version bump.
//!
//! These are the write-side git operations run after
//! [`VersionRegistry::update_all`](crate::version::VersionRegistry::update_all).

use camino::Utf8PathBuf;
use semver::Version;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::git::{Git, GitError};

/// Default commit message template.
pub const DEFAULT_COMMIT_MESSAGE: &str = "chore(release): bump version to {version}";

/// Default tag prefix.
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// Commits listed by [`commits_since`] when the tag doesn't exist.
const RECENT_COMMITS: &str = "-10";

/// Errors from release git operations.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The tag already exists.
    #[error("tag {0} already exists")]
    TagExists(String),

    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Expand `{version}` in a commit message template.
pub fn commit_message(template: &str, version: &Version) -> String {
    template.replace("{version}", &version.to_string())
}

/// Tag name for `version`, e.g. `v1.2.3`.
pub fn tag_name(prefix: &str, version: &Version) -> String {
    format!("{prefix}{version}")
}

/// Stage `files` and commit them.
///
/// Returns `false` without committing when `files` is empty.
#[instrument(skip(git, files), fields(count = files.len()))]
pub async fn commit_version_bump(
    git: &Git,
    files: &[Utf8PathBuf],
    message: &str,
) -> ReleaseResult<bool> {
    if files.is_empty() {
        debug!("no files to commit");
        return Ok(false);
    }

    let mut add = vec!["add", "--"];
    add.extend(files.iter().map(|f| f.as_str()));
    git.run(&add).await?;
    git.run(&["commit", "--quiet", "-m", message]).await?;

    info!(%message, "committed version bump");
    Ok(true)
}

/// Create an annotated tag on HEAD.
#[instrument(skip(git))]
pub async fn create_tag(git: &Git, tag: &str, version: &Version) -> ReleaseResult<()> {
    if tag_exists(git, tag).await {
        return Err(ReleaseError::TagExists(tag.to_string()));
    }

    let message = format!("Release version {version}");
    git.run(&["tag", "-a", tag, "-m", &message]).await?;
    info!(%tag, "created tag");
    Ok(())
}

/// Push HEAD to `remote`.
#[instrument(skip(git))]
pub async fn push_branch(git: &Git, remote: &str) -> ReleaseResult<()> {
    git.run(&["push", "--quiet", remote, "HEAD"]).await?;
    info!(%remote, "pushed HEAD");
    Ok(())
}

/// Push a single tag to `remote`.
#[instrument(skip(git))]
pub async fn push_tag(git: &Git, remote: &str, tag: &str) -> ReleaseResult<()> {
    let refspec = format!("refs/tags/{tag}");
    git.run(&["push", "--quiet", remote, &refspec]).await?;
    info!(%remote, %tag, "pushed tag");
    Ok(())
}

/// One-line summaries of commits since `tag`.
///
/// Falls back to the most recent commits when the tag doesn't exist, and to
/// an empty list when git fails.
#[instrument(skip(git))]
pub async fn commits_since(git: &Git, tag: &str) -> Vec<String> {
    let output = if tag_exists(git, tag).await {
        let range = format!("{tag}..HEAD");
        git.run(&["log", "--oneline", "--no-decorate", &range]).await
    } else {
        git.run(&["log", "--oneline", "--no-decorate", RECENT_COMMITS])
            .await
    };

    match output {
        Ok(log) => log.lines().map(String::from).collect(),
        Err(e) => {
            debug!(error = %e, "could not list commits");
            Vec::new()
        }
    }
}

async fn tag_exists(git: &Git, tag: &str) -> bool {
    let reference = format!("refs/tags/{tag}");
    git.run(&["rev-parse", "--verify", "--quiet", &reference])
        .await
        .is_ok()
}
