//! Submodule path validation.
//!
//! Submodule paths come from repository metadata (`.gitmodules`,
//! `git submodule status`), which anyone who can push to the repository
//! controls. Every path must pass [`validate_submodule_path`] before it is
//! joined onto the working tree or handed to `git -C <path>`.

use thiserror::Error;

/// Reasons a submodule path is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafePath {
    /// The path is the empty string.
    #[error("submodule path cannot be empty")]
    Empty,

    /// The path is absolute.
    #[error("submodule path cannot be absolute: {0}")]
    Absolute(String),

    /// The path starts with a Windows drive letter (`C:`).
    #[error("submodule path cannot contain drive letters: {0}")]
    DriveLetter(String),

    /// The path contains a `..` segment.
    #[error("submodule path contains path traversal: {0}")]
    Traversal(String),

    /// The path starts with `~`.
    #[error("submodule path cannot start with ~: {0}")]
    HomeRelative(String),

    /// The path contains NUL, CR, LF, or TAB.
    #[error("submodule path contains invalid characters: {0:?}")]
    ControlCharacter(String),

    /// The normalized path climbs out of the repository.
    #[error("submodule path tries to escape repository bounds: {path} (resolved to: {normalized})")]
    EscapesRoot {
        /// The path as given.
        path: String,
        /// The path after normalization.
        normalized: String,
    },

    /// The normalized path is the repository root itself.
    #[error("submodule path cannot resolve to root directory: {0}")]
    ResolvesToRoot(String),
}

/// Check that `path` is a relative path that stays inside the repository.
///
/// Accepts nested paths and tolerates redundant separators (`a//b`, `a/./b`).
pub fn validate_submodule_path(path: &str) -> Result<(), UnsafePath> {
    if path.is_empty() {
        return Err(UnsafePath::Empty);
    }

    let normalized = normalize(path);

    if path.starts_with(['/', '\\']) || normalized.starts_with('/') {
        return Err(UnsafePath::Absolute(path.to_string()));
    }

    if has_drive_letter(path) {
        return Err(UnsafePath::DriveLetter(path.to_string()));
    }

    if segments(path).any(|s| s == "..") || segments(&normalized).any(|s| s == "..") {
        return Err(UnsafePath::Traversal(path.to_string()));
    }

    if path.starts_with('~') || normalized.starts_with('~') {
        return Err(UnsafePath::HomeRelative(path.to_string()));
    }

    if normalized == ".." || normalized.starts_with("../") {
        return Err(UnsafePath::EscapesRoot {
            path: path.to_string(),
            normalized,
        });
    }

    if normalized == "." || normalized == "/" {
        return Err(UnsafePath::ResolvesToRoot(path.to_string()));
    }

    if segments(&normalized).any(|s| s.contains(['\0', '\n', '\r', '\t'])) {
        return Err(UnsafePath::ControlCharacter(path.to_string()));
    }

    Ok(())
}

/// Split on both separator styles, skipping empty segments.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty())
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Lexically clean a `/`-separated path: collapse repeated separators, drop
/// `.` segments, and resolve `..` against preceding segments.
///
/// Mirrors the usual `Clean` rules, so `""` and `"a/.."` both become `"."`.
fn normalize(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ if rooted => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    let joined = stack.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
