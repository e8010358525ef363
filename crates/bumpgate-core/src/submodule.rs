//! Parsing `git submodule status` output.
//!
//! Each line looks like `[status]<40-hex commit> <path> [(describe)]`, where
//! the status character is optional. See [`parse_status_line`].

use serde::Serialize;
use thiserror::Error;

/// Length of a full SHA-1 commit hash.
pub const COMMIT_HASH_LEN: usize = 40;

/// A submodule as reported by `git submodule status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submodule {
    /// Final path segment, used in messages.
    pub name: String,
    /// Path relative to the superproject root.
    pub path: String,
    /// Commit the superproject records for this submodule.
    pub commit: String,
    /// Checkout state from the leading status character.
    pub state: SubmoduleState,
}

/// Checkout state signalled by the status character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmoduleState {
    /// ` `: checked out at the recorded commit.
    Current,
    /// `-`: not initialized.
    Uninitialized,
    /// `+`: checked out at a different commit.
    Modified,
    /// `U`: merge conflicts.
    Conflict,
}

impl SubmoduleState {
    const fn from_flag(flag: char) -> Option<Self> {
        match flag {
            ' ' => Some(Self::Current),
            '-' => Some(Self::Uninitialized),
            '+' => Some(Self::Modified),
            'U' => Some(Self::Conflict),
            _ => None,
        }
    }
}

/// Reasons a status line is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusLineError {
    /// Shorter than a commit hash plus one character.
    #[error("line too short: {0:?}")]
    TooShort(String),

    /// The commit field is not exactly 40 hex characters.
    #[error("invalid commit hash format: {0:?}")]
    InvalidCommit(String),

    /// No path follows the commit.
    #[error("could not parse commit and path from: {0:?}")]
    MissingPath(String),
}

/// Parse one line of `git submodule status` output.
///
/// If the first 40 characters are all hex digits the line is taken to start
/// directly with the commit hash. Otherwise character 0 is the status flag and
/// the rest of the line is scanned for the commit and path.
///
/// A path that itself begins with 40 hex characters on a line with no status
/// flag is read with the hash-first layout; this is left as is.
pub fn parse_status_line(line: &str) -> Result<Submodule, StatusLineError> {
    if line.len() < COMMIT_HASH_LEN + 1 {
        return Err(StatusLineError::TooShort(line.to_string()));
    }

    let hash_first = line
        .get(..COMMIT_HASH_LEN)
        .is_some_and(|prefix| is_hex(prefix));

    let (state, rest) = if hash_first {
        (SubmoduleState::Current, line)
    } else {
        let mut chars = line.chars();
        let flag = chars.next().unwrap_or(' ');
        let state = SubmoduleState::from_flag(flag).unwrap_or(SubmoduleState::Current);
        (state, chars.as_str())
    };

    let mut fields = rest.split_whitespace();
    let commit = fields.next().unwrap_or_default();
    let Some(path) = fields.next() else {
        return Err(StatusLineError::MissingPath(line.to_string()));
    };

    if commit.len() != COMMIT_HASH_LEN || !is_hex(commit) {
        return Err(StatusLineError::InvalidCommit(commit.to_string()));
    }

    let name = path.rsplit('/').next().unwrap_or(path).to_string();

    Ok(Submodule {
        name,
        path: path.to_string(),
        commit: commit.to_string(),
        state,
    })
}

/// Parse every line of `git submodule status` output, skipping malformed lines.
pub fn parse_status_output(output: &str) -> Vec<Submodule> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_status_line(line) {
            Ok(sub) => Some(sub),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed submodule status line");
                None
            }
        })
        .collect()
}

/// Whether `s` is non-empty and made only of ASCII hex digits.
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn parses_line_with_status_space() {
        let sub = parse_status_line(&format!(" {HASH} path/to/submodule (v1.0.0)")).unwrap();
        assert_eq!(sub.commit, HASH);
        assert_eq!(sub.path, "path/to/submodule");
        assert_eq!(sub.name, "submodule");
        assert_eq!(sub.state, SubmoduleState::Current);
    }

    #[test]
    fn parses_line_without_status() {
        let sub = parse_status_line(&format!("{HASH} libs/core")).unwrap();
        assert_eq!(sub.commit, HASH);
        assert_eq!(sub.path, "libs/core");
        assert_eq!(sub.name, "core");
    }

    #[test]
    fn status_flags_map_to_state() {
        let cases = [
            ('-', SubmoduleState::Uninitialized),
            ('+', SubmoduleState::Modified),
            ('U', SubmoduleState::Conflict),
        ];
        for (flag, expected) in cases {
            let sub = parse_status_line(&format!("{flag}{HASH} lib")).unwrap();
            assert_eq!(sub.state, expected, "flag {flag:?}");
        }
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let upper = HASH.to_uppercase();
        let sub = parse_status_line(&format!("+{upper} third-lib")).unwrap();
        assert_eq!(sub.commit, upper);
    }

    #[test]
    fn top_level_path_is_its_own_name() {
        let sub = parse_status_line(&format!(" {HASH} third-lib")).unwrap();
        assert_eq!(sub.name, "third-lib");
    }

    #[test]
    fn round_trips_hash_and_path() {
        for path in ["a", "a/b", "deeply/nested/module-name", "x_y.z"] {
            for prefix in ["", " ", "-", "+"] {
                let line = format!("{prefix}{HASH} {path}");
                let sub = parse_status_line(&line).unwrap();
                assert_eq!(sub.commit, HASH);
                assert_eq!(sub.path, path);
                assert_eq!(sub.name, path.rsplit('/').next().unwrap());
            }
        }
    }

    #[test]
    fn rejects_short_lines() {
        for len in [0, 1, 20, 40] {
            let line = "a".repeat(len);
            assert!(
                matches!(parse_status_line(&line), Err(StatusLineError::TooShort(_))),
                "len {len}"
            );
        }
    }

    #[test]
    fn rejects_bad_commit() {
        let line = " zzzz567890abcdef1234567890abcdef12345678 lib";
        assert!(matches!(
            parse_status_line(line),
            Err(StatusLineError::InvalidCommit(_))
        ));

        let short = " 1234567890abcdef1234567890abcdef1234567 lib/with/long/path";
        assert!(matches!(
            parse_status_line(short),
            Err(StatusLineError::InvalidCommit(_))
        ));
    }

    #[test]
    fn rejects_missing_path() {
        let line = format!(" {HASH}");
        assert!(matches!(
            parse_status_line(&line),
            Err(StatusLineError::MissingPath(_))
        ));
    }

    #[test]
    fn output_parsing_skips_malformed_lines() {
        let output = format!(
            " {HASH} libs/first-lib (v1.0.0)\n\
             +abcdef1234567890abcdef1234567890abcdef12 libs/second-lib (v2.0.0-1-gabcdef1)\n\
             garbage\n\
             \n \
             fedcba0987654321fedcba0987654321fedcba09 third-lib\n"
        );
        let subs = parse_status_output(&output);
        let names: Vec<_> = subs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["first-lib", "second-lib", "third-lib"]);
    }
}
