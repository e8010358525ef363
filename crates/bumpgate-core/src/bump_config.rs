//! The `.bump` override list.
//!
//! A `.bump` file at the project root names the version files to keep in
//! sync, one relative path per line. Blank lines and `#` comments are
//! ignored. When it exists it replaces auto-detection entirely.
//!
//! ```text
//! # firmware and host tooling share one version
//! firmware/library.json
//! tools/Cargo.toml
//! ```

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::path_guard::{UnsafePath, validate_submodule_path};

/// File name of the override list.
pub const BUMP_FILE: &str = ".bump";

/// Errors loading an override list.
#[derive(Error, Debug)]
pub enum BumpConfigError {
    /// The `.bump` file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the `.bump` file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The list names no files.
    #[error("{origin} lists no files")]
    Empty {
        /// Where the list came from.
        origin: String,
    },

    /// A path appears more than once.
    #[error("{origin} lists {path} more than once")]
    Duplicate {
        /// Where the list came from.
        origin: String,
        /// The repeated path.
        path: String,
    },

    /// A path is absolute or escapes the project root.
    #[error("{origin}: {source}")]
    Unsafe {
        /// Where the list came from.
        origin: String,
        /// Why the path was rejected.
        source: UnsafePath,
    },

    /// A listed file does not exist.
    #[error("{origin} lists {path}, which does not exist")]
    MissingFile {
        /// Where the list came from.
        origin: String,
        /// The missing path.
        path: String,
    },
}

/// Result alias for override list loading.
pub type BumpConfigResult<T> = Result<T, BumpConfigError>;

/// An ordered, validated list of version files relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpConfig {
    origin: String,
    files: Vec<String>,
}

impl BumpConfig {
    /// Load the override list for `root`.
    ///
    /// `.bump` wins when present. Otherwise `fallback` (the `[version].files`
    /// config setting) is used if non-empty. Returns `Ok(None)` when neither
    /// names anything, meaning auto-detection applies.
    #[instrument(skip(fallback), fields(root = %root))]
    pub fn load(root: &Utf8Path, fallback: &[String]) -> BumpConfigResult<Option<Self>> {
        let path = root.join(BUMP_FILE);
        if path.is_file() {
            let content = std::fs::read_to_string(&path).map_err(|source| BumpConfigError::Read {
                path: path.to_string(),
                source,
            })?;
            debug!(%path, "using override list");
            return Self::from_paths(root, BUMP_FILE, parse(&content)).map(Some);
        }

        if fallback.is_empty() {
            return Ok(None);
        }

        debug!(count = fallback.len(), "using [version].files from config");
        Self::from_paths(root, "[version].files", fallback.to_vec()).map(Some)
    }

    /// Validate `files` against `root`.
    pub fn from_paths(
        root: &Utf8Path,
        origin: &str,
        files: Vec<String>,
    ) -> BumpConfigResult<Self> {
        if files.is_empty() {
            return Err(BumpConfigError::Empty {
                origin: origin.to_string(),
            });
        }

        for (i, file) in files.iter().enumerate() {
            validate_submodule_path(file).map_err(|source| BumpConfigError::Unsafe {
                origin: origin.to_string(),
                source,
            })?;

            if files[..i].contains(file) {
                return Err(BumpConfigError::Duplicate {
                    origin: origin.to_string(),
                    path: file.clone(),
                });
            }

            if !root.join(file).is_file() {
                return Err(BumpConfigError::MissingFile {
                    origin: origin.to_string(),
                    path: file.clone(),
                });
            }
        }

        Ok(Self {
            origin: origin.to_string(),
            files,
        })
    }

    /// The listed paths, in order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Where the list came from (`.bump` or `[version].files`).
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Split `.bump` content into entries.
pub fn parse(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
