//! Core library for bumpgate.
//!
//! This crate gates version bumps on a clean repository and keeps a
//! project's version number in sync across every file that records it.
//!
//! # Modules
//!
//! - [`bump_config`] - The `.bump` override list
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration error types
//! - [`git`] - Git command runner and read-only queries
//! - [`path_guard`] - Submodule path validation
//! - [`release`] - Commit, tag, and push after a bump
//! - [`submodule`] - `git submodule status` parsing
//! - [`validate`] - Repository readiness checks
//! - [`version`] - Version detection, computation, and file rewriting
//!
//! # Quick Start
//!
//! ```no_run
//! use bumpgate_core::git::Git;
//! use bumpgate_core::validate::ValidationEngine;
//! use bumpgate_core::version::VersionRegistry;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let git = Git::new(".");
//! let summary = ValidationEngine::new(git.clone()).run().await?;
//! if summary.can_proceed {
//!     let mut registry = VersionRegistry::new(git);
//!     registry.detect().await?;
//!     let next = registry.bump_minor()?;
//!     registry.update_all(&next.to_string())?;
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod bump_config;

pub mod config;

pub mod error;

pub mod git;

pub mod path_guard;

pub mod release;

pub mod submodule;

pub mod validate;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
