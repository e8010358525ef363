//! Configuration errors.
//!
//! Each subsystem defines its own error enum next to its code
//! ([`GitError`](crate::git::GitError), [`VersionError`](crate::version::VersionError),
//! [`ValidateError`](crate::validate::ValidateError), and so on). This module
//! holds the ones shared by the config loader.

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
