//! Configuration discovery and layering.
//!
//! Sources are merged lowest to highest:
//! 1. built-in defaults
//! 2. `config.<ext>` in the user config directory (`~/.config/bumpgate/` on Linux)
//! 3. `.bumpgate.<ext>` or `bumpgate.<ext>` found walking up from the working
//!    directory, stopping at the repository root
//! 4. files passed explicitly, in order (`--config`)
//!
//! `<ext>` is one of `toml`, `yaml`, `yml`, `json`, tried in that order.
//!
//! # Example
//! ```no_run
//! use camino::Utf8Path;
//! use bumpgate_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_project_search(Utf8Path::new("."))
//!     .load()?;
//! println!("tagging with {:?}", config.release.tag_prefix);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::release::{DEFAULT_COMMIT_MESSAGE, DEFAULT_TAG_PREFIX};
use crate::validate::DEFAULT_REMOTE;


/// The configuration for bumpgate.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Repository validation settings.
    pub validation: ValidationConfig,
    /// Version file settings.
    pub version: VersionConfig,
    /// Commit and tag settings.
    pub release: ReleaseConfig,
}

/// Repository validation settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Seconds before any single git command is abandoned (default: 30).
    pub timeout_secs: u64,
    /// Remote used for sync and connectivity checks (default: `origin`).
    pub remote: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: crate::git::DEFAULT_TIMEOUT.as_secs(),
            remote: DEFAULT_REMOTE.to_string(),
        }
    }
}

impl ValidationConfig {
    /// The per-command timeout. Never zero.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Version file settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionConfig {
    /// Files to keep in sync, relative to the project root.
    ///
    /// Same meaning as a `.bump` file; ignored when `.bump` exists. Empty
    /// means auto-detect.
    pub files: Vec<String>,
}

/// Commit and tag settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Prefix for version tags (default: `v`).
    pub tag_prefix: String,
    /// Commit message template; `{version}` is replaced with the new version.
    pub commit_message: String,
    /// Prompt for confirmation before writing files (default: true).
    ///
    /// The `--yes`/`-y` CLI flag overrides this at runtime.
    pub confirm: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            confirm: true,
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Config file extensions, in lookup order.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Name used for config files and platform directories.
const APP_NAME: &str = "bumpgate";

/// Directory entry marking the repository root; project discovery stops there.
const REPO_ROOT_MARKER: &str = ".git";

/// Layers configuration sources into a [`Config`].
#[derive(Debug)]
pub struct ConfigLoader {
    search_from: Option<Utf8PathBuf>,
    user_file: Option<Utf8PathBuf>,
    explicit: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader that reads the user config file, if one exists.
    pub fn new() -> Self {
        Self {
            search_from: None,
            user_file: find_user_config(),
            explicit: Vec::new(),
        }
    }

    /// Discover a project config starting at `dir`.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.search_from = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Layer `path` over everything discovered. Later calls win.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit.push(path.as_ref().to_path_buf());
        self
    }

    /// The files this loader will read, lowest precedence first.
    fn sources(&self) -> Vec<Utf8PathBuf> {
        let project = self.search_from.as_deref().and_then(find_project_config);
        self.user_file
            .iter()
            .cloned()
            .chain(project)
            .chain(self.explicit.iter().cloned())
            .collect()
    }

    /// Merge every source over the defaults.
    ///
    /// Explicit files must exist; discovered ones are only read when present.
    #[tracing::instrument(skip(self), fields(search_from = ?self.search_from))]
    pub fn load(self) -> ConfigResult<Config> {
        let figment = self
            .sources()
            .iter()
            .fold(Figment::from(Serialized::defaults(Config::default())), |figment, path| {
                tracing::debug!(%path, "merging config file");
                merge_file(figment, path)
            });

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            remote = %config.validation.remote,
            "configuration loaded"
        );
        Ok(config)
    }
}

/// Merge `path` into `figment`, picking the format from its extension.
///
/// Unknown extensions are read as TOML.
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// The project config file that applies to `start`, if any.
///
/// Each directory from `start` upward is checked for `.bumpgate.<ext>` and
/// then `bumpgate.<ext>`. The walk ends after the first directory containing
/// `.git`, so a config above the repository is never picked up.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    for dir in start.as_ref().ancestors() {
        let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
            [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        });
        if found.is_some() {
            return found;
        }
        if dir.join(REPO_ROOT_MARKER).exists() {
            break;
        }
    }
    None
}

/// `config.<ext>` in the user config directory, if present.
fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

fn utf8_dir(path: &std::path::Path) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).ok()
}

/// User config directory (`~/.config/bumpgate/` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    utf8_dir(project_dirs()?.config_dir())
}

/// User cache directory (`~/.cache/bumpgate/` on Linux).
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    utf8_dir(project_dirs()?.cache_dir())
}

/// User data directory (`~/.local/share/bumpgate/` on Linux).
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    utf8_dir(project_dirs()?.data_dir())
}

/// Machine-local data directory. Default log files live here.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    utf8_dir(project_dirs()?.data_local_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path.to_path_buf()).unwrap()
    }

    /// A loader that ignores whatever user config the test machine has.
    fn isolated() -> ConfigLoader {
        ConfigLoader {
            user_file: None,
            ..ConfigLoader::new()
        }
    }

    fn write(dir: &Utf8Path, name: &str, contents: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_match_release_and_validation_constants() {
        let config = isolated().load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.validation.timeout_secs, 30);
        assert_eq!(config.validation.remote, "origin");
        assert!(config.version.files.is_empty());
        assert_eq!(config.release.tag_prefix, "v");
        assert_eq!(
            config.release.commit_message,
            "chore(release): bump version to {version}"
        );
        assert!(config.release.confirm);
    }

    #[test]
    fn config_at_repo_root_applies_in_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path());
        fs::create_dir(root.join(".git")).unwrap();
        let expected = write(&root, ".bumpgate.toml", "[validation]\nremote = \"upstream\"\n");
        let deep = root.join("firmware/src");
        fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_project_config(&deep), Some(expected));
        let config = isolated().with_project_search(&deep).load().unwrap();
        assert_eq!(config.validation.remote, "upstream");
    }

    #[test]
    fn config_above_repo_root_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let outer = utf8(tmp.path());
        write(&outer, ".bumpgate.toml", "[release]\ntag_prefix = \"rel-\"\n");
        let repo = outer.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(repo.join("tools")).unwrap();

        assert_eq!(find_project_config(repo.join("tools")), None);
        let config = isolated().with_project_search(repo.join("tools")).load().unwrap();
        assert_eq!(config.release.tag_prefix, "v");
    }

    #[test]
    fn nearest_config_wins_and_dotfile_beats_plain_name() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path());
        write(&root, ".bumpgate.toml", "log_level = \"error\"\n");
        let pkg = root.join("bindings/python");
        write(&pkg, "bumpgate.toml", "log_level = \"warn\"\n");
        let dotfile = write(&pkg, ".bumpgate.toml", "log_level = \"debug\"\n");

        assert_eq!(find_project_config(&pkg), Some(dotfile));
        let config = isolated().with_project_search(&pkg).load().unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn toml_is_preferred_over_yaml_in_one_directory() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path());
        let toml = write(&root, "bumpgate.toml", "");
        write(&root, ".bumpgate.yaml", "log_level: warn\n");

        assert_eq!(find_project_config(&root), Some(toml));
    }

    #[test]
    fn user_config_sits_below_project_config() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path());
        let user = write(
            &root,
            "home/config.yaml",
            "release:\n  tag_prefix: user-\n  confirm: false\nvalidation:\n  remote: fork\n",
        );
        let project = root.join("project");
        write(&project, ".bumpgate.toml", "[release]\ntag_prefix = \"\"\n");

        let config = ConfigLoader {
            user_file: Some(user),
            ..isolated()
        }
        .with_project_search(&project)
        .load()
        .unwrap();

        assert_eq!(config.release.tag_prefix, "");
        assert!(!config.release.confirm);
        assert_eq!(config.validation.remote, "fork");
        assert_eq!(config.release.commit_message, DEFAULT_COMMIT_MESSAGE);
    }

    #[test]
    fn explicit_files_override_discovery_in_order() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(tmp.path());
        write(&root, ".bumpgate.toml", "[validation]\ntimeout_secs = 10\nremote = \"origin\"\n");
        let ci = write(&root, "ci/bump.toml", "[validation]\nremote = \"mirror\"\n");
        let local = write(&root, "local.yml", "validation:\n  timeout_secs: 5\n");

        let config = isolated()
            .with_project_search(&root)
            .with_file(&ci)
            .with_file(&local)
            .load()
            .unwrap();

        assert_eq!(config.validation.remote, "mirror");
        assert_eq!(config.validation.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn version_files_list_loads_from_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &utf8(tmp.path()),
            "bump.yaml",
            "version:\n  files:\n    - Cargo.toml\n    - firmware/library.json\n",
        );

        let config = isolated().with_file(&path).load().unwrap();
        assert_eq!(config.version.files, ["Cargo.toml", "firmware/library.json"]);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let validation = ValidationConfig {
            timeout_secs: 0,
            ..ValidationConfig::default()
        };
        assert_eq!(validation.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn wrong_type_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &utf8(tmp.path()),
            "bump.json",
            r#"{"validation": {"timeout_secs": "soon"}}"#,
        );

        let result = isolated().with_file(&path).load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = utf8(tmp.path()).join("absent.toml");

        assert!(isolated().with_file(&missing).load().is_err());
    }

    #[test]
    fn platform_dirs_are_named_for_the_app() {
        for dir in [user_config_dir(), user_cache_dir(), user_data_local_dir()]
            .into_iter()
            .flatten()
        {
            assert!(dir.as_str().contains(APP_NAME), "{dir}");
        }
    }
}
