//! Version file discovery and synchronized rewriting.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::format::{VersionFormat, WELL_KNOWN_FILES};
use super::{
    BumpLevel, DEFAULT_VERSION, VersionError, VersionResult, next_version, parse_plain_version,
};
use crate::bump_config::BumpConfig;
use crate::git::Git;

/// A file that carries the project version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    /// Path relative to the project root.
    pub path: Utf8PathBuf,
    /// How the file stores its version.
    pub format: VersionFormat,
    /// Human-readable kind of file.
    pub description: &'static str,
    /// Version read during detection, if it could be read.
    pub version: Option<Version>,
}

/// The version files of one project and their single working version.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    git: Git,
    config_files: Vec<String>,
    files: Vec<ProjectFile>,
    current: Version,
    override_origin: Option<String>,
}

impl VersionRegistry {
    /// Create an empty registry for the project `git` runs in.
    ///
    /// Call [`VersionRegistry::detect`] before anything else.
    pub fn new(git: Git) -> Self {
        Self {
            git,
            config_files: Vec::new(),
            files: Vec::new(),
            current: DEFAULT_VERSION,
            override_origin: None,
        }
    }

    /// Override list from configuration, used when no `.bump` file exists.
    #[must_use]
    pub fn with_config_files(mut self, files: Vec<String>) -> Self {
        self.config_files = files;
        self
    }

    /// Project root.
    pub fn root(&self) -> &Utf8Path {
        self.git.workdir()
    }

    /// Discover version files and settle the working version.
    ///
    /// With an override list every file must parse and agree. Without one,
    /// the well-known files are scanned in priority order and the first
    /// version that parses wins.
    #[instrument(skip(self), fields(root = %self.root()))]
    pub async fn detect(&mut self) -> VersionResult<()> {
        self.files.clear();
        self.current = DEFAULT_VERSION;
        self.override_origin = None;

        match BumpConfig::load(self.root(), &self.config_files)? {
            Some(list) => self.detect_override(&list).await?,
            None => self.detect_well_known().await,
        }

        info!(
            version = %self.current,
            files = self.files.len(),
            override_list = self.override_origin.is_some(),
            "detected version files"
        );
        Ok(())
    }

    async fn detect_override(&mut self, list: &BumpConfig) -> VersionResult<()> {
        let mut first: Option<(Utf8PathBuf, Version)> = None;

        for entry in list.files() {
            let format = VersionFormat::from_file_name(entry)
                .ok_or_else(|| VersionError::UnknownFormat(entry.clone()))?;
            let path = Utf8PathBuf::from(entry);
            let version = self.read_version(&path, format).await?;

            match &first {
                None => first = Some((path.clone(), version.clone())),
                Some((first_path, first_version)) if *first_version != version => {
                    return Err(VersionError::Mismatch {
                        first: first_path.to_string(),
                        first_version: first_version.clone(),
                        other: path.to_string(),
                        other_version: version,
                    });
                }
                Some(_) => {}
            }

            self.files.push(ProjectFile {
                path,
                format,
                description: format.description(),
                version: Some(version),
            });
        }

        if let Some((_, version)) = first {
            self.current = version;
        }
        self.override_origin = Some(list.origin().to_string());
        Ok(())
    }

    async fn detect_well_known(&mut self) {
        let mut settled = false;

        for (name, format) in WELL_KNOWN_FILES {
            if !self.root().join(name).is_file() {
                continue;
            }

            let path = Utf8PathBuf::from(name);
            let version = match self.read_version(&path, format).await {
                Ok(version) => Some(version),
                Err(e) => {
                    warn!(file = name, error = %e, "could not read version");
                    None
                }
            };

            if !settled && let Some(v) = &version {
                self.current = v.clone();
                settled = true;
            }

            debug!(file = name, %format, ?version, "found version file");
            self.files.push(ProjectFile {
                path,
                format,
                description: format.description(),
                version,
            });
        }
    }

    async fn read_version(&self, path: &Utf8Path, format: VersionFormat) -> VersionResult<Version> {
        if !format.is_in_file() {
            return match self.git.latest_tag().await? {
                Some(tag) => parse_plain_version(&tag),
                None => Ok(DEFAULT_VERSION),
            };
        }

        let full = self.root().join(path);
        let content = std::fs::read_to_string(&full).map_err(|source| VersionError::Io {
            path: path.to_string(),
            source,
        })?;
        format
            .extract(&content)
            .map_err(|source| VersionError::Format {
                path: path.to_string(),
                format,
                source,
            })
    }

    /// Detected files, in detection order.
    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    /// The working version.
    pub const fn current(&self) -> &Version {
        &self.current
    }

    /// Where the override list came from, if one is in effect.
    pub fn override_origin(&self) -> Option<&str> {
        self.override_origin.as_deref()
    }

    /// The working version with `level` applied.
    pub fn bump(&self, level: BumpLevel) -> VersionResult<Version> {
        next_version(&self.current, level)
    }

    /// The working version with the major component bumped.
    pub fn bump_major(&self) -> VersionResult<Version> {
        self.bump(BumpLevel::Major)
    }

    /// The working version with the minor component bumped.
    pub fn bump_minor(&self) -> VersionResult<Version> {
        self.bump(BumpLevel::Minor)
    }

    /// The working version with the patch component bumped.
    pub fn bump_patch(&self) -> VersionResult<Version> {
        self.bump(BumpLevel::Patch)
    }

    /// Write `new_version` into every detected file, in order.
    ///
    /// Accepts an optional `v` prefix. Stops at the first failure; files
    /// already written stay written. Files whose version lives in git tags
    /// are skipped. Returns the paths that were rewritten.
    #[instrument(skip(self), fields(root = %self.root()))]
    pub fn update_all(&mut self, new_version: &str) -> VersionResult<Vec<Utf8PathBuf>> {
        let version = parse_plain_version(new_version)?;
        let mut written = Vec::new();

        for file in &mut self.files {
            if !file.format.is_in_file() {
                debug!(path = %file.path, "version kept in git tags, skipping");
                continue;
            }

            let full = self.git.workdir().join(&file.path);
            let content = std::fs::read_to_string(&full).map_err(|source| VersionError::Io {
                path: file.path.to_string(),
                source,
            })?;
            let updated =
                file.format
                    .update(&content, &version)
                    .map_err(|source| VersionError::Format {
                        path: file.path.to_string(),
                        format: file.format,
                        source,
                    })?;
            std::fs::write(&full, updated).map_err(|source| VersionError::Io {
                path: file.path.to_string(),
                source,
            })?;

            debug!(path = %file.path, %version, "updated version");
            file.version = Some(version.clone());
            written.push(file.path.clone());
        }

        info!(%version, files = written.len(), "updated version files");
        self.current = version;
        Ok(written)
    }

    /// Re-read every file and confirm they still agree.
    ///
    /// Only enforced with an override list; auto-detected files are never
    /// required to agree. Files whose version lives in git tags are skipped,
    /// since the tag only moves after the bump is committed.
    #[instrument(skip(self), fields(root = %self.root()))]
    pub async fn check_sync(&self) -> VersionResult<()> {
        if self.override_origin.is_none() {
            return Ok(());
        }

        let mut first: Option<(&Utf8Path, Version)> = None;
        for file in self.files.iter().filter(|f| f.format.is_in_file()) {
            let version = self.read_version(&file.path, file.format).await?;
            match &first {
                None => first = Some((file.path.as_path(), version)),
                Some((first_path, first_version)) if *first_version != version => {
                    return Err(VersionError::Mismatch {
                        first: first_path.to_string(),
                        first_version: first_version.clone(),
                        other: file.path.to_string(),
                        other_version: version,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
