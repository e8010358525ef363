//! Reading and rewriting the version field of each supported file format.
//!
//! Text formats are edited in place: only the bytes of the version value
//! change. `library.json` is the exception and is re-serialized whole.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use serde::Serialize;
use thiserror::Error;

/// Errors reading or writing a version field.
#[derive(Error, Debug)]
pub enum FormatError {
    /// No version field was found.
    #[error("no version field found")]
    Missing,

    /// A version field was found but is not valid semver.
    #[error("invalid version {value:?}: {source}")]
    Invalid {
        /// The raw field value.
        value: String,
        /// Parse failure.
        source: semver::Error,
    },

    /// The version carries pre-release or build metadata.
    #[error("version {0:?} is not a plain MAJOR.MINOR.PATCH triple")]
    NotPlain(String),

    /// The document is not valid JSON, or not a JSON object.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The format keeps its version outside the file (git tags).
    #[error("version is taken from git tags, not from file content")]
    NotInFile,
}

/// How a file stores its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionFormat {
    /// `go.mod`: the latest git tag.
    GitTag,
    /// `Cargo.toml`: `[package]` or `[workspace.package]` version.
    CargoManifest,
    /// `pyproject.toml`: `[project]` or `[tool.poetry]` version.
    Pyproject,
    /// `CMakeLists.txt`: `project(... VERSION x.y.z)` or `set(*_VERSION x.y.z)`.
    #[serde(rename = "cmake")]
    CMake,
    /// `platformio.ini`: `version = x.y.z`.
    Ini,
    /// `library.json`: top-level `"version"`.
    Json,
    /// `library.properties`: `version=x.y.z`.
    Properties,
}

/// Well-known file names in detection priority order.
pub const WELL_KNOWN_FILES: [(&str, VersionFormat); 7] = [
    ("go.mod", VersionFormat::GitTag),
    ("Cargo.toml", VersionFormat::CargoManifest),
    ("pyproject.toml", VersionFormat::Pyproject),
    ("CMakeLists.txt", VersionFormat::CMake),
    ("platformio.ini", VersionFormat::Ini),
    ("library.json", VersionFormat::Json),
    ("library.properties", VersionFormat::Properties),
];

static TOML_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*version\s*=\s*["']([^"']+)["']"#).expect("valid TOML version regex")
});

// Directives after a `#` on the same line are comments. The triple must not
// continue into a fourth component.
static CMAKE_PROJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[^#\n]*?(?i:\bproject)\s*\(\s*[^)#]+?\s+VERSION\s+(\d+\.\d+\.\d+)(?:[^0-9.]|$)",
    )
    .expect("valid CMake project regex")
});

static CMAKE_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[^#\n]*?(?i:\bset)\s*\(\s*\w*_VERSION\s+"?(\d+\.\d+\.\d+)(?:[^0-9.]|$)"#)
        .expect("valid CMake set regex")
});

static INI_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*version[ \t]*=[ \t]*["']?([0-9A-Za-z.+-]+)"#)
        .expect("valid ini version regex")
});

static PROPERTIES_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*version[ \t]*=[ \t]*([0-9A-Za-z.+-]+)")
        .expect("valid properties version regex")
});

impl VersionFormat {
    /// Infer the format from a path's final component.
    pub fn from_file_name(path: &str) -> Option<Self> {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        WELL_KNOWN_FILES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, format)| *format)
    }

    /// Short human description, e.g. for `info` output.
    pub const fn description(self) -> &'static str {
        match self {
            Self::GitTag => "Go module (version from git tags)",
            Self::CargoManifest => "Rust crate manifest",
            Self::Pyproject => "Python project",
            Self::CMake => "CMake project",
            Self::Ini => "PlatformIO project",
            Self::Json => "PlatformIO library manifest",
            Self::Properties => "Arduino library properties",
        }
    }

    /// Whether the version lives in the file itself.
    pub const fn is_in_file(self) -> bool {
        !matches!(self, Self::GitTag)
    }

    /// Read the version from file content.
    pub fn extract(self, content: &str) -> Result<Version, FormatError> {
        match self {
            Self::GitTag => Err(FormatError::NotInFile),
            Self::Json => {
                let doc: serde_json::Value = serde_json::from_str(content)?;
                let value = doc
                    .get("version")
                    .and_then(serde_json::Value::as_str)
                    .ok_or(FormatError::Missing)?;
                parse_value(value)
            }
            _ => {
                let span = self
                    .spans(content)
                    .into_iter()
                    .next()
                    .ok_or(FormatError::Missing)?;
                parse_value(&content[span])
            }
        }
    }

    /// Return `content` with the version field set to `version`.
    pub fn update(self, content: &str, version: &Version) -> Result<String, FormatError> {
        match self {
            Self::GitTag => Err(FormatError::NotInFile),
            Self::Json => update_json(content, version),
            _ => {
                let spans = self.spans(content);
                if spans.is_empty() {
                    return Err(FormatError::Missing);
                }
                Ok(splice(content, &spans, &version.to_string()))
            }
        }
    }

    /// Byte ranges of every version value this format rewrites.
    ///
    /// The first range is the one [`VersionFormat::extract`] reads.
    fn spans(self, content: &str) -> Vec<Range<usize>> {
        match self {
            Self::CargoManifest => toml_span(content, &["package", "workspace.package"])
                .into_iter()
                .collect(),
            Self::Pyproject => toml_span(content, &["project", "tool.poetry"])
                .into_iter()
                .collect(),
            Self::CMake => {
                let mut spans = capture_spans(&CMAKE_PROJECT, content);
                spans.extend(capture_spans(&CMAKE_SET, content));
                spans
            }
            Self::Ini => capture_spans(&INI_VERSION, content),
            Self::Properties => capture_spans(&PROPERTIES_VERSION, content),
            Self::GitTag | Self::Json => Vec::new(),
        }
    }
}

impl fmt::Display for VersionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitTag => "git-tag",
            Self::CargoManifest => "cargo",
            Self::Pyproject => "pyproject",
            Self::CMake => "cmake",
            Self::Ini => "ini",
            Self::Json => "json",
            Self::Properties => "properties",
        };
        f.write_str(name)
    }
}

fn parse_value(value: &str) -> Result<Version, FormatError> {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let version = Version::parse(bare).map_err(|source| FormatError::Invalid {
        value: trimmed.to_string(),
        source,
    })?;
    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(FormatError::NotPlain(trimmed.to_string()));
    }
    Ok(version)
}

/// Find the `version = "..."` value in the first of `sections` that has one.
fn toml_span(content: &str, sections: &[&str]) -> Option<Range<usize>> {
    sections
        .iter()
        .find_map(|section| toml_section_span(content, section))
}

fn toml_section_span(content: &str, section: &str) -> Option<Range<usize>> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            current = trimmed
                .trim_start_matches('[')
                .split(']')
                .next()
                .map(str::trim);
        } else if current == Some(section)
            && let Some(value) = TOML_VERSION.captures(line).and_then(|c| c.get(1))
        {
            return Some(offset + value.start()..offset + value.end());
        }
        offset += line.len();
    }

    None
}

fn capture_spans(re: &Regex, content: &str) -> Vec<Range<usize>> {
    re.captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.range())
        .collect()
}

/// Replace each (non-overlapping) span with `replacement`.
fn splice(content: &str, spans: &[Range<usize>], replacement: &str) -> String {
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|r| r.start);
    sorted.dedup();

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for span in sorted {
        if span.start < cursor {
            continue;
        }
        out.push_str(&content[cursor..span.start]);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    out
}

fn update_json(content: &str, version: &Version) -> Result<String, FormatError> {
    let mut doc: serde_json::Value = serde_json::from_str(content)?;
    let Some(object) = doc.as_object_mut() else {
        return Err(FormatError::Missing);
    };
    object.insert(
        "version".to_string(),
        serde_json::Value::String(version.to_string()),
    );

    let mut out = serde_json::to_string_pretty(&doc)?;
    if content.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
