//! Package repositories.
//!
//! The resolver never touches the package cache directly. It asks a
//! [`PackageRepository`] where a package manifest lives and which versions
//! of a package exist. [`ElmHome`] answers those questions from the local
//! cache the Elm compiler maintains:
//!
//! ```text
//! $ELM_HOME/
//! └── 0.19.1/
//!     └── packages/
//!         └── elm/
//!             └── core/
//!                 ├── 1.0.4/elm.json
//!                 └── 1.0.5/elm.json
//! ```

use crate::manifest::MANIFEST_FILE;
use crate::version::{Version, VersionError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

/// Compiler version whose package cache is used by default.
pub const DEFAULT_COMPILER_VERSION: Version = Version::new(0, 19, 1);

/// Environment variable overriding the Elm home directory.
pub const ELM_HOME_ENV: &str = "ELM_HOME";

/// Source of package manifests and version listings.
///
/// Implementations own their own caching and consistency; the resolver only
/// reads.
pub trait PackageRepository {
    /// Path to the manifest of `name` at exactly `version`, if present.
    fn find_package_manifest(&self, name: &str, version: &Version) -> Option<PathBuf>;

    /// Every version of `name` the repository knows about.
    fn available_versions(&self, name: &str) -> BTreeSet<Version>;
}

impl<R: PackageRepository + ?Sized> PackageRepository for &R {
    fn find_package_manifest(&self, name: &str, version: &Version) -> Option<PathBuf> {
        (**self).find_package_manifest(name, version)
    }

    fn available_versions(&self, name: &str) -> BTreeSet<Version> {
        (**self).available_versions(name)
    }
}

/// Errors that can occur when loading repository configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// The config file is not valid TOML or has unknown keys.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configured compiler version does not parse.
    #[error("invalid compiler version in config file: {0}")]
    InvalidVersion(#[from] VersionError),
}

/// Where the local package cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Root of the Elm home directory.
    pub elm_home: PathBuf,
    /// Compiler version whose package cache is read.
    pub compiler_version: Version,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            elm_home: default_elm_home(),
            compiler_version: DEFAULT_COMPILER_VERSION,
        }
    }
}

/// On-disk configuration; every key is optional.
///
/// ```toml
/// elm-home = "/opt/elm"
/// compiler-version = "0.19.1"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ConfigFile {
    #[serde(default)]
    elm_home: Option<PathBuf>,
    #[serde(default)]
    compiler_version: Option<String>,
}

impl RepositoryConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, has unknown keys, or holds an
    /// invalid compiler version.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(elm_home) = file.elm_home {
            config.elm_home = elm_home;
        }
        if let Some(version) = file.compiler_version {
            config.compiler_version = Version::parse(&version)?;
        }
        Ok(config)
    }

    /// Directory holding one sub-directory per cached package author.
    #[must_use]
    pub fn packages_dir(&self) -> PathBuf {
        self.elm_home
            .join(self.compiler_version.to_string())
            .join("packages")
    }
}

/// Locate the Elm home directory.
fn default_elm_home() -> PathBuf {
    if let Some(home) = std::env::var_os(ELM_HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .map(|home| home.join(".elm"))
        // Ultimate fallback
        .unwrap_or_else(|| PathBuf::from(".elm"))
}

/// Read-only view of the package cache under an Elm home directory.
#[derive(Debug, Clone)]
pub struct ElmHome {
    config: RepositoryConfig,
}

impl ElmHome {
    /// Create a repository over the given configuration.
    #[must_use]
    pub fn new(config: RepositoryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Directory holding every cached version of `name`.
    ///
    /// Returns `None` unless `name` is a well-formed `author/project`.
    #[must_use]
    pub fn package_dir(&self, name: &str) -> Option<PathBuf> {
        let (author, project) = split_package_name(name)?;
        Some(self.config.packages_dir().join(author).join(project))
    }
}

impl Default for ElmHome {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl PackageRepository for ElmHome {
    fn find_package_manifest(&self, name: &str, version: &Version) -> Option<PathBuf> {
        let path = self
            .package_dir(name)?
            .join(version.to_string())
            .join(MANIFEST_FILE);
        trace!(package = name, %version, path = %path.display(), "probing package manifest");
        path.is_file().then_some(path)
    }

    fn available_versions(&self, name: &str) -> BTreeSet<Version> {
        let Some(dir) = self.package_dir(name) else {
            trace!(package = name, "not an author/project name");
            return BTreeSet::new();
        };

        let pattern = format!(
            "{}/*/{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            MANIFEST_FILE
        );

        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(package = name, error = %e, "invalid version glob");
                return BTreeSet::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|manifest| {
                let dir_name = manifest.parent()?.file_name()?.to_str()?.to_owned();
                match Version::parse(&dir_name) {
                    Ok(version) => Some(version),
                    Err(_) => {
                        trace!(package = name, entry = %dir_name, "skipping non-version directory");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Split `author/project` into its halves.
fn split_package_name(name: &str) -> Option<(&str, &str)> {
    let (author, project) = name.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part != "."
            && part != ".."
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    };
    (valid(author) && valid(project)).then_some((author, project))
}
