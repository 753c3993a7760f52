//! The resolved project model.
//!
//! A [`Manifest`] is what the rest of the tooling works with: the declared
//! manifest plus every dependency resolved to a fully parsed package. It is
//! built once by the resolver and never changes afterwards; when the file on
//! disk changes, load it again.
//!
//! ```text
//! my-app/
//! ├── elm.json              # Manifest
//! ├── elm.project.json      # Optional sidecar (custom test directory)
//! ├── src/                  # Source directories (from elm.json)
//! └── tests/                # Test directory
//! ```

use crate::manifest::{
    Application, Package, DEFAULT_TEST_DIRECTORY, LEGACY_MANIFEST_FILE, MANIFEST_FILE,
    PACKAGE_SOURCE_DIRECTORY,
};
use crate::version::Version;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Name of the package providing the Elm core library.
pub const CORE_PACKAGE: &str = "elm/core";

/// The two kinds of Elm project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    /// A deployable program with pinned dependencies.
    Application(Application),
    /// A reusable library with version-range dependencies.
    Package(Package),
}

/// A manifest with all of its dependencies resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    manifest_path: PathBuf,
    kind: ManifestKind,
    dependencies: Vec<Manifest>,
    test_dependencies: Vec<Manifest>,
}

impl Manifest {
    pub(crate) fn new(
        manifest_path: PathBuf,
        kind: ManifestKind,
        dependencies: Vec<Manifest>,
        test_dependencies: Vec<Manifest>,
    ) -> Self {
        Self {
            manifest_path,
            kind,
            dependencies,
            test_dependencies,
        }
    }

    /// Path to the manifest file; identifies the project.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Directory containing the manifest.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        self.manifest_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Human-facing project name: the name of the manifest's directory.
    #[must_use]
    pub fn presentable_name(&self) -> String {
        self.project_dir().file_name().map_or_else(
            || self.manifest_path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    #[must_use]
    pub fn kind(&self) -> &ManifestKind {
        &self.kind
    }

    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self.kind, ManifestKind::Application(_))
    }

    #[must_use]
    pub fn is_package(&self) -> bool {
        matches!(self.kind, ManifestKind::Package(_))
    }

    #[must_use]
    pub fn as_application(&self) -> Option<&Application> {
        match &self.kind {
            ManifestKind::Application(app) => Some(app),
            ManifestKind::Package(_) => None,
        }
    }

    #[must_use]
    pub fn as_package(&self) -> Option<&Package> {
        match &self.kind {
            ManifestKind::Package(pkg) => Some(pkg),
            ManifestKind::Application(_) => None,
        }
    }

    /// Package name, for package manifests.
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        self.as_package().map(|pkg| pkg.name.as_str())
    }

    /// Package version, for package manifests.
    #[must_use]
    pub fn package_version(&self) -> Option<&Version> {
        self.as_package().map(|pkg| &pkg.version)
    }

    /// Modules a package exposes; empty for applications.
    #[must_use]
    pub fn exposed_modules(&self) -> &[String] {
        match &self.kind {
            ManifestKind::Package(pkg) => pkg.exposed_modules.as_slice(),
            ManifestKind::Application(_) => &[],
        }
    }

    /// Returns true for the package that provides the core library.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.package_name() == Some(CORE_PACKAGE)
    }

    /// The declared compiler requirement, as written in the manifest.
    #[must_use]
    pub fn elm_version(&self) -> String {
        match &self.kind {
            ManifestKind::Application(app) => app.elm_version.to_string(),
            ManifestKind::Package(pkg) => pkg.elm_version.to_string(),
        }
    }

    /// Returns true if the project can be built by compiler `candidate`.
    ///
    /// Applications require the exact pinned version, packages accept any
    /// version inside their declared range. The candidate's pre-release tag
    /// is ignored.
    #[must_use]
    pub fn is_compatible_with(&self, candidate: &Version) -> bool {
        match &self.kind {
            ManifestKind::Application(app) => app.elm_version == *candidate,
            ManifestKind::Package(pkg) => pkg.elm_version.contains(candidate),
        }
    }

    /// Source directories as written, relative to the project directory.
    #[must_use]
    pub fn source_directories_relative(&self) -> Vec<&str> {
        match &self.kind {
            ManifestKind::Application(app) => {
                app.source_directories.iter().map(String::as_str).collect()
            }
            ManifestKind::Package(_) => vec![PACKAGE_SOURCE_DIRECTORY],
        }
    }

    /// Absolute, normalized source directories.
    #[must_use]
    pub fn source_directories(&self) -> Vec<PathBuf> {
        self.source_directories_relative()
            .into_iter()
            .map(|dir| self.resolve_dir(dir))
            .collect()
    }

    /// Test directory relative to the project directory.
    #[must_use]
    pub fn test_directory_relative(&self) -> &str {
        match &self.kind {
            ManifestKind::Application(Application {
                test_directory: Some(dir),
                ..
            }) => dir.as_str(),
            _ => DEFAULT_TEST_DIRECTORY,
        }
    }

    /// Returns true if an application overrides the default test directory.
    #[must_use]
    pub fn has_custom_test_directory(&self) -> bool {
        matches!(
            &self.kind,
            ManifestKind::Application(Application {
                test_directory: Some(_),
                ..
            })
        )
    }

    /// Absolute, normalized test directory.
    #[must_use]
    pub fn test_directory(&self) -> PathBuf {
        self.resolve_dir(self.test_directory_relative())
    }

    /// Source directories followed by the test directory.
    #[must_use]
    pub fn all_source_directories(&self) -> Vec<PathBuf> {
        let mut dirs = self.source_directories();
        dirs.push(self.test_directory());
        dirs
    }

    /// Resolved runtime dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &[Manifest] {
        &self.dependencies
    }

    /// Resolved test dependencies.
    #[must_use]
    pub fn test_dependencies(&self) -> &[Manifest] {
        &self.test_dependencies
    }

    /// Runtime then test dependencies, each package listed once.
    #[must_use]
    pub fn all_resolved_dependencies(&self) -> Vec<&Manifest> {
        let mut seen = HashSet::new();
        self.dependencies
            .iter()
            .chain(&self.test_dependencies)
            .filter(|dep| seen.insert((dep.package_name(), dep.package_version())))
            .collect()
    }

    fn resolve_dir(&self, relative: &str) -> PathBuf {
        normalize_path(&self.project_dir().join(relative))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Symlinks are not consulted.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix.
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !path.has_root() {
                    normalized.push(component);
                }
            }
            c => normalized.push(c),
        }
    }
    normalized
}

/// Find the manifest governing `start`.
///
/// `start` may be a manifest file or a directory. Directories are searched
/// upward; in each, `elm.json` wins over `elm-package.json`.
#[must_use]
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    if start.is_file() {
        return Some(start.to_path_buf());
    }

    let mut current = Some(start);
    while let Some(dir) = current {
        for name in [MANIFEST_FILE, LEGACY_MANIFEST_FILE] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        current = dir.parent();
    }
    None
}
