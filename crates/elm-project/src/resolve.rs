//! Dependency resolution for Elm projects.
//!
//! This module provides:
//! - Exact lookup of an application's pinned dependencies
//! - Minimum-version selection for a package's constraint dependencies
//! - Recursive loading of every dependency manifest, skipping the test
//!   dependencies of packages loaded on someone else's behalf
//! - Cycle detection across the dependency chain

use crate::error::{read_file, LoadError};
use crate::manifest::{
    decode_exact_dependencies, decode_manifest, RawManifest, Sidecar, LEGACY_EXACT_DEPENDENCIES,
    SIDECAR_FILE,
};
use crate::project::{Manifest, ManifestKind};
use crate::repository::PackageRepository;
use crate::version::{Constraint, Version};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load the manifest at `path` and resolve all of its dependencies,
/// including test dependencies.
///
/// For applications, a [`SIDECAR_FILE`] next to the manifest may override the
/// test directory. For legacy manifests, pinned versions are read from
/// [`LEGACY_EXACT_DEPENDENCIES`] when present.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or decoded, or if any
/// dependency cannot be resolved.
pub fn load_manifest<R: PackageRepository>(
    path: impl AsRef<Path>,
    repository: R,
) -> Result<Manifest, LoadError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading manifest");

    let raw = decode_manifest(&read_file(path)?, path)?;
    let project_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let raw = match raw {
        RawManifest::Application(mut app) => {
            app.test_directory = read_sidecar(&project_dir.join(SIDECAR_FILE))
                .and_then(|sidecar| sidecar.test_directory);
            RawManifest::Application(app)
        }
        RawManifest::Legacy(mut legacy) => {
            let exact = project_dir.join(LEGACY_EXACT_DEPENDENCIES);
            if exact.is_file() {
                legacy.exact_dependencies = decode_exact_dependencies(&read_file(&exact)?, &exact)?;
            }
            RawManifest::Legacy(legacy)
        }
        package @ RawManifest::Package(_) => package,
    };

    Resolver::new(repository).resolve(raw, path)
}

/// Read the sidecar file; a missing or unreadable sidecar means "no overrides".
fn read_sidecar(path: &Path) -> Option<Sidecar> {
    if !path.is_file() {
        return None;
    }
    match read_file(path).and_then(|raw| Sidecar::decode(&raw, path)) {
        Ok(sidecar) => Some(sidecar),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable sidecar file");
            None
        }
    }
}

/// Dependency resolver for Elm manifests.
#[derive(Debug)]
pub struct Resolver<R> {
    repository: R,
    /// Skip the test dependencies of the root manifest.
    ignore_test_deps: bool,
}

/// State shared by one resolution call.
#[derive(Default)]
struct Session {
    /// Packages whose resolution is underway, outermost first.
    in_progress: Vec<(String, Version)>,
    /// Packages already resolved during this call.
    resolved: HashMap<(String, Version), Manifest>,
}

impl<R: PackageRepository> Resolver<R> {
    /// Create a resolver backed by `repository`.
    #[must_use]
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            ignore_test_deps: false,
        }
    }

    /// Do not resolve the root manifest's test dependencies.
    ///
    /// Dependencies of the root are always loaded this way regardless of
    /// this setting: their test fixtures are not guaranteed to be cached.
    #[must_use]
    pub fn ignore_test_deps(mut self, ignore: bool) -> Self {
        self.ignore_test_deps = ignore;
        self
    }

    /// Resolve a decoded manifest read from `manifest_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No available version satisfies a constraint
    /// - The repository has no manifest for a selected version
    /// - A dependency manifest cannot be read or is not a package manifest
    /// - Dependencies form a cycle
    pub fn resolve(
        &self,
        raw: RawManifest,
        manifest_path: impl Into<PathBuf>,
    ) -> Result<Manifest, LoadError> {
        let mut session = Session::default();
        self.resolve_manifest(raw, manifest_path.into(), self.ignore_test_deps, &mut session)
    }

    fn resolve_manifest(
        &self,
        raw: RawManifest,
        manifest_path: PathBuf,
        ignore_test_deps: bool,
        session: &mut Session,
    ) -> Result<Manifest, LoadError> {
        match raw {
            RawManifest::Application(app) => {
                let dependencies = app
                    .dependencies
                    .iter()
                    .map(|(name, version)| self.load_exact(name, version, session))
                    .collect::<Result<Vec<_>, _>>()?;

                let test_dependencies = if ignore_test_deps {
                    Vec::new()
                } else {
                    app.test_dependencies
                        .iter()
                        .map(|(name, version)| self.load_exact(name, version, session))
                        .collect::<Result<Vec<_>, _>>()?
                };

                Ok(Manifest::new(
                    manifest_path,
                    ManifestKind::Application(app),
                    dependencies,
                    test_dependencies,
                ))
            }
            RawManifest::Package(package) => {
                let dependencies = self.load_constrained_all(&package.dependencies, session)?;

                let test_dependencies = if ignore_test_deps {
                    Vec::new()
                } else {
                    self.load_constrained_all(&package.test_dependencies, session)?
                };

                Ok(Manifest::new(
                    manifest_path,
                    ManifestKind::Package(package),
                    dependencies,
                    test_dependencies,
                ))
            }
            RawManifest::Legacy(legacy) => {
                // Legacy dependency metadata lives in elm-stuff; nothing is loaded.
                debug!(path = %manifest_path.display(), "legacy manifest, skipping resolution");
                Ok(Manifest::new(
                    manifest_path,
                    ManifestKind::Application(legacy.into_application()),
                    Vec::new(),
                    Vec::new(),
                ))
            }
        }
    }

    fn load_constrained_all(
        &self,
        constraints: &BTreeMap<String, Constraint>,
        session: &mut Session,
    ) -> Result<Vec<Manifest>, LoadError> {
        constraints
            .iter()
            .map(|(name, constraint)| self.load_constrained(name, constraint, session))
            .collect()
    }

    /// Resolve `name` to the smallest available version inside `constraint`.
    fn load_constrained(
        &self,
        name: &str,
        constraint: &Constraint,
        session: &mut Session,
    ) -> Result<Manifest, LoadError> {
        let available = self.repository.available_versions(name);
        let version = constraint.select_minimum(&available).ok_or_else(|| {
            let reason = if available.is_empty() {
                "no versions available".to_string()
            } else {
                let listed: Vec<_> = available.iter().map(ToString::to_string).collect();
                format!("no available version satisfies it (available: {})", listed.join(", "))
            };
            LoadError::UnresolvedDependency {
                package: name.to_string(),
                requirement: constraint.to_string(),
                reason,
            }
        })?;

        debug!(package = name, %constraint, %version, "selected minimum satisfying version");
        self.load_package(name, version, &constraint.to_string(), session)
    }

    fn load_exact(
        &self,
        name: &str,
        version: &Version,
        session: &mut Session,
    ) -> Result<Manifest, LoadError> {
        self.load_package(name, version, &format!("= {version}"), session)
    }

    /// Load and resolve one package as a dependency of something else.
    fn load_package(
        &self,
        name: &str,
        version: &Version,
        requirement: &str,
        session: &mut Session,
    ) -> Result<Manifest, LoadError> {
        let key = (name.to_string(), version.clone());

        if let Some(manifest) = session.resolved.get(&key) {
            return Ok(manifest.clone());
        }

        if let Some(start) = session.in_progress.iter().position(|entry| *entry == key) {
            let cycle = session.in_progress[start..]
                .iter()
                .chain(std::iter::once(&key))
                .map(|(name, version)| format!("{name}@{version}"))
                .collect();
            return Err(LoadError::DependencyCycle { cycle });
        }

        let path = self
            .repository
            .find_package_manifest(name, version)
            .ok_or_else(|| LoadError::UnresolvedDependency {
                package: name.to_string(),
                requirement: requirement.to_string(),
                reason: format!("no manifest found for version {version}"),
            })?;

        debug!(package = name, %version, path = %path.display(), "loading dependency manifest");

        let package = match decode_manifest(&read_file(&path)?, &path)? {
            RawManifest::Package(package) => package,
            _ => {
                return Err(LoadError::schema(
                    &path,
                    format!("dependency '{name}' is not a package manifest"),
                ))
            }
        };

        if package.name != name || package.version != *version {
            warn!(
                requested = %format!("{name}@{version}"),
                found = %format!("{}@{}", package.name, package.version),
                path = %path.display(),
                "dependency manifest does not match the requested package"
            );
        }

        session.in_progress.push(key.clone());
        let resolved = self.resolve_manifest(RawManifest::Package(package), path, true, session);
        session.in_progress.pop();

        let manifest = resolved?;
        session.resolved.insert(key, manifest.clone());
        Ok(manifest)
    }
}
