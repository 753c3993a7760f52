//! Project model for Elm tooling.
//!
//! This crate provides:
//! - Parsing of Elm versions and version-range constraints
//! - Decoding of `elm.json` manifests (applications and packages) and of the
//!   legacy `elm-package.json` format
//! - A package repository abstraction with an implementation over the local
//!   `$ELM_HOME` package cache
//! - Dependency resolution into a fully parsed, immutable project model

mod error;
mod manifest;
mod project;
mod repository;
mod resolve;
mod version;

pub use error::LoadError;
pub use manifest::{
    decode_exact_dependencies, decode_manifest, is_legacy_manifest, Application,
    ExactDependencies, ExposedModules, LegacyManifest, Package, RawManifest, Sidecar,
    DEFAULT_TEST_DIRECTORY, LEGACY_EXACT_DEPENDENCIES, LEGACY_MANIFEST_FILE, MANIFEST_FILE,
    PACKAGE_SOURCE_DIRECTORY, SIDECAR_FILE,
};
pub use project::{find_manifest, normalize_path, Manifest, ManifestKind, CORE_PACKAGE};
pub use repository::{
    ConfigError, ElmHome, PackageRepository, RepositoryConfig, DEFAULT_COMPILER_VERSION,
    ELM_HOME_ENV,
};
pub use resolve::{load_manifest, Resolver};
pub use version::{Constraint, Version, VersionError};
