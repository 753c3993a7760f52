//! Elm manifest (`elm.json`) decoding.
//!
//! Decoding turns raw manifest bytes into a [`RawManifest`]: the declared
//! contents of the file with every version and constraint parsed, but no
//! dependency resolved yet.
//!
//! ```json
//! {
//!     "type": "application",
//!     "source-directories": ["src"],
//!     "elm-version": "0.19.1",
//!     "dependencies": {
//!         "direct": { "elm/core": "1.0.5" },
//!         "indirect": { "elm/json": "1.1.3" }
//!     },
//!     "test-dependencies": { "direct": {}, "indirect": {} }
//! }
//! ```

use crate::error::LoadError;
use crate::version::{Constraint, Version};
use serde::de::{DeserializeOwned, Deserializer, Error as _, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// The manifest filename.
pub const MANIFEST_FILE: &str = "elm.json";

/// The manifest filename used by Elm 0.18 and earlier.
pub const LEGACY_MANIFEST_FILE: &str = "elm-package.json";

/// Exact dependency versions of a legacy project, relative to its directory.
pub const LEGACY_EXACT_DEPENDENCIES: &str = "elm-stuff/exact-dependencies.json";

/// Optional companion file carrying settings `elm.json` has no room for.
pub const SIDECAR_FILE: &str = "elm.project.json";

/// Test directory used when none is configured.
pub const DEFAULT_TEST_DIRECTORY: &str = "tests";

/// The only source directory of a package.
pub const PACKAGE_SOURCE_DIRECTORY: &str = "src";

/// A decoded but unresolved manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawManifest {
    /// `"type": "application"`.
    Application(Application),
    /// `"type": "package"`.
    Package(Package),
    /// An Elm 0.18 `elm-package.json`.
    Legacy(LegacyManifest),
}

/// Declared contents of an application manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Exact compiler version.
    pub elm_version: Version,

    /// Source directories relative to the manifest directory.
    pub source_directories: Vec<String>,

    /// Exact runtime dependencies.
    pub dependencies: ExactDependencies,

    /// Exact test dependencies.
    pub test_dependencies: ExactDependencies,

    /// Test directory override, relative to the manifest directory.
    pub test_directory: Option<String>,
}

/// Direct and indirect dependencies pinned to exact versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactDependencies {
    pub direct: BTreeMap<String, Version>,
    pub indirect: BTreeMap<String, Version>,
}

impl ExactDependencies {
    /// Direct dependencies followed by indirect ones.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Version)> {
        self.direct.iter().chain(self.indirect.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.direct.len() + self.indirect.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.indirect.is_empty()
    }
}

/// Declared contents of a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package name, `author/project`.
    pub name: String,

    /// Published version.
    pub version: Version,

    /// One-line description.
    pub summary: Option<String>,

    /// SPDX license identifier.
    pub license: Option<String>,

    /// Accepted compiler versions.
    pub elm_version: Constraint,

    /// Exposed modules in declaration order.
    pub exposed_modules: Vec<String>,

    /// Runtime dependencies.
    pub dependencies: BTreeMap<String, Constraint>,

    /// Test dependencies.
    pub test_dependencies: BTreeMap<String, Constraint>,
}

/// Declared contents of an Elm 0.18 `elm-package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyManifest {
    pub elm_version: Constraint,
    pub source_directories: Vec<String>,
    pub exposed_modules: Vec<String>,
    pub dependencies: BTreeMap<String, Constraint>,

    /// Pinned versions from `elm-stuff/exact-dependencies.json`, if present.
    pub exact_dependencies: BTreeMap<String, Version>,
}

impl LegacyManifest {
    /// Synthesize an application from the legacy layout.
    ///
    /// The compiler version is the lower bound of the declared range. Pinned
    /// versions of declared dependencies become direct dependencies, every
    /// other pinned version is indirect.
    #[must_use]
    pub fn into_application(self) -> Application {
        let (direct, indirect) = self
            .exact_dependencies
            .into_iter()
            .partition(|(name, _)| self.dependencies.contains_key(name));

        Application {
            elm_version: self.elm_version.lower().clone(),
            source_directories: self.source_directories,
            dependencies: ExactDependencies { direct, indirect },
            test_dependencies: ExactDependencies::default(),
            test_directory: None,
        }
    }
}

/// Exposed module names, given either as a flat list or grouped by category.
///
/// ```json
/// "exposed-modules": ["Json.Decode", "Json.Encode"]
/// "exposed-modules": { "Decoding": ["Json.Decode"], "Encoding": ["Json.Encode"] }
/// ```
///
/// Both forms flatten to the same ordered list; categories are read in
/// source order and then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposedModules(pub Vec<String>);

impl<'de> Deserialize<'de> for ExposedModules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExposedModulesVisitor;

        impl<'de> Visitor<'de> for ExposedModulesVisitor {
            type Value = ExposedModules;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of module names or a map of category to module names")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut modules = Vec::new();
                while let Some(module) = seq.next_element::<String>()? {
                    modules.push(module);
                }
                Ok(ExposedModules(modules))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut modules = Vec::new();
                while let Some((_category, names)) = map.next_entry::<String, Vec<String>>()? {
                    modules.extend(names);
                }
                Ok(ExposedModules(modules))
            }
        }

        deserializer.deserialize_any(ExposedModulesVisitor)
    }
}

/// Settings read from [`SIDECAR_FILE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sidecar {
    /// Custom test directory, relative to the manifest directory.
    #[serde(default)]
    pub test_directory: Option<String>,
}

impl Sidecar {
    /// Decode a sidecar file.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object of the expected shape.
    pub fn decode(raw: &[u8], path: &Path) -> Result<Self, LoadError> {
        decode_object(raw, path)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ApplicationDto {
    source_directories: Vec<String>,
    elm_version: String,
    #[serde(deserialize_with = "object")]
    dependencies: ExactDependenciesDto,
    #[serde(default, deserialize_with = "object")]
    test_dependencies: ExactDependenciesDto,
}

#[derive(Default, Deserialize)]
struct ExactDependenciesDto {
    #[serde(default)]
    direct: BTreeMap<String, String>,
    #[serde(default)]
    indirect: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PackageDto {
    name: String,
    version: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    license: Option<String>,
    elm_version: String,
    #[serde(default)]
    exposed_modules: ExposedModules,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    test_dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LegacyDto {
    elm_version: String,
    #[serde(default = "default_legacy_source_directories")]
    source_directories: Vec<String>,
    #[serde(default)]
    exposed_modules: ExposedModules,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

fn default_legacy_source_directories() -> Vec<String> {
    vec![String::from(".")]
}

/// Field deserializer that only accepts a JSON object. Derived struct impls
/// also accept arrays, filling fields by position.
fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => T::deserialize(value).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse `raw` and require a JSON object at the top level.
fn read_object(raw: &[u8], path: &Path) -> Result<Map<String, Value>, LoadError> {
    match serde_json::from_slice(raw).map_err(|e| LoadError::json(path, e))? {
        Value::Object(map) => Ok(map),
        other => Err(LoadError::schema(
            path,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

/// Decode a top-level JSON object into `T`.
///
/// The typed pass reads the original bytes so map entries keep their source
/// order.
fn decode_object<T: DeserializeOwned>(raw: &[u8], path: &Path) -> Result<T, LoadError> {
    read_object(raw, path)?;
    serde_json::from_slice(raw).map_err(|e| LoadError::json(path, e))
}

/// Decode manifest bytes read from `path`.
///
/// A file named [`LEGACY_MANIFEST_FILE`] is decoded in the legacy format;
/// anything else dispatches on its `"type"` field.
///
/// # Errors
///
/// - [`LoadError::MalformedJson`] if the payload is not valid JSON
/// - [`LoadError::UnknownType`] if `"type"` is neither `"application"` nor `"package"`
/// - [`LoadError::SchemaMismatch`] if the payload is not a JSON object, or a
///   required field is missing, has the wrong shape, or holds an invalid
///   version or constraint
pub fn decode_manifest(raw: &[u8], path: &Path) -> Result<RawManifest, LoadError> {
    if is_legacy_manifest(path) {
        let dto: LegacyDto = decode_object(raw, path)?;
        return LegacyManifest::from_dto(dto, path).map(RawManifest::Legacy);
    }

    let root = read_object(raw, path)?;

    match root.get("type") {
        Some(Value::String(kind)) if kind == "application" => {
            let dto: ApplicationDto =
                serde_json::from_slice(raw).map_err(|e| LoadError::json(path, e))?;
            Application::from_dto(dto, path).map(RawManifest::Application)
        }
        Some(Value::String(kind)) if kind == "package" => {
            let dto: PackageDto =
                serde_json::from_slice(raw).map_err(|e| LoadError::json(path, e))?;
            Package::from_dto(dto, path).map(RawManifest::Package)
        }
        Some(Value::String(other)) => Err(LoadError::UnknownType {
            path: path.to_path_buf(),
            found: other.clone(),
        }),
        Some(other) => Err(LoadError::schema(
            path,
            format!("field `type`: expected a string, found {}", json_kind(other)),
        )),
        None => Err(LoadError::schema(path, "missing field `type`")),
    }
}

/// Parse a legacy exact-dependencies file (a flat name to version map).
///
/// # Errors
///
/// Returns an error if the payload is malformed or holds an invalid version.
pub fn decode_exact_dependencies(
    raw: &[u8],
    path: &Path,
) -> Result<BTreeMap<String, Version>, LoadError> {
    let dto: BTreeMap<String, String> = decode_object(raw, path)?;
    parse_versions(&dto, path, "exact dependencies")
}

/// Returns true if `path` names a legacy manifest.
#[must_use]
pub fn is_legacy_manifest(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name == LEGACY_MANIFEST_FILE)
}

impl Application {
    fn from_dto(dto: ApplicationDto, path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            elm_version: parse_version(&dto.elm_version, path, "elm-version")?,
            source_directories: dto.source_directories,
            dependencies: dto.dependencies.parse(path, "dependencies")?,
            test_dependencies: dto.test_dependencies.parse(path, "test-dependencies")?,
            test_directory: None,
        })
    }
}

impl ExactDependenciesDto {
    fn parse(&self, path: &Path, field: &str) -> Result<ExactDependencies, LoadError> {
        Ok(ExactDependencies {
            direct: parse_versions(&self.direct, path, &format!("{field}.direct"))?,
            indirect: parse_versions(&self.indirect, path, &format!("{field}.indirect"))?,
        })
    }
}

impl Package {
    fn from_dto(dto: PackageDto, path: &Path) -> Result<Self, LoadError> {
        if dto.name.is_empty() {
            return Err(LoadError::schema(path, "field `name` cannot be empty"));
        }

        Ok(Self {
            version: parse_version(&dto.version, path, "version")?,
            elm_version: parse_constraint(&dto.elm_version, path, "elm-version")?,
            dependencies: parse_constraints(&dto.dependencies, path, "dependencies")?,
            test_dependencies: parse_constraints(&dto.test_dependencies, path, "test-dependencies")?,
            exposed_modules: dto.exposed_modules.0,
            summary: dto.summary,
            license: dto.license,
            name: dto.name,
        })
    }
}

impl LegacyManifest {
    fn from_dto(dto: LegacyDto, path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            elm_version: parse_constraint(&dto.elm_version, path, "elm-version")?,
            dependencies: parse_constraints(&dto.dependencies, path, "dependencies")?,
            source_directories: dto.source_directories,
            exposed_modules: dto.exposed_modules.0,
            exact_dependencies: BTreeMap::new(),
        })
    }
}

fn parse_version(value: &str, path: &Path, field: &str) -> Result<Version, LoadError> {
    Version::parse(value).map_err(|e| LoadError::schema(path, format!("field `{field}`: {e}")))
}

fn parse_constraint(value: &str, path: &Path, field: &str) -> Result<Constraint, LoadError> {
    Constraint::parse(value).map_err(|e| LoadError::schema(path, format!("field `{field}`: {e}")))
}

fn parse_versions(
    raw: &BTreeMap<String, String>,
    path: &Path,
    field: &str,
) -> Result<BTreeMap<String, Version>, LoadError> {
    raw.iter()
        .map(|(name, value)| {
            parse_version(value, path, &format!("{field}.{name}")).map(|v| (name.clone(), v))
        })
        .collect()
}

fn parse_constraints(
    raw: &BTreeMap<String, String>,
    path: &Path,
    field: &str,
) -> Result<BTreeMap<String, Constraint>, LoadError> {
    raw.iter()
        .map(|(name, value)| {
            parse_constraint(value, path, &format!("{field}.{name}")).map(|c| (name.clone(), c))
        })
        .collect()
}
