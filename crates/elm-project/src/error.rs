//! Errors produced while loading and resolving a project.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading a manifest and resolving its dependencies.
///
/// Every variant is fatal to the load that produced it; no partial project
/// model is returned.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The manifest file does not exist.
    #[error("manifest not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The payload is not valid JSON.
    #[error("malformed JSON in '{}': {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The `"type"` field names an unsupported project kind.
    #[error("unknown manifest type '{found}' in '{}', expected \"application\" or \"package\"", path.display())]
    UnknownType { path: PathBuf, found: String },

    /// Valid JSON that does not have the expected shape.
    #[error("invalid manifest '{}': {reason}", path.display())]
    SchemaMismatch { path: PathBuf, reason: String },

    /// No acceptable version of a dependency could be loaded.
    #[error("unresolved dependency '{package}' ({requirement}): {reason}")]
    UnresolvedDependency {
        package: String,
        requirement: String,
        reason: String,
    },

    /// Dependencies refer back to a package still being resolved.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },
}

impl LoadError {
    pub(crate) fn schema(path: &Path, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Classify a `serde_json` failure: syntax errors are malformed payloads,
    /// data errors are schema mismatches.
    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        if source.is_syntax() || source.is_eof() {
            Self::MalformedJson {
                path: path.to_path_buf(),
                source,
            }
        } else if source.is_io() {
            Self::Io {
                path: path.to_path_buf(),
                source: source.into(),
            }
        } else {
            Self::schema(path, source.to_string())
        }
    }
}

/// Read a whole file, mapping a missing file to [`LoadError::FileNotFound`].
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|e| LoadError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let err = read_file(Path::new("/definitely/not/here/elm.json")).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(ref p) if p.ends_with("elm.json")));
    }

    #[test]
    fn json_errors_are_classified() {
        let path = Path::new("elm.json");

        let syntax = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        assert!(matches!(LoadError::json(path, syntax), LoadError::MalformedJson { .. }));

        let eof = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(LoadError::json(path, eof), LoadError::MalformedJson { .. }));

        let data = serde_json::from_str::<Vec<String>>("{}").unwrap_err();
        assert!(matches!(LoadError::json(path, data), LoadError::SchemaMismatch { .. }));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = LoadError::UnresolvedDependency {
            package: "elm/http".to_string(),
            requirement: "2.0.0 <= v < 3.0.0".to_string(),
            reason: "no versions available".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("elm/http"));
        assert!(message.contains("2.0.0 <= v < 3.0.0"));

        let err = LoadError::DependencyCycle {
            cycle: vec!["a/a@1.0.0".to_string(), "b/b@1.0.0".to_string(), "a/a@1.0.0".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected: a/a@1.0.0 -> b/b@1.0.0 -> a/a@1.0.0"
        );
    }
}
