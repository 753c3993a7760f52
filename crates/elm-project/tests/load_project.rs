//! End-to-end loading of projects against an on-disk Elm home.

use elm_project::{
    find_manifest, load_manifest, ElmHome, LoadError, PackageRepository, RepositoryConfig,
    Version, DEFAULT_COMPILER_VERSION, LEGACY_EXACT_DEPENDENCIES, LEGACY_MANIFEST_FILE,
    MANIFEST_FILE, SIDECAR_FILE,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    home: ElmHome,
    project: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let home = ElmHome::new(RepositoryConfig {
            elm_home: tmp.path().join("elm-home"),
            compiler_version: DEFAULT_COMPILER_VERSION,
        });
        let project = tmp.path().join("my-app");
        fs::create_dir_all(&project).unwrap();
        Self {
            _tmp: tmp,
            home,
            project,
        }
    }

    fn publish(&self, name: &str, version: &str, deps: &[(&str, &str)], test_deps: &[(&str, &str)]) {
        let map = |deps: &[(&str, &str)]| {
            let entries: serde_json::Map<_, _> = deps
                .iter()
                .map(|(n, c)| ((*n).to_string(), serde_json::Value::from(*c)))
                .collect();
            serde_json::Value::Object(entries)
        };
        let manifest = serde_json::json!({
            "type": "package",
            "name": name,
            "summary": "fixture",
            "license": "BSD-3-Clause",
            "version": version,
            "exposed-modules": { "Primitives": [format!("{}.Basics", name.replace('/', "."))] },
            "elm-version": "0.19.0 <= v < 0.20.0",
            "dependencies": map(deps),
            "test-dependencies": map(test_deps),
        });
        let dir = self.home.package_dir(name).unwrap().join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
    }

    fn write_project_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.project.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn manifest(&self) -> PathBuf {
        self.project.join(MANIFEST_FILE)
    }
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

const APPLICATION: &str = r#"{
    "type": "application",
    "source-directories": ["src", "../shared"],
    "elm-version": "0.19.1",
    "dependencies": {
        "direct": { "elm/browser": "1.0.2", "elm/core": "1.0.5" },
        "indirect": { "elm/json": "1.1.3" }
    },
    "test-dependencies": {
        "direct": { "elm-explorations/test": "2.1.1" },
        "indirect": {}
    }
}"#;

fn publish_application_deps(fixture: &Fixture) {
    let core = ("elm/core", "1.0.0 <= v < 2.0.0");
    fixture.publish("elm/core", "1.0.5", &[], &[]);
    fixture.publish("elm/json", "1.1.3", &[core], &[]);
    fixture.publish("elm/browser", "1.0.2", &[core, ("elm/json", "1.1.0 <= v < 2.0.0")], &[]);
    fixture.publish(
        "elm-explorations/test",
        "2.1.1",
        &[core],
        &[("elm-explorations/fixtures", "1.0.0 <= v < 2.0.0")],
    );
}

#[test]
fn load_application() {
    let fixture = Fixture::new();
    publish_application_deps(&fixture);
    let path = fixture.write_project_file(MANIFEST_FILE, APPLICATION);

    let manifest = load_manifest(&path, &fixture.home).unwrap();

    assert!(manifest.is_application());
    assert_eq!(manifest.presentable_name(), "my-app");
    assert_eq!(manifest.manifest_path(), path);
    assert_eq!(
        manifest.source_directories(),
        vec![
            fixture.project.join("src"),
            fixture.project.parent().unwrap().join("shared"),
        ]
    );
    assert_eq!(manifest.test_directory(), fixture.project.join("tests"));

    let deps: Vec<_> = manifest
        .dependencies()
        .iter()
        .map(|d| format!("{}@{}", d.package_name().unwrap(), d.package_version().unwrap()))
        .collect();
    assert_eq!(deps, vec!["elm/browser@1.0.2", "elm/core@1.0.5", "elm/json@1.1.3"]);

    let test = &manifest.test_dependencies()[0];
    assert_eq!(test.package_name(), Some("elm-explorations/test"));
    // Fixtures of a dependency are never needed.
    assert!(test.test_dependencies().is_empty());
    assert_eq!(manifest.all_resolved_dependencies().len(), 4);

    let browser = &manifest.dependencies()[0];
    assert_eq!(browser.exposed_modules(), ["elm.browser.Basics".to_string()]);
    assert_eq!(browser.dependencies().len(), 2);

    assert!(manifest.is_compatible_with(&v("0.19.1")));
    assert!(!manifest.is_compatible_with(&v("0.19.0")));
}

#[test]
fn sidecar_overrides_application_test_directory() {
    let fixture = Fixture::new();
    publish_application_deps(&fixture);
    let path = fixture.write_project_file(MANIFEST_FILE, APPLICATION);
    fixture.write_project_file(SIDECAR_FILE, r#"{"test-directory": "spec/elm"}"#);

    let manifest = load_manifest(&path, &fixture.home).unwrap();

    assert!(manifest.has_custom_test_directory());
    assert_eq!(manifest.test_directory(), fixture.project.join("spec").join("elm"));
    assert_eq!(manifest.all_source_directories().len(), 3);
}

#[test]
fn malformed_sidecar_is_ignored() {
    let fixture = Fixture::new();
    publish_application_deps(&fixture);
    let path = fixture.write_project_file(MANIFEST_FILE, APPLICATION);
    fixture.write_project_file(SIDECAR_FILE, "{ not json");

    let manifest = load_manifest(&path, &fixture.home).unwrap();
    assert!(!manifest.has_custom_test_directory());
}

#[test]
fn load_package_picks_minimum_versions() {
    let fixture = Fixture::new();
    fixture.publish("elm/core", "1.0.2", &[], &[]);
    fixture.publish("elm/core", "1.0.5", &[], &[]);
    fixture.publish("elm-explorations/test", "2.0.0", &[("elm/core", "1.0.0 <= v < 2.0.0")], &[]);
    fixture.publish("elm-explorations/test", "2.1.1", &[("elm/core", "1.0.0 <= v < 2.0.0")], &[]);

    let path = fixture.write_project_file(
        MANIFEST_FILE,
        r#"{
            "type": "package",
            "name": "me/my-lib",
            "summary": "A library",
            "license": "MIT",
            "version": "1.0.0",
            "exposed-modules": { "Core": ["MyLib"], "Helpers": ["MyLib.Extra"] },
            "elm-version": "0.19.0 <= v < 0.20.0",
            "dependencies": { "elm/core": "1.0.0 <= v < 2.0.0" },
            "test-dependencies": { "elm-explorations/test": "2.0.0 <= v < 3.0.0" }
        }"#,
    );

    let manifest = load_manifest(&path, &fixture.home).unwrap();

    assert!(manifest.is_package());
    assert_eq!(manifest.package_name(), Some("me/my-lib"));
    assert_eq!(manifest.exposed_modules(), ["MyLib".to_string(), "MyLib.Extra".to_string()]);
    assert_eq!(manifest.source_directories(), vec![fixture.project.join("src")]);
    assert_eq!(manifest.dependencies()[0].package_version(), Some(&v("1.0.2")));
    assert_eq!(manifest.test_dependencies()[0].package_version(), Some(&v("2.0.0")));
    assert!(manifest.is_compatible_with(&v("0.19.1")));
}

#[test]
fn load_package_with_missing_dependency_fails() {
    let fixture = Fixture::new();
    let path = fixture.write_project_file(
        MANIFEST_FILE,
        r#"{
            "type": "package",
            "name": "me/my-lib",
            "version": "1.0.0",
            "exposed-modules": [],
            "elm-version": "0.19.0 <= v < 0.20.0",
            "dependencies": { "elm/http": "2.0.0 <= v < 3.0.0" }
        }"#,
    );

    let err = load_manifest(&path, &fixture.home).unwrap_err();
    assert!(matches!(err, LoadError::UnresolvedDependency { ref package, .. } if package == "elm/http"));
    assert!(err.to_string().contains("2.0.0 <= v < 3.0.0"));
}

#[test]
fn load_legacy_project() {
    let fixture = Fixture::new();
    let path = fixture.write_project_file(
        LEGACY_MANIFEST_FILE,
        r#"{
            "version": "1.0.0",
            "summary": "legacy",
            "repository": "https://github.com/user/project.git",
            "license": "BSD3",
            "source-directories": ["src"],
            "exposed-modules": [],
            "dependencies": { "elm-lang/core": "5.1.1 <= v < 6.0.0" },
            "elm-version": "0.18.0 <= v < 0.19.0"
        }"#,
    );
    fixture.write_project_file(
        LEGACY_EXACT_DEPENDENCIES,
        r#"{ "elm-lang/core": "5.1.1", "elm-lang/virtual-dom": "2.0.4" }"#,
    );

    assert_eq!(find_manifest(&fixture.project), Some(path.clone()));

    let manifest = load_manifest(&path, &fixture.home).unwrap();
    let app = manifest.as_application().unwrap();
    assert_eq!(app.dependencies.direct.len(), 1);
    assert_eq!(app.dependencies.indirect.len(), 1);
    assert!(manifest.dependencies().is_empty());
    assert!(manifest.is_compatible_with(&v("0.18.0")));
}

#[test]
fn missing_manifest_is_file_not_found() {
    let fixture = Fixture::new();
    let err = load_manifest(fixture.manifest(), &fixture.home).unwrap_err();
    assert!(matches!(err, LoadError::FileNotFound(ref p) if p == &fixture.manifest()));
}

#[test]
fn unknown_manifest_type_fails_cleanly() {
    let fixture = Fixture::new();
    let path = fixture.write_project_file(MANIFEST_FILE, r#"{"type": "library"}"#);
    let err = load_manifest(&path, &fixture.home).unwrap_err();
    assert!(matches!(err, LoadError::UnknownType { .. }));
}

#[test]
fn elm_home_lists_published_versions() {
    let fixture = Fixture::new();
    fixture.publish("elm/core", "1.0.5", &[], &[]);
    fixture.publish("elm/core", "1.0.2", &[], &[]);

    let versions: Vec<_> = fixture.home.available_versions("elm/core").into_iter().collect();
    assert_eq!(versions, vec![v("1.0.2"), v("1.0.5")]);
    assert!(fixture
        .home
        .find_package_manifest("elm/core", &v("1.0.5"))
        .is_some_and(|p| p.ends_with(Path::new("elm/core/1.0.5/elm.json"))));
}
