//! Implementation of the `elm-project show` command.

use elm_project::{Manifest, ManifestKind};
use std::collections::HashSet;
use std::fmt::{self, Write};
use std::path::Path;

/// Render a project summary followed by its dependency tree.
///
/// A package whose dependencies were already listed is marked with `(*)`
/// and not expanded again.
pub fn render(manifest: &Manifest) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let kind = match manifest.kind() {
        ManifestKind::Application(_) => "application",
        ManifestKind::Package(_) => "package",
    };

    match (manifest.package_name(), manifest.package_version()) {
        (Some(name), Some(version)) => {
            writeln!(out, "{name} {version} ({kind})")?;
        }
        _ => {
            writeln!(out, "{} ({kind})", manifest.presentable_name())?;
        }
    }
    writeln!(out, "  manifest: {}", manifest.manifest_path().display())?;
    writeln!(out, "  elm version: {}", manifest.elm_version())?;

    writeln!(out, "  source directories:")?;
    for dir in manifest.source_directories() {
        writeln!(out, "    {}", dir.display())?;
    }
    writeln!(out, "  test directory: {}", manifest.test_directory().display())?;

    if !manifest.exposed_modules().is_empty() {
        writeln!(out, "  exposed modules: {}", manifest.exposed_modules().join(", "))?;
    }

    let mut expanded = HashSet::new();
    render_section(&mut out, "dependencies", manifest.dependencies(), &mut expanded)?;
    render_section(
        &mut out,
        "test dependencies",
        manifest.test_dependencies(),
        &mut expanded,
    )?;
    Ok(out)
}

fn render_section<'a>(
    out: &mut String,
    title: &str,
    deps: &'a [Manifest],
    expanded: &mut HashSet<&'a Path>,
) -> fmt::Result {
    if deps.is_empty() {
        return writeln!(out, "  {title}: none");
    }
    writeln!(out, "  {title}:")?;
    for dep in deps {
        render_dependency(out, dep, 2, expanded)?;
    }
    Ok(())
}

fn render_dependency<'a>(
    out: &mut String,
    dep: &'a Manifest,
    depth: usize,
    expanded: &mut HashSet<&'a Path>,
) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let name = dep.package_name().unwrap_or("?");
    let version = dep
        .package_version()
        .map_or_else(String::new, |v| v.to_string());

    let first_visit = expanded.insert(dep.manifest_path());
    let marker = if !first_visit && !dep.dependencies().is_empty() {
        " (*)"
    } else {
        ""
    };
    writeln!(out, "{indent}{name} {version}{marker}")?;

    if first_visit {
        for child in dep.dependencies() {
            render_dependency(out, child, depth + 1, expanded)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_project::{load_manifest, ElmHome, RepositoryConfig, DEFAULT_COMPILER_VERSION};
    use std::fs;
    use tempfile::TempDir;

    fn publish(home: &Path, name: &str, version: &str, deps: &str) {
        let dir = home
            .join("0.19.1")
            .join("packages")
            .join(name)
            .join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("elm.json"),
            format!(
                r#"{{
                    "type": "package",
                    "name": "{name}",
                    "version": "{version}",
                    "exposed-modules": [],
                    "elm-version": "0.19.0 <= v < 0.20.0",
                    "dependencies": {{ {deps} }}
                }}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn render_application_tree() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("elm-home");
        publish(&home, "elm/core", "1.0.5", "");
        publish(&home, "elm/json", "1.1.3", r#""elm/core": "1.0.0 <= v < 2.0.0""#);

        let project = tmp.path().join("my-app");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("elm.json"),
            r#"{
                "type": "application",
                "source-directories": ["src"],
                "elm-version": "0.19.1",
                "dependencies": {
                    "direct": { "elm/json": "1.1.3" },
                    "indirect": { "elm/core": "1.0.5" }
                },
                "test-dependencies": { "direct": {}, "indirect": {} }
            }"#,
        )
        .unwrap();

        let repository = ElmHome::new(RepositoryConfig {
            elm_home: home,
            compiler_version: DEFAULT_COMPILER_VERSION,
        });
        let manifest = load_manifest(project.join("elm.json"), &repository).unwrap();
        let output = render(&manifest).unwrap();

        assert!(output.starts_with("my-app (application)\n"));
        assert!(output.contains("  elm version: 0.19.1\n"));
        assert!(output.contains("  dependencies:\n    elm/json 1.1.3\n      elm/core 1.0.5\n    elm/core 1.0.5\n"));
        assert!(output.contains("  test dependencies: none\n"));
    }

    #[test]
    fn render_marks_repeated_subtrees() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("elm-home");
        publish(&home, "elm/core", "1.0.5", "");
        publish(&home, "elm/json", "1.1.3", r#""elm/core": "1.0.0 <= v < 2.0.0""#);

        let project = tmp.path().join("lib");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("elm.json"),
            r#"{
                "type": "package",
                "name": "me/lib",
                "version": "1.0.0",
                "exposed-modules": { "Main": ["Lib"] },
                "elm-version": "0.19.0 <= v < 0.20.0",
                "dependencies": { "elm/json": "1.0.0 <= v < 2.0.0" },
                "test-dependencies": { "elm/json": "1.0.0 <= v < 2.0.0" }
            }"#,
        )
        .unwrap();

        let repository = ElmHome::new(RepositoryConfig {
            elm_home: home,
            compiler_version: DEFAULT_COMPILER_VERSION,
        });
        let manifest = load_manifest(project.join("elm.json"), &repository).unwrap();
        let output = render(&manifest).unwrap();

        assert!(output.starts_with("me/lib 1.0.0 (package)\n"));
        assert!(output.contains("  exposed modules: Lib\n"));
        assert!(output.contains("  test dependencies:\n    elm/json 1.1.3 (*)\n"));
    }
}
