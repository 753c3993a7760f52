//! elm-project - inspect Elm projects and their resolved dependencies

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use elm_project::{
    find_manifest, load_manifest, ElmHome, PackageRepository, RepositoryConfig, Version,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod show;

#[derive(Parser)]
#[command(name = "elm-project")]
#[command(version)]
#[command(about = "Inspect Elm projects and their dependencies", long_about = None)]
struct Cli {
    /// Elm home directory holding the package cache (defaults to $ELM_HOME or ~/.elm)
    #[arg(long, global = true)]
    elm_home: Option<PathBuf>,

    /// Compiler version whose package cache is read
    #[arg(long, global = true)]
    compiler: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log resolution steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a project's layout and dependency tree
    Show {
        /// Project directory or manifest file
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Check whether a project accepts a compiler version
    Check {
        /// Compiler version, e.g. "0.19.1"
        version: String,

        /// Project directory or manifest file
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List the cached versions of a package
    Versions {
        /// Package name in author/project form
        package: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let repository = ElmHome::new(repository_config(&cli)?);
    debug!(
        packages = %repository.config().packages_dir().display(),
        "using package cache"
    );

    match cli.command {
        Commands::Show { path } => {
            let manifest = load_manifest(locate_manifest(&path)?, &repository)
                .context("Failed to load project")?;
            print!("{}", show::render(&manifest)?);
        }

        Commands::Check { version, path } => {
            let candidate = Version::parse(&version)
                .with_context(|| format!("Invalid compiler version '{version}'"))?;
            let manifest = load_manifest(locate_manifest(&path)?, &repository)
                .context("Failed to load project")?;

            if manifest.is_compatible_with(&candidate) {
                println!(
                    "{} accepts Elm {} (requires {})",
                    manifest.presentable_name(),
                    candidate,
                    manifest.elm_version()
                );
            } else {
                println!(
                    "{} does not accept Elm {} (requires {})",
                    manifest.presentable_name(),
                    candidate,
                    manifest.elm_version()
                );
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Versions { package } => {
            if repository.package_dir(&package).is_none() {
                bail!("Invalid package name '{package}': expected author/project");
            }
            let versions = repository.available_versions(&package);
            if versions.is_empty() {
                println!("No cached versions of {package}.");
            }
            for version in versions {
                println!("{version}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Install the stderr subscriber; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the repository configuration.
///
/// Flags override the config file, which overrides `$ELM_HOME` and the
/// built-in defaults.
fn repository_config(cli: &Cli) -> Result<RepositoryConfig> {
    let mut config = match &cli.config {
        Some(path) => RepositoryConfig::from_path(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => RepositoryConfig::default(),
    };

    if let Some(elm_home) = &cli.elm_home {
        config.elm_home.clone_from(elm_home);
    }
    if let Some(compiler) = &cli.compiler {
        config.compiler_version = Version::parse(compiler)
            .with_context(|| format!("Invalid compiler version '{compiler}'"))?;
    }

    Ok(config)
}

fn locate_manifest(path: &Path) -> Result<PathBuf> {
    match find_manifest(path) {
        Some(manifest) => Ok(manifest),
        None => bail!(
            "Could not find elm.json or elm-package.json in '{}' or any parent directory",
            path.display()
        ),
    }
}
