//! sdkpin CLI
//!
//! Entry point for the `sdkpin` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use sdkpin::config::{default_host_config_path, REPO_CONFIG_PATH};
use sdkpin::{BuildLayout, BuildSession, EffectiveConfig, GraphManifest, SessionError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdkpin")]
#[command(about = "Enforce one platform SDK version and lint policy across a module graph", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command that reads configuration
#[derive(clap::Args)]
struct ConfigArgs {
    /// Path to repo config file (default: .sdkpin/config.toml next to the manifest)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enforced compile SDK version
    #[arg(long)]
    target_version: Option<u32>,

    /// Make lint errors fail the build
    #[arg(long)]
    lint_fatal: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enforce the policy on every module of a graph manifest
    Apply {
        /// Path to the graph manifest
        #[arg(long, short = 'm', default_value = "sdkpin.toml")]
        manifest: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration with provenance
    Config {
        #[command(flatten)]
        config: ConfigArgs,

        /// Write the effective config artifact to this file instead
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the relocated build directory of every module
    Layout {
        #[arg(long, short = 'm', default_value = "sdkpin.toml")]
        manifest: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Delete the relocated root build directory
    Clean {
        #[arg(long, short = 'm', default_value = "sdkpin.toml")]
        manifest: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            manifest,
            config,
            report,
            json,
        } => run_apply(&manifest, &config, report.as_deref(), json),
        Commands::Config { config, output } => run_config(&config, output.as_deref()),
        Commands::Layout { manifest, config } => run_layout(&manifest, &config),
        Commands::Clean { manifest, config } => run_clean(&manifest, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Log to stderr, filtered by SDKPIN_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SDKPIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ConfigArgs, project_dir: &Path) -> Result<EffectiveConfig, SessionError> {
    let repo_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join(REPO_CONFIG_PATH));
    let host_path = default_host_config_path();
    let cli = EffectiveConfig::cli_layer(args.target_version, args.lint_fatal.then_some(true));

    Ok(EffectiveConfig::build(
        host_path.as_deref(),
        Some(&repo_path),
        cli,
    )?)
}

fn manifest_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_session(
    manifest_path: &Path,
    args: &ConfigArgs,
) -> Result<(GraphManifest, EffectiveConfig, PathBuf), SessionError> {
    let dir = manifest_dir(manifest_path);
    let manifest = GraphManifest::load(manifest_path)?;
    let config = load_config(args, &dir)?;
    Ok((manifest, config, dir))
}

fn run_apply(
    manifest_path: &Path,
    args: &ConfigArgs,
    report_path: Option<&Path>,
    json: bool,
) -> Result<(), SessionError> {
    let (manifest, config, dir) = load_session(manifest_path, args)?;
    let mut session = BuildSession::from_manifest(&manifest, &dir, &config)?;
    let report = session.run()?;

    if let Some(path) = report_path {
        if let Err(e) = report.write_to_file(path) {
            eprintln!("Failed to write report to {}: {}", path.display(), e);
            process::exit(1);
        }
    }

    if json {
        match report.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", report.to_human());
    }
    Ok(())
}

fn run_config(args: &ConfigArgs, output: Option<&Path>) -> Result<(), SessionError> {
    let config = load_config(args, Path::new("."))?;

    if let Some(path) = output {
        if let Err(e) = config.write_to_file(path) {
            eprintln!("Failed to write config to {}: {}", path.display(), e);
            process::exit(1);
        }
        println!("Wrote effective config to {}", path.display());
        return Ok(());
    }

    match config.to_json() {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            process::exit(1);
        }
    }
    Ok(())
}

fn manifest_layout(manifest: &GraphManifest, config: &EffectiveConfig, dir: &Path) -> BuildLayout {
    BuildLayout::new(&manifest.project_root(dir), config.build_dir())
}

fn run_layout(manifest_path: &Path, args: &ConfigArgs) -> Result<(), SessionError> {
    let (manifest, config, dir) = load_session(manifest_path, args)?;
    let layout = manifest_layout(&manifest, &config, &dir);

    println!("root  {}", layout.root_build_dir().display());
    for module in &manifest.modules {
        println!("{:<24} {}", module.name, layout.module_dir(&module.name).display());
    }
    Ok(())
}

fn run_clean(manifest_path: &Path, args: &ConfigArgs) -> Result<(), SessionError> {
    let (manifest, config, dir) = load_session(manifest_path, args)?;
    let layout = manifest_layout(&manifest, &config, &dir);

    if layout.clean()? {
        println!("Removed {}", layout.root_build_dir().display());
    } else {
        println!("Nothing to clean at {}", layout.root_build_dir().display());
    }
    Ok(())
}
