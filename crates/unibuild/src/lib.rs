//! # unibuild
//!
//! Command-line tool that builds universal (multi-architecture) static libraries.
//!
//! ## Overview
//!
//! For every build configuration and every SDK, `unibuild` runs
//! `xcodebuild ... clean build`, then merges each configuration's per-SDK libraries
//! into one fat archive with `lipo -create`.
//!
//! ## Quick Start
//!
//! ```bash
//! # Workspace build
//! unibuild -w MyLib.xcworkspace --scheme MyLib
//!
//! # Target build, release only, device + simulator
//! unibuild -t MyLib -c Release -s iphoneos,iphonesimulator
//!
//! # Preview the commands without running anything
//! unibuild -t MyLib --dry-run
//! ```
//!
//! ## Output Directory
//!
//! ```text
//! build/
//! ├── Release-iphoneos/libMyLib.a
//! ├── Release-iphonesimulator/libMyLib.a
//! └── Release-universal/libMyLib.a
//! ```
//!
//! The output directory is wiped at the start of every run.
//!
//! ## Exit Codes
//!
//! - `0` - Success
//! - `1` - Configuration error or a failed xcodebuild/lipo invocation
//! - `2` - Malformed command line (reported by the argument parser)
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `build.yml`
//! - [`logging`] - Prefixed console output

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use unibuild_sdk::builders::UniversalBuilder;
use unibuild_sdk::{BuildError, BuildOptions};

pub mod config;
pub mod logging;

use config::{ConfigResolver, ConfigSearch};

/// Builds universal static libraries with xcodebuild and lipo.
#[derive(Parser, Debug)]
#[command(
    name = "unibuild",
    author,
    version,
    about = "Build universal static libraries with xcodebuild and lipo",
    long_about = None,
    disable_help_flag = true
)]
struct Cli {
    /// The workspace name to pass to xcodebuild
    #[arg(short = 'w', long)]
    workspace: Option<String>,

    /// The scheme to pass to xcodebuild
    #[arg(short = 'h', long)]
    scheme: Option<String>,

    /// The target to pass to xcodebuild
    #[arg(short = 't', long)]
    target: Option<String>,

    /// The build configurations to pass to xcodebuild [default: Debug,Release]
    #[arg(short = 'c', long, value_delimiter = ',', value_name = "A,B,C")]
    configurations: Option<Vec<String>>,

    /// The SDKs to pass to xcodebuild [default: iphoneos,iphonesimulator]
    #[arg(short = 's', long, value_delimiter = ',', value_name = "A,B,C")]
    sdks: Option<Vec<String>>,

    /// The location of the xcodebuild command to invoke [default: /usr/bin/xcodebuild]
    #[arg(short = 'x', long, value_name = "XCODEBUILD")]
    xcodebuild: Option<PathBuf>,

    /// The location of the lipo command to invoke [default: lipo]
    #[arg(long, value_name = "LIPO")]
    lipo: Option<PathBuf>,

    /// The directory to place build products [default: ./build]
    #[arg(short = 'b', long, value_name = "BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Base name of the library (lib<NAME>.a) [default: target, then scheme]
    #[arg(short = 'p', long, value_name = "NAME")]
    product_name: Option<String>,

    /// Configuration file to load instead of searching for build.yml
    #[arg(short = 'f', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Runs through the entire build process but does not actually build any products
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Print debug diagnostics
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

/// Entry point shared by the binary. Returns the process exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(1)
        }
    }
}

fn report(err: &anyhow::Error) {
    log::error!("{:#}", err);
    let usage = err
        .downcast_ref::<BuildError>()
        .is_some_and(BuildError::is_usage_error);
    if usage {
        println!("{}", Cli::command().render_help());
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let search = ConfigSearch::from_env()?;
    let mut resolver = ConfigResolver::load(cli.config.as_deref(), &search)
        .map_err(|e| BuildError::Config(format!("{:#}", e)))?;
    resolver.config.apply_defaults(&search.cwd);

    let request = resolve_options(cli, &resolver).into_request()?;

    if request.dry_run() {
        log::info!("* DRY RUN * Not building anything");
    }
    log::info!("Build configuration:");
    log_fields(&resolver.config)?;
    log::info!("Building with options:");
    log_fields(&request)?;

    let products = UniversalBuilder::new(&request).execute()?;

    if !request.dry_run() {
        for product in &products {
            log::info!(
                "Created {} from {} SDK builds",
                product.path.display(),
                product.inputs.len()
            );
        }
    }
    Ok(())
}

/// Merges CLI flags over the (defaulted) configuration file values.
fn resolve_options(cli: &Cli, resolver: &ConfigResolver) -> BuildOptions {
    BuildOptions {
        workspace: resolver.resolve(cli.workspace.clone(), |c| c.workspace.clone()),
        scheme: resolver.resolve(cli.scheme.clone(), |c| c.scheme.clone()),
        target: resolver.resolve(cli.target.clone(), |c| c.target.clone()),
        product_name: resolver.resolve(cli.product_name.clone(), |c| c.product_name.clone()),
        configurations: resolver
            .resolve(cli.configurations.clone(), |c| c.configurations.clone())
            .unwrap_or_default(),
        sdks: resolver
            .resolve(cli.sdks.clone(), |c| c.sdks.clone())
            .unwrap_or_default(),
        // Architecture overrides have no CLI flag.
        arch_overrides: resolver.config.archs.clone(),
        build_tool: resolver.resolve(cli.xcodebuild.clone(), |c| c.xcodebuild.clone()),
        merge_tool: resolver.resolve(cli.lipo.clone(), |c| c.lipo.clone()),
        output_dir: resolver.resolve(cli.build_dir.clone(), |c| c.build_dir.clone()),
        dry_run: cli.dry_run,
    }
}

/// Logs a value as indented `key: value` lines.
fn log_fields<T: Serialize>(value: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(value).context("Failed to format build settings")?;
    for line in yaml.lines().filter(|l| !l.trim().is_empty()) {
        log::info!("\t{}", line);
    }
    Ok(())
}
