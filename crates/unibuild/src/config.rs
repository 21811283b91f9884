//! Configuration file support for unibuild.
//!
//! A `build.yml` file supplies defaults for every build option except `--dry-run`.
//! CLI flags always win over file values, and file values win over built-in defaults.
//!
//! ## Configuration File Location
//!
//! Unless `--config` names a file explicitly, the first existing file of the
//! following is loaded:
//! 1. `./build.yml`
//! 2. `~/build.yml`
//! 3. `/etc/build.yml`
//! 4. `./config.yml`
//!
//! When none exists the built-in defaults are used. A file named with `--config`
//! must exist.
//!
//! ## Example Configuration
//!
//! ```yaml
//! workspace: MyLib.xcworkspace
//! scheme: MyLib
//! configurations: [Debug, Release]
//! sdks: [iphoneos, iphonesimulator]
//! xcodebuild: /usr/bin/xcodebuild
//! build_dir: build
//! archs:
//!   iphoneos: [arm64]
//! ```
//!
//! Files ending in `.toml` are read as TOML with the same keys. Unknown keys are
//! ignored.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use unibuild_sdk::DEFAULT_XCODEBUILD;

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "build.yml";

/// Last-resort configuration file name in the working directory.
pub const FALLBACK_CONFIG_FILE_NAME: &str = "config.yml";

/// Build configurations used when neither the CLI nor the file names any.
pub const DEFAULT_CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];

/// SDKs used when neither the CLI nor the file names any.
pub const DEFAULT_SDKS: [&str; 2] = ["iphoneos", "iphonesimulator"];

/// Root configuration structure for `build.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnibuildConfig {
    /// Workspace passed as `-workspace`; requires `scheme`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Scheme passed as `-scheme`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    /// Target passed as `-target` when no workspace is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Base name of the static library (`lib<product_name>.a`).
    ///
    /// Falls back to the target, then the scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    /// Build configurations, in build order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configurations: Option<Vec<String>>,

    /// SDKs to build each configuration against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdks: Option<Vec<String>>,

    /// Path to xcodebuild.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xcodebuild: Option<PathBuf>,

    /// Path to lipo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lipo: Option<PathBuf>,

    /// Output directory; relative paths are taken from the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Architecture overrides keyed by platform family (e.g. `iphoneos`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub archs: BTreeMap<String, Vec<String>>,
}

impl UnibuildConfig {
    /// Loads configuration from the specified file path.
    ///
    /// An empty file yields an empty configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        let config = if is_toml {
            toml::from_str(&contents)
                .with_context(|| format!("{:?} did not load properly", path))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("{:?} did not load properly", path))?
        };

        Ok(config)
    }

    /// Fills unset fields with the built-in defaults.
    pub fn apply_defaults(&mut self, cwd: &Path) {
        self.configurations
            .get_or_insert_with(|| DEFAULT_CONFIGURATIONS.map(String::from).to_vec());
        self.sdks
            .get_or_insert_with(|| DEFAULT_SDKS.map(String::from).to_vec());
        self.xcodebuild
            .get_or_insert_with(|| PathBuf::from(DEFAULT_XCODEBUILD));
        self.build_dir.get_or_insert_with(|| cwd.join("build"));
    }
}

/// Directories searched for a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigSearch {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub system: PathBuf,
}

impl ConfigSearch {
    /// The search locations of the running process.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir().context("Failed to get current directory")?,
            home: dirs::home_dir(),
            system: PathBuf::from("/etc"),
        })
    }

    /// Candidate paths for `config_file`, in the order they are tried.
    pub fn candidates(&self, config_file: &Path) -> Vec<PathBuf> {
        let mut paths = vec![self.cwd.join(config_file)];
        if let Some(name) = config_file.file_name() {
            paths.push(self.cwd.join(name));
            if let Some(home) = &self.home {
                paths.push(home.join(name));
            }
            paths.push(self.system.join(name));
        }
        paths.push(self.cwd.join(FALLBACK_CONFIG_FILE_NAME));
        paths.dedup();
        paths
    }

    /// Loads the first existing candidate for `config_file`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - A config file was found but couldn't be parsed
    pub fn discover(&self, config_file: &Path) -> Result<Option<(UnibuildConfig, PathBuf)>> {
        for candidate in self.candidates(config_file) {
            log::debug!("Looking for config at {}", candidate.display());
            if candidate.is_file() {
                let config = UnibuildConfig::load_from_file(&candidate)?;
                return Ok(Some((config, candidate)));
            }
        }
        Ok(None)
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration; empty when no file was found.
    pub config: UnibuildConfig,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads configuration.
    ///
    /// With `explicit` set, that file must exist. Otherwise `build.yml` is searched
    /// for and a missing file leaves only the built-in defaults.
    pub fn load(explicit: Option<&Path>, search: &ConfigSearch) -> Result<Self> {
        let (name, required) = match explicit {
            Some(path) => (path, true),
            None => (Path::new(CONFIG_FILE_NAME), false),
        };

        if required {
            let path = search.cwd.join(name);
            if !path.is_file() {
                bail!("Could not locate config file {}", name.display());
            }
            let config = UnibuildConfig::load_from_file(&path)?;
            return Ok(Self {
                config,
                config_path: Some(path),
            });
        }

        match search.discover(name)? {
            Some((config, path)) => {
                log::debug!("Loaded config from {}", path.display());
                Ok(Self {
                    config,
                    config_path: Some(path),
                })
            }
            None => {
                log::info!("Not loading {}", name.display());
                Ok(Self::default())
            }
        }
    }

    /// Resolves a CLI value, using config as fallback.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F) -> Option<T>
    where
        F: FnOnce(&UnibuildConfig) -> Option<T>,
    {
        cli_value.or_else(|| config_getter(&self.config))
    }
}
