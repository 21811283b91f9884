//! Core types for unibuild-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuildError`] - Error types for request validation and build operations
//! - [`PlatformFamily`] - Coarse platform category derived from an SDK name
//! - [`TargetSelector`] - What xcodebuild is asked to build (workspace+scheme or target)
//! - [`BuildOptions`] / [`BuildRequest`] - Unvalidated options and the immutable,
//!   validated request the builders consume

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error types for unibuild-sdk operations.
///
/// Every variant is fatal to a run: the builders never retry and never continue
/// past a failure.
///
/// # Example
///
/// ```
/// use unibuild_sdk::{BuildError, BuildOptions};
///
/// let options = BuildOptions {
///     workspace: Some("App.xcworkspace".into()),
///     ..BuildOptions::default()
/// };
///
/// match options.into_request() {
///     Err(err) if err.is_usage_error() => eprintln!("{err}"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A workspace was selected without a scheme.
    #[error("For workspace builds, scheme cannot be nil")]
    MissingScheme,

    /// Neither a workspace+scheme pair nor a target was selected.
    #[error("Either workspace+scheme or target must be set")]
    MissingSelector,

    /// A required list (configurations or SDKs) resolved to nothing.
    #[error("At least one {0} must be given. Pass it on the command line or set it in build.yml")]
    EmptyList(&'static str),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}. Check build.yml or CLI flags")]
    Config(String),

    /// An I/O error occurred while preparing the output directory.
    #[error("I/O error at {path}: {source}. Check file paths and permissions")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool could not be started at all.
    #[error("Failed to start {program}: {source}\n\nEnsure the tool is installed and the path is correct.")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran and exited unsuccessfully.
    #[error("Build failed\n\nCommand: {command}\nExit status: {status}")]
    CommandFailed { command: String, status: String },
}

impl BuildError {
    /// Returns `true` for target-selector errors, which are reported together with
    /// the command-line usage help.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, BuildError::MissingScheme | BuildError::MissingSelector)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Platform family of an SDK.
///
/// SDK names passed to xcodebuild may carry a version (`iphoneos17.0`); the family is
/// the versionless prefix (`iphoneos`). It keys architecture overrides and names the
/// per-cell output directory (`<configuration>-<family>`).
///
/// # Example
///
/// ```
/// use unibuild_sdk::PlatformFamily;
///
/// let family = PlatformFamily::from_sdk("iphonesimulator17.0");
/// assert_eq!(family, Some(PlatformFamily::IphoneSimulator));
/// assert_eq!(family.unwrap().as_str(), "iphonesimulator");
///
/// assert_eq!(PlatformFamily::from_sdk("android34"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformFamily {
    IphoneOs,
    IphoneSimulator,
    AppleTvOs,
    AppleTvSimulator,
    WatchOs,
    WatchSimulator,
    XrOs,
    XrSimulator,
    MacOsx,
}

impl PlatformFamily {
    /// All recognized families.
    pub const ALL: [PlatformFamily; 9] = [
        PlatformFamily::IphoneOs,
        PlatformFamily::IphoneSimulator,
        PlatformFamily::AppleTvOs,
        PlatformFamily::AppleTvSimulator,
        PlatformFamily::WatchOs,
        PlatformFamily::WatchSimulator,
        PlatformFamily::XrOs,
        PlatformFamily::XrSimulator,
        PlatformFamily::MacOsx,
    ];

    /// Returns the name xcodebuild uses for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::IphoneOs => "iphoneos",
            PlatformFamily::IphoneSimulator => "iphonesimulator",
            PlatformFamily::AppleTvOs => "appletvos",
            PlatformFamily::AppleTvSimulator => "appletvsimulator",
            PlatformFamily::WatchOs => "watchos",
            PlatformFamily::WatchSimulator => "watchsimulator",
            PlatformFamily::XrOs => "xros",
            PlatformFamily::XrSimulator => "xrsimulator",
            PlatformFamily::MacOsx => "macosx",
        }
    }

    /// Derives the family from an SDK name.
    ///
    /// The SDK's leading non-digit run must equal a known family name exactly, so
    /// `iphoneos` and `iphoneos17.0` match while `iphoneosx` does not. Unknown SDKs
    /// yield `None`, which is not an error: they simply get no architecture override.
    pub fn from_sdk(sdk: &str) -> Option<Self> {
        let stem = sdk_stem(sdk);
        Self::ALL.into_iter().find(|family| family.as_str() == stem)
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of an SDK name before its version digits.
pub(crate) fn sdk_stem(sdk: &str) -> &str {
    let end = sdk
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(sdk.len());
    &sdk[..end]
}

/// What xcodebuild is asked to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetSelector {
    /// `-workspace <workspace> -scheme <scheme>`
    Workspace { workspace: String, scheme: String },
    /// `-target <target>`
    Target { target: String },
}

impl TargetSelector {
    /// Returns the selector as xcodebuild argument tokens.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TargetSelector::Workspace { workspace, scheme } => vec![
                "-workspace".to_string(),
                workspace.clone(),
                "-scheme".to_string(),
                scheme.clone(),
            ],
            TargetSelector::Target { target } => vec!["-target".to_string(), target.clone()],
        }
    }
}

/// Default build tool location.
pub const DEFAULT_XCODEBUILD: &str = "/usr/bin/xcodebuild";

/// Default merge tool, resolved through `PATH`.
pub const DEFAULT_LIPO: &str = "lipo";

/// Unvalidated build options, typically produced by merging CLI flags over a
/// configuration file.
///
/// Every field is optional except `dry_run`; [`BuildOptions::into_request`] applies
/// validation and produces the immutable [`BuildRequest`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub workspace: Option<String>,
    pub scheme: Option<String>,
    pub target: Option<String>,
    /// Overrides the artifact base name (otherwise target, then scheme).
    pub product_name: Option<String>,
    pub configurations: Vec<String>,
    pub sdks: Vec<String>,
    /// Architecture overrides keyed by platform family name.
    pub arch_overrides: BTreeMap<String, Vec<String>>,
    pub build_tool: Option<PathBuf>,
    pub merge_tool: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl BuildOptions {
    /// Validates the options and freezes them into a [`BuildRequest`].
    ///
    /// Selector rules: a workspace requires a scheme; without a workspace a target is
    /// required. When both a workspace+scheme and a target are present, the workspace
    /// wins. A relative `output_dir` is made absolute against the current directory;
    /// a missing one defaults to `./build`.
    pub fn into_request(self) -> Result<BuildRequest, BuildError> {
        let selector = match (self.workspace.clone(), self.scheme.clone()) {
            (Some(workspace), Some(scheme)) => TargetSelector::Workspace { workspace, scheme },
            (Some(_), None) => return Err(BuildError::MissingScheme),
            (None, _) => match self.target.clone() {
                Some(target) => TargetSelector::Target { target },
                None => return Err(BuildError::MissingSelector),
            },
        };

        let configurations = non_empty(self.configurations, "configuration")?;
        let sdks = non_empty(self.sdks, "SDK")?;

        let product_name = self
            .product_name
            .or(self.target)
            .or(self.scheme)
            .ok_or(BuildError::MissingSelector)?;

        let output_dir = self.output_dir.unwrap_or_else(|| PathBuf::from("build"));
        let output_dir = std::path::absolute(&output_dir)
            .map_err(|e| BuildError::io(&output_dir, e))?;

        let arch_overrides = self
            .arch_overrides
            .into_iter()
            .filter(|(_, archs)| !archs.is_empty())
            .collect();

        Ok(BuildRequest {
            selector,
            product_name,
            configurations,
            sdks,
            arch_overrides,
            build_tool: self
                .build_tool
                .unwrap_or_else(|| PathBuf::from(DEFAULT_XCODEBUILD)),
            merge_tool: self
                .merge_tool
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LIPO)),
            output_dir,
            dry_run: self.dry_run,
        })
    }
}

fn non_empty(values: Vec<String>, what: &'static str) -> Result<Vec<String>, BuildError> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(BuildError::EmptyList(what));
    }
    Ok(values)
}

/// A resolved, immutable description of one run.
///
/// Constructed once via [`BuildOptions::into_request`] and passed by reference to the
/// builders; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest {
    #[serde(flatten)]
    selector: TargetSelector,
    product_name: String,
    configurations: Vec<String>,
    sdks: Vec<String>,
    #[serde(rename = "archs")]
    arch_overrides: BTreeMap<String, Vec<String>>,
    #[serde(rename = "xcodebuild")]
    build_tool: PathBuf,
    #[serde(rename = "lipo")]
    merge_tool: PathBuf,
    #[serde(rename = "build_dir")]
    output_dir: PathBuf,
    dry_run: bool,
}

impl BuildRequest {
    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn configurations(&self) -> &[String] {
        &self.configurations
    }

    pub fn sdks(&self) -> &[String] {
        &self.sdks
    }

    pub fn build_tool(&self) -> &Path {
        &self.build_tool
    }

    pub fn merge_tool(&self) -> &Path {
        &self.merge_tool
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Static library file name, e.g. `libFoo.a`.
    pub fn artifact_file_name(&self) -> String {
        format!("lib{}.a", self.product_name)
    }

    /// Architecture override for an SDK, if its family has one.
    pub fn archs_for(&self, sdk: &str) -> Option<&[String]> {
        let family = PlatformFamily::from_sdk(sdk)?;
        self.arch_overrides
            .get(family.as_str())
            .map(Vec::as_slice)
    }

    /// Directory holding the merged archive for a configuration.
    pub fn universal_dir(&self, configuration: &str) -> PathBuf {
        self.output_dir.join(format!("{}-universal", configuration))
    }

    /// Path of the merged archive for a configuration.
    pub fn universal_product(&self, configuration: &str) -> PathBuf {
        self.universal_dir(configuration)
            .join(self.artifact_file_name())
    }

    /// Expected per-cell artifact path: `<output_dir>/<configuration>-<family>/lib<name>.a`.
    ///
    /// SDKs outside the known families fall back to their versionless stem for the
    /// directory name.
    pub fn artifact_path(&self, configuration: &str, sdk: &str) -> PathBuf {
        let family = PlatformFamily::from_sdk(sdk)
            .map(|f| f.as_str())
            .unwrap_or_else(|| sdk_stem(sdk));
        self.output_dir
            .join(format!("{}-{}", configuration, family))
            .join(self.artifact_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_options() -> BuildOptions {
        BuildOptions {
            target: Some("Foo".into()),
            configurations: vec!["Debug".into(), "Release".into()],
            sdks: vec!["iphoneos".into(), "iphonesimulator17.0".into()],
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_family_from_versioned_sdk() {
        assert_eq!(
            PlatformFamily::from_sdk("iphonesimulator17.0"),
            Some(PlatformFamily::IphoneSimulator)
        );
        assert_eq!(
            PlatformFamily::from_sdk("iphoneos"),
            Some(PlatformFamily::IphoneOs)
        );
        assert_eq!(
            PlatformFamily::from_sdk("xrsimulator1.2"),
            Some(PlatformFamily::XrSimulator)
        );
    }

    #[test]
    fn test_family_unknown_sdk() {
        assert_eq!(PlatformFamily::from_sdk("driverkit23.0"), None);
        assert_eq!(PlatformFamily::from_sdk(""), None);
        assert_eq!(PlatformFamily::from_sdk("iphoneosx"), None);
    }

    #[test]
    fn test_workspace_requires_scheme() {
        let options = BuildOptions {
            workspace: Some("App.xcworkspace".into()),
            target: Some("Foo".into()),
            ..target_options()
        };
        let err = options.into_request().unwrap_err();
        assert!(matches!(err, BuildError::MissingScheme));
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_missing_selector() {
        let options = BuildOptions {
            target: None,
            scheme: Some("OnlyScheme".into()),
            ..target_options()
        };
        let err = options.into_request().unwrap_err();
        assert!(matches!(err, BuildError::MissingSelector));
        assert_eq!(err.to_string(), "Either workspace+scheme or target must be set");
    }

    #[test]
    fn test_workspace_wins_over_target() {
        let options = BuildOptions {
            workspace: Some("App.xcworkspace".into()),
            scheme: Some("AppScheme".into()),
            ..target_options()
        };
        let request = options.into_request().unwrap();
        assert_eq!(
            request.selector(),
            &TargetSelector::Workspace {
                workspace: "App.xcworkspace".into(),
                scheme: "AppScheme".into()
            }
        );
        // Target still names the product.
        assert_eq!(request.product_name(), "Foo");
    }

    #[test]
    fn test_product_name_resolution_order() {
        let explicit = BuildOptions {
            product_name: Some("Named".into()),
            ..target_options()
        };
        assert_eq!(explicit.into_request().unwrap().product_name(), "Named");

        let from_scheme = BuildOptions {
            target: None,
            workspace: Some("W.xcworkspace".into()),
            scheme: Some("Scheme".into()),
            ..target_options()
        };
        let request = from_scheme.into_request().unwrap();
        assert_eq!(request.product_name(), "Scheme");
        assert_eq!(request.artifact_file_name(), "libScheme.a");
    }

    #[test]
    fn test_empty_lists_rejected() {
        let options = BuildOptions {
            sdks: vec![" ".into()],
            ..target_options()
        };
        assert!(matches!(
            options.into_request(),
            Err(BuildError::EmptyList("SDK"))
        ));

        let options = BuildOptions {
            configurations: vec![],
            ..target_options()
        };
        assert!(matches!(
            options.into_request(),
            Err(BuildError::EmptyList("configuration"))
        ));
    }

    #[test]
    fn test_artifact_paths() {
        let request = target_options().into_request().unwrap();
        assert_eq!(
            request.artifact_path("Debug", "iphonesimulator17.0"),
            PathBuf::from("/tmp/out/Debug-iphonesimulator/libFoo.a")
        );
        assert_eq!(
            request.universal_product("Release"),
            PathBuf::from("/tmp/out/Release-universal/libFoo.a")
        );
        assert_eq!(
            request.artifact_path("Debug", "driverkit23.0"),
            PathBuf::from("/tmp/out/Debug-driverkit/libFoo.a")
        );
    }

    #[test]
    fn test_archs_for_family() {
        let mut options = target_options();
        options
            .arch_overrides
            .insert("iphoneos".into(), vec!["arm64".into()]);
        options.arch_overrides.insert("iphonesimulator".into(), vec![]);
        let request = options.into_request().unwrap();

        assert_eq!(
            request.archs_for("iphoneos17.0"),
            Some(&["arm64".to_string()][..])
        );
        assert_eq!(request.archs_for("iphonesimulator"), None);
        assert_eq!(request.archs_for("unknown"), None);
    }

    #[test]
    fn test_relative_output_dir_made_absolute() {
        let options = BuildOptions {
            output_dir: Some(PathBuf::from("relative/build")),
            ..target_options()
        };
        let request = options.into_request().unwrap();
        assert!(request.output_dir().is_absolute());
        assert!(request.output_dir().ends_with("relative/build"));
    }

    #[test]
    fn test_defaults_for_tools() {
        let request = target_options().into_request().unwrap();
        assert_eq!(request.build_tool(), Path::new(DEFAULT_XCODEBUILD));
        assert_eq!(request.merge_tool(), Path::new(DEFAULT_LIPO));
        assert!(!request.dry_run());
    }
}
