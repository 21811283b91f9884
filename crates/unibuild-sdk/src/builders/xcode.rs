//! xcodebuild build-plan execution
//!
//! [`UniversalBuilder`] expands the {configuration × SDK} matrix of a
//! [`BuildRequest`], runs one `xcodebuild ... clean build` per cell and hands the
//! per-cell static libraries of each configuration to the lipo merge step.
//!
//! Execution is strictly sequential: one process is drained before the next is
//! started, and a configuration is fully built and merged before the next begins.

use std::path::{Path, PathBuf};

use super::common::{ProcessRunner, SystemRunner, ToolCommand, ensure_dir, ensure_success, recreate_dir};
use crate::types::{BuildError, BuildRequest, TargetSelector};

/// One xcodebuild invocation, before it is turned into argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub selector: TargetSelector,
    pub configuration: String,
    pub sdk: String,
    /// Explicit `ARCHS` setting; `None` leaves architecture selection to xcodebuild.
    pub archs: Option<Vec<String>>,
    /// Used for both `BUILD_DIR` and `BUILD_ROOT` so products land where we expect.
    pub build_dir: PathBuf,
}

impl BuildCommand {
    /// Plans the invocation for one {configuration × SDK} cell.
    pub fn for_cell(request: &BuildRequest, configuration: &str, sdk: &str) -> Self {
        Self {
            selector: request.selector().clone(),
            configuration: configuration.to_string(),
            sdk: sdk.to_string(),
            archs: request.archs_for(sdk).map(<[String]>::to_vec),
            build_dir: request.output_dir().to_path_buf(),
        }
    }

    /// Renders the argument tokens for `build_tool`.
    pub fn to_tool_command(&self, build_tool: &Path) -> ToolCommand {
        let build_dir = self.build_dir.display().to_string();
        let mut cmd = ToolCommand::new(build_tool)
            .args(self.selector.to_args())
            .args(["-configuration", self.configuration.as_str()])
            .args(["-sdk", self.sdk.as_str()]);
        if let Some(archs) = &self.archs {
            cmd = cmd.arg(format!("ARCHS={}", archs.join(" ")));
        }
        cmd.arg(format!("BUILD_DIR={}", build_dir))
            .arg(format!("BUILD_ROOT={}", build_dir))
            .args(["clean", "build"])
    }
}

/// A merged multi-architecture archive and the per-SDK archives it was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalProduct {
    pub configuration: String,
    pub path: PathBuf,
    pub inputs: Vec<PathBuf>,
}

/// Drives xcodebuild and lipo for a [`BuildRequest`].
///
/// # Example
///
/// ```ignore
/// use unibuild_sdk::builders::UniversalBuilder;
///
/// let request = options.into_request()?;
/// let products = UniversalBuilder::new(&request).execute()?;
/// for product in products {
///     println!("{}: {}", product.configuration, product.path.display());
/// }
/// ```
pub struct UniversalBuilder<'a, R = SystemRunner> {
    pub(super) request: &'a BuildRequest,
    pub(super) runner: R,
}

impl<'a> UniversalBuilder<'a, SystemRunner> {
    /// Creates a builder that runs real processes.
    pub fn new(request: &'a BuildRequest) -> Self {
        Self::with_runner(request, SystemRunner)
    }
}

impl<'a, R: ProcessRunner> UniversalBuilder<'a, R> {
    /// Creates a builder that executes commands through `runner`.
    pub fn with_runner(request: &'a BuildRequest, runner: R) -> Self {
        Self { request, runner }
    }

    /// Cleans the output directory, then builds and merges every configuration.
    pub fn execute(&mut self) -> Result<Vec<UniversalProduct>, BuildError> {
        self.clean()?;
        self.build()
    }

    /// Wipes and recreates the output directory.
    ///
    /// A dry run only reports what would be removed.
    pub fn clean(&mut self) -> Result<(), BuildError> {
        let dir = self.request.output_dir();
        if self.request.dry_run() {
            log::info!("Would clean {}", dir.display());
            return Ok(());
        }
        log::debug!("Cleaning {}", dir.display());
        recreate_dir(dir)
    }

    /// Builds every configuration in order, stopping at the first failure.
    pub fn build(&mut self) -> Result<Vec<UniversalProduct>, BuildError> {
        let request = self.request;
        let mut products = Vec::with_capacity(request.configurations().len());
        for configuration in request.configurations() {
            products.push(self.build_configuration(configuration)?);
        }
        Ok(products)
    }

    fn build_configuration(&mut self, configuration: &str) -> Result<UniversalProduct, BuildError> {
        let request = self.request;
        log::info!("Building {} products", configuration);

        let universal_dir = request.universal_dir(configuration);
        let universal_product = request.universal_product(configuration);
        if request.dry_run() {
            log::debug!("Would create {}", universal_dir.display());
        } else {
            ensure_dir(&universal_dir)?;
        }

        let mut inputs = Vec::with_capacity(request.sdks().len());
        for sdk in request.sdks() {
            inputs.push(self.build_cell(configuration, sdk)?);
        }

        self.merge(&inputs, &universal_product)?;

        Ok(UniversalProduct {
            configuration: configuration.to_string(),
            path: universal_product,
            inputs,
        })
    }

    /// Builds one {configuration × SDK} cell and returns where its archive lands.
    fn build_cell(&mut self, configuration: &str, sdk: &str) -> Result<PathBuf, BuildError> {
        let request = self.request;
        log::info!("Building with SDK: {}", sdk);

        let plan = BuildCommand::for_cell(request, configuration, sdk);
        if let Some(archs) = &plan.archs {
            log::info!("Overriding default archs with {:?}", archs);
        }

        let cmd = plan.to_tool_command(request.build_tool());
        log::info!("Issuing build command: {}", cmd);

        if !request.dry_run() {
            let output = self.runner.run_streaming(&cmd)?;
            ensure_success(&cmd, &output)?;
        }

        Ok(request.artifact_path(configuration, sdk))
    }

    /// Consumes the builder, returning its runner.
    pub fn into_runner(self) -> R {
        self.runner
    }
}
