//! Architecture merge step.
//!
//! Folds the per-SDK static libraries of one configuration into a single
//! multi-architecture archive with `lipo -create`.

use std::path::{Path, PathBuf};

use super::common::{ProcessRunner, ToolCommand, ensure_success};
use super::xcode::UniversalBuilder;
use crate::types::BuildError;

/// Composes `lipo <inputs...> -create -output <output>`.
///
/// Inputs are not checked for existence; lipo reports missing files itself.
pub fn lipo_command(merge_tool: &Path, inputs: &[PathBuf], output: &Path) -> ToolCommand {
    ToolCommand::new(merge_tool)
        .args(inputs.iter().map(|p| p.display().to_string()))
        .args(["-create", "-output"])
        .arg(output.display().to_string())
}

impl<R: ProcessRunner> UniversalBuilder<'_, R> {
    /// Merges `inputs` into the universal archive at `output`.
    ///
    /// In a dry run the command is only logged. Otherwise a non-zero exit from lipo
    /// is returned as [`BuildError::CommandFailed`].
    pub fn merge(&mut self, inputs: &[PathBuf], output: &Path) -> Result<(), BuildError> {
        let cmd = lipo_command(self.request.merge_tool(), inputs, output);
        log::info!("Issuing lipo command: {}", cmd);

        if self.request.dry_run() {
            return Ok(());
        }

        let result = self.runner.run(&cmd)?;
        if !result.stdout.trim().is_empty() {
            log::info!("{}", result.stdout.trim_end());
        }
        ensure_success(&cmd, &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::common::recording::{Mode, RecordingRunner};
    use crate::types::BuildOptions;

    fn request(dry_run: bool) -> crate::BuildRequest {
        BuildOptions {
            target: Some("Foo".into()),
            configurations: vec!["Debug".into()],
            sdks: vec!["iphoneos".into()],
            output_dir: Some(PathBuf::from("/nonexistent/unibuild-out")),
            dry_run,
            ..BuildOptions::default()
        }
        .into_request()
        .unwrap()
    }

    #[test]
    fn test_lipo_command_shape() {
        let cmd = lipo_command(
            Path::new("lipo"),
            &[PathBuf::from("a.a"), PathBuf::from("b.a")],
            Path::new("out.a"),
        );
        assert_eq!(cmd.to_string(), "lipo a.a b.a -create -output out.a");
    }

    #[test]
    fn test_dry_run_merge_needs_no_inputs_on_disk() {
        let request = request(true);
        let mut runner = RecordingRunner::default();
        let mut builder = UniversalBuilder::with_runner(&request, &mut runner);

        builder
            .merge(
                &[PathBuf::from("a.a"), PathBuf::from("b.a")],
                Path::new("out.a"),
            )
            .unwrap();

        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_merge_runs_one_captured_command() {
        let request = request(false);
        let mut runner = RecordingRunner::default();
        UniversalBuilder::with_runner(&request, &mut runner)
            .merge(
                &[PathBuf::from("a.a"), PathBuf::from("b.a")],
                Path::new("out.a"),
            )
            .unwrap();

        assert_eq!(runner.calls.len(), 1);
        let (mode, cmd) = &runner.calls[0];
        assert_eq!(*mode, Mode::Captured);
        assert_eq!(cmd.get_args(), &["a.a", "b.a", "-create", "-output", "out.a"]);
    }

    #[test]
    fn test_merge_failure_is_fatal() {
        let request = request(false);
        let mut runner = RecordingRunner::failing_at(0);
        let err = UniversalBuilder::with_runner(&request, &mut runner)
            .merge(&[], Path::new("out.a"))
            .unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { .. }));
    }
}
