//! Common utilities shared between the xcodebuild and lipo steps.
//!
//! This module is the only place that touches processes and the output directory:
//!
//! - [`ToolCommand`] - A structured command (program + argument tokens). Commands are
//!   never assembled as shell strings; the `Display` form is only for logs.
//! - [`ProcessRunner`] - The seam the builders execute commands through.
//!   [`SystemRunner`] is the real implementation.
//! - Directory helpers used for the clean step and the universal output directories.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::types::BuildError;

/// Size of the chunks copied from a child's stdout while streaming.
const STREAM_CHUNK: usize = 1024;

/// A command to run: program plus ordered argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Builds the `std::process::Command` for this invocation.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    /// Renders the command the way it would be typed in a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quotes a token for display. `KEY=a b` renders as `KEY="a b"`, matching how build
/// settings are usually written on the xcodebuild command line.
fn shell_quote(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$' | '`'));
    if !needs_quotes {
        return token.to_string();
    }
    let escape = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
    match token.split_once('=') {
        Some((key, value))
            if !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            format!("{}=\"{}\"", key, escape(value))
        }
        _ => format!("\"{}\"", escape(token)),
    }
}

/// Result of running a process to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Everything the process wrote to stdout.
    pub stdout: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Executes commands on behalf of the builders.
///
/// Both methods block until the process exits; there is no timeout.
pub trait ProcessRunner {
    /// Runs a command to completion, capturing its stdout.
    fn run(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError>;

    /// Runs a command while copying its stdout to ours as it is produced.
    fn run_streaming(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &mut R {
    fn run(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
        (**self).run(command)
    }

    fn run_streaming(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
        (**self).run_streaming(command)
    }
}

/// Runs commands as real child processes. Stderr is inherited in both modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
        let output = command
            .to_command()
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| spawn_error(command, e))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn run_streaming(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error(command, e))?;

        let mut captured = Vec::new();
        if let Some(mut pipe) = child.stdout.take() {
            let mut buf = [0u8; STREAM_CHUNK];
            let stdout = io::stdout();
            loop {
                let n = match pipe.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(BuildError::io(command.program(), e)),
                };
                let mut out = stdout.lock();
                // A closed stdout on our side must not abort the child's build.
                let _ = out.write_all(&buf[..n]).and_then(|_| out.flush());
                captured.extend_from_slice(&buf[..n]);
            }
        }

        let status = child
            .wait()
            .map_err(|e| BuildError::io(command.program(), e))?;

        Ok(ProcessOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&captured).into_owned(),
        })
    }
}

fn spawn_error(command: &ToolCommand, source: io::Error) -> BuildError {
    BuildError::Spawn {
        program: command.program().display().to_string(),
        source,
    }
}

/// Turns an unsuccessful [`ProcessOutput`] into [`BuildError::CommandFailed`].
pub fn ensure_success(command: &ToolCommand, output: &ProcessOutput) -> Result<(), BuildError> {
    if output.success() {
        return Ok(());
    }
    Err(BuildError::CommandFailed {
        command: command.to_string(),
        status: output.status_text(),
    })
}

/// Creates a directory and its parents. Succeeds if it already exists.
pub fn ensure_dir(path: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(path).map_err(|e| BuildError::io(path, e))
}

/// Removes a directory tree unconditionally and recreates it empty.
pub fn recreate_dir(path: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io(path, e)),
    }
    ensure_dir(path)
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Which runner entry point a command went through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Mode {
        Captured,
        Streamed,
    }

    /// Test double that records every command and succeeds unless told otherwise.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: Vec<(Mode, ToolCommand)>,
        /// Zero-based index of the call that exits with status 1.
        pub fail_at: Option<usize>,
    }

    impl RecordingRunner {
        pub fn failing_at(index: usize) -> Self {
            Self {
                calls: Vec::new(),
                fail_at: Some(index),
            }
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls
                .iter()
                .map(|(_, c)| c.program().display().to_string())
                .collect()
        }

        fn record(&mut self, mode: Mode, command: &ToolCommand) -> ProcessOutput {
            let index = self.calls.len();
            self.calls.push((mode, command.clone()));
            let code = if self.fail_at == Some(index) { 1 } else { 0 };
            ProcessOutput {
                code: Some(code),
                stdout: String::new(),
            }
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
            Ok(self.record(Mode::Captured, command))
        }

        fn run_streaming(&mut self, command: &ToolCommand) -> Result<ProcessOutput, BuildError> {
            Ok(self.record(Mode::Streamed, command))
        }
    }
}
