use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use crate::error::{GvmError, Result};

/// Runs external programs and captures their standard output.
pub trait ProcessRunner {
    /// Runs `program` with `args`; returns stdout on success.
    ///
    /// A program that cannot be started is reported as [`GvmError::Io`],
    /// a non-zero exit as [`GvmError::Process`].
    fn output(&self, program: &Path, args: &[&str]) -> Result<String>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn output(&self, program: &Path, args: &[&str]) -> Result<String> {
        debug!(program = %program.display(), ?args, "running");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| GvmError::io(format!("could not run {}", program.display()), e))?;
        if !output.status.success() {
            return Err(GvmError::Process(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Path of the `go` binary inside a toolchain root.
pub fn go_binary(root: &Path) -> PathBuf {
    #[cfg(windows)]
    let name = "go.exe";
    #[cfg(not(windows))]
    let name = "go";
    root.join("bin").join(name)
}

/// Extracts `go1.25.5` from `go version go1.25.5 linux/amd64`.
pub fn parse_go_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .nth(2)
        .filter(|token| token.starts_with("go"))
        .map(str::to_string)
}
