//! Front end for the `ndpc` proof compiler.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::process::{self, CommandOutput};

#[cfg(windows)]
pub const NDPC_BINARY: &str = "ndpc.exe";
#[cfg(not(windows))]
pub const NDPC_BINARY: &str = "ndpc";

/// Handle to the `ndpc` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ndpc {
    program: PathBuf,
}

impl Ndpc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Pick the program to run.
    ///
    /// An explicitly configured program wins. Otherwise an `ndpc` shipped next
    /// to the running executable is preferred over one found on `PATH`.
    pub fn resolve(configured: Option<&Path>) -> Self {
        if let Some(program) = configured {
            return Self::new(program);
        }
        let bundled = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(NDPC_BINARY)))
            .filter(|candidate| candidate.is_file());
        Self::new(bundled.unwrap_or_else(|| PathBuf::from(NDPC_BINARY)))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `ndpc <file>`
    pub async fn compile(&self, file: &Path) -> CommandOutput {
        self.invoke(&[], file).await
    }

    /// `ndpc check <file>`
    pub async fn check(&self, file: &Path) -> CommandOutput {
        self.invoke(&["check"], file).await
    }

    /// `ndpc format --apply <file>`
    pub async fn format(&self, file: &Path) -> CommandOutput {
        self.invoke(&["format", "--apply"], file).await
    }

    /// Argument vector for a subcommand, for logging and tests.
    pub fn args(subcommand: &[&str], file: &Path) -> Vec<OsString> {
        subcommand
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(file.as_os_str().to_os_string()))
            .collect()
    }

    async fn invoke(&self, subcommand: &[&str], file: &Path) -> CommandOutput {
        process::run_program(self.program.as_os_str(), Self::args(subcommand, file)).await
    }
}
