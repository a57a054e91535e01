//! Running external commands and capturing their output.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tracing::{info, warn};

/// Exit code reported when the command could not be started at all.
pub const SPAWN_FAILED_EXIT_CODE: i32 = 127;
/// Exit code reported when the command was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

const ESC: char = '\x1b';

/// Combined output and exit code of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Stdout and stderr interleaved in arrival order, escapes intact.
    pub output: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command line through the platform shell.
///
/// Never fails: spawn errors and signals are folded into the exit code.
pub async fn run(command: &str) -> CommandOutput {
    execute(shell_command(command), command).await
}

/// Run `program` with `args` directly, without a shell.
pub async fn run_program<I, S>(program: &OsStr, args: I) -> CommandOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    let label = format!("{:?}", cmd.as_std());
    execute(cmd, &label).await
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

async fn execute(mut cmd: Command, label: &str) -> CommandOutput {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(target: "process", command = label, error = %e, "spawn_failed");
            return CommandOutput {
                output: format!("failed to run {label}: {e}\n"),
                exit_code: SPAWN_FAILED_EXIT_CODE,
            };
        }
    };

    let mut output = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => collect_merged(stdout, stderr).await,
        _ => String::new(),
    };

    let exit_code = match child.wait().await {
        Ok(status) => status.code().unwrap_or(SIGNALLED_EXIT_CODE),
        Err(e) => {
            output.push_str(&format!("failed to wait for {label}: {e}\n"));
            SIGNALLED_EXIT_CODE
        }
    };

    info!(
        target: "process",
        command = label,
        exit_code,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        output_bytes = output.len(),
        "command_finished"
    );
    CommandOutput { output, exit_code }
}

/// Read both pipes to EOF, appending whole lines in the order they arrive.
async fn collect_merged(stdout: ChildStdout, stderr: ChildStderr) -> String {
    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    // Partial reads stay in these buffers when the other branch wins.
    let mut out_line = Vec::new();
    let mut err_line = Vec::new();
    let mut merged = Vec::new();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = out.read_until(b'\n', &mut out_line), if out_open => {
                if !matches!(read, Ok(n) if n > 0) {
                    out_open = false;
                }
                merged.append(&mut out_line);
            }
            read = err.read_until(b'\n', &mut err_line), if err_open => {
                if !matches!(read, Ok(n) if n > 0) {
                    err_open = false;
                }
                merged.append(&mut err_line);
            }
        }
    }

    String::from_utf8_lossy(&merged).into_owned()
}

/// Remove ANSI escape sequences: ESC through the next `m`, inclusive.
///
/// An unterminated sequence swallows the rest of the input.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_escape = false;
    for c in input.chars() {
        if c == ESC {
            in_escape = true;
        } else if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else {
            out.push(c);
        }
    }
    out
}
