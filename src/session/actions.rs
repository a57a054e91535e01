//! User actions and the file/subprocess sequences behind them.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::file_io;
use crate::ndpc::Ndpc;
use crate::session::state::Session;

pub const MSG_SAVED: &str = "File saved";
pub const MSG_COMPILED: &str = "Compilation was successful!";
pub const MSG_CHECKED: &str = "Proof is correct!";
pub const MSG_FORMATTED: &str = "Successfully formatted!";

/// A one-shot user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Switch to another file and load it.
    Open(PathBuf),
    Save,
    /// Save, then `ndpc <file>`.
    Compile,
    /// Save, then `ndpc check <file>`.
    Check,
    /// `ndpc format --apply <file>`, then reload (or re-save on failure).
    Format,
}

impl Action {
    /// Whether the action runs ndpc (and can therefore be cancelled).
    pub fn runs_command(&self) -> bool {
        matches!(self, Action::Compile | Action::Check | Action::Format)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Open(_) => "Open",
            Action::Save => "Save",
            Action::Compile => "Compile",
            Action::Check => "Check",
            Action::Format => "Format",
        };
        f.write_str(name)
    }
}

/// Run `action` against the session.
///
/// Failures never propagate: they end up in the session's error message or
/// in the command output popup.
pub async fn dispatch(action: &Action, session: &mut Session, ndpc: &Ndpc) {
    info!(target: "session", %action, file = %session.file_path.display(), "dispatch");
    match action {
        Action::Open(path) => open(session, path.clone()),
        Action::Save => {
            save(session);
        }
        Action::Compile => {
            save(session);
            let result = ndpc.compile(&session.file_path).await;
            finish_command(session, result, MSG_COMPILED);
        }
        Action::Check => {
            save(session);
            let result = ndpc.check(&session.file_path).await;
            finish_command(session, result, MSG_CHECKED);
        }
        Action::Format => {
            let result = ndpc.format(&session.file_path).await;
            if result.success() {
                load(session);
            } else {
                // The formatter may have left the file half-written.
                save(session);
            }
            finish_command(session, result, MSG_FORMATTED);
        }
    }
}

fn finish_command(
    session: &mut Session,
    result: crate::process::CommandOutput,
    success_message: &str,
) {
    if result.success() {
        session.set_status(success_message);
    }
    session.record_command(result);
}

/// Write the buffer to the current file. Returns whether it succeeded.
pub fn save(session: &mut Session) -> bool {
    match file_io::save(&session.file_path, session.buffer.text()) {
        Ok(()) => {
            info!(
                target: "session",
                file = %session.file_path.display(),
                bytes = session.buffer.len(),
                "file_saved"
            );
            session.modified = false;
            session.clear_error();
            session.set_status(MSG_SAVED);
            true
        }
        Err(e) => {
            warn!(target: "session", error = ?e, "save_failed");
            session.set_error(e.to_string());
            false
        }
    }
}

/// Replace the buffer with the current file's contents. On failure the
/// buffer and the modified flag are left alone.
pub fn load(session: &mut Session) -> bool {
    let loaded = file_io::load(&session.file_path, session.buffer.capacity())
        .map_err(|e| e.to_string())
        .and_then(|text| session.buffer.replace(text).map_err(|e| e.to_string()));
    match loaded {
        Ok(()) => {
            info!(
                target: "session",
                file = %session.file_path.display(),
                bytes = session.buffer.len(),
                "file_loaded"
            );
            session.modified = false;
            session.clear_error();
            true
        }
        Err(message) => {
            warn!(target: "session", error = %message, "load_failed");
            session.set_error(message);
            false
        }
    }
}

/// Make `path` the current file and load it.
pub fn open(session: &mut Session, path: PathBuf) {
    session.file_path = path;
    load(session);
}
