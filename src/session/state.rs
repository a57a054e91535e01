use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::buffer::TextBuffer;
use crate::process::{self, CommandOutput};

/// File edited when none is given on the command line.
pub const DEFAULT_FILE: &str = "New Proof.ndp";

/// A transient message shown on the status line until it expires.
#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    set_at: Instant,
}

/// Editor state for the currently open file.
#[derive(Debug)]
pub struct Session {
    pub file_path: PathBuf,
    pub buffer: TextBuffer,
    /// True iff the buffer changed since the last successful save or load.
    pub modified: bool,
    status_message: Option<StatusMessage>,
    /// Persistent error; overrides everything else on the status line.
    pub error_message: Option<String>,
    /// Output of the last ndpc run, escapes intact.
    pub last_command_output: String,
    pub last_exit_code: i32,
    /// Set by every command action; the popup shows while this is set and
    /// the exit code is non-zero.
    pub show_output: bool,
    message_duration: Duration,
}

/// What the status line displays, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine<'a> {
    Error(&'a str),
    Message(&'a str),
    Editing { file: &'a Path, modified: bool },
}

impl fmt::Display for StatusLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Error(text) | StatusLine::Message(text) => f.write_str(text),
            StatusLine::Editing { file, modified } => {
                write!(f, "Editing {}", file.display())?;
                if *modified {
                    f.write_str(" [modified]")?;
                }
                Ok(())
            }
        }
    }
}

impl Session {
    pub fn new(file_path: PathBuf, capacity: usize, message_duration: Duration) -> Self {
        Self {
            file_path,
            buffer: TextBuffer::new(capacity),
            modified: false,
            status_message: None,
            error_message: None,
            last_command_output: String::new(),
            last_exit_code: 0,
            show_output: false,
            message_duration,
        }
    }

    /// Apply an edit to the buffer, marking the session modified if the edit
    /// changed anything.
    pub fn edit(&mut self, f: impl FnOnce(&mut TextBuffer) -> bool) -> bool {
        let changed = f(&mut self.buffer);
        if changed {
            self.modified = true;
        }
        changed
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.set_status_at(text, Instant::now());
    }

    pub fn set_status_at(&mut self, text: impl Into<String>, now: Instant) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            set_at: now,
        });
    }

    /// The most recent status message, expired or not.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().map(|m| m.text.as_str())
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.error_message = Some(text.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Store the result of an ndpc run and arm the output popup.
    pub fn record_command(&mut self, result: CommandOutput) {
        self.last_command_output = result.output;
        self.last_exit_code = result.exit_code;
        self.show_output = true;
    }

    /// Stripped output for the popup, if it should be showing.
    pub fn popup_output(&self) -> Option<String> {
        (self.show_output && self.last_exit_code != 0)
            .then(|| process::strip_ansi(&self.last_command_output))
    }

    pub fn dismiss_output(&mut self) {
        self.show_output = false;
    }

    /// Resolve the status line at `now`: error, then a fresh message, then
    /// the default editing line.
    pub fn status_line(&self, now: Instant) -> StatusLine<'_> {
        if let Some(ref error) = self.error_message {
            return StatusLine::Error(error);
        }
        if let Some(ref msg) = self.status_message
            && !msg.text.is_empty()
            && now.saturating_duration_since(msg.set_at) < self.message_duration
        {
            return StatusLine::Message(&msg.text);
        }
        StatusLine::Editing {
            file: &self.file_path,
            modified: self.modified,
        }
    }

    /// When the current status message stops being shown, if one is live.
    pub fn status_expires_at(&self) -> Option<Instant> {
        self.status_message
            .as_ref()
            .map(|m| m.set_at + self.message_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(PathBuf::from("a.ndp"), 64, Duration::from_secs(1))
    }

    #[test]
    fn status_line_precedence() {
        let mut s = session();
        let t0 = Instant::now();
        assert_eq!(s.status_line(t0).to_string(), "Editing a.ndp");

        s.set_status_at("File saved", t0);
        assert_eq!(s.status_line(t0), StatusLine::Message("File saved"));

        s.set_error("Failed to write to a.ndp");
        assert_eq!(
            s.status_line(t0),
            StatusLine::Error("Failed to write to a.ndp")
        );

        s.clear_error();
        assert_eq!(s.status_line(t0).to_string(), "File saved");
    }

    #[test]
    fn status_message_expires() {
        let mut s = session();
        let t0 = Instant::now();
        s.set_status_at("Proof is correct!", t0);
        let later = t0 + Duration::from_millis(1500);
        assert_eq!(
            s.status_line(later),
            StatusLine::Editing {
                file: Path::new("a.ndp"),
                modified: false
            }
        );
        assert_eq!(s.status_message(), Some("Proof is correct!"));
    }

    #[test]
    fn editing_line_shows_modified_marker() {
        let mut s = session();
        assert!(s.edit(|b| b.insert_str("p")));
        assert!(s.modified);
        assert_eq!(
            s.status_line(Instant::now()).to_string(),
            "Editing a.ndp [modified]"
        );
    }

    #[test]
    fn refused_edit_does_not_mark_modified() {
        let mut s = Session::new(PathBuf::from("a.ndp"), 1, Duration::from_secs(1));
        assert!(!s.edit(|b| b.insert_str("too long")));
        assert!(!s.modified);
    }

    #[test]
    fn popup_only_for_failed_commands() {
        let mut s = session();
        assert_eq!(s.popup_output(), None);

        s.record_command(CommandOutput {
            output: "ok\n".into(),
            exit_code: 0,
        });
        assert_eq!(s.popup_output(), None);

        s.record_command(CommandOutput {
            output: "\x1b[31merror\x1b[0m: line 2\n".into(),
            exit_code: 1,
        });
        assert_eq!(s.popup_output().as_deref(), Some("error: line 2\n"));

        s.dismiss_output();
        assert_eq!(s.popup_output(), None);
        assert_eq!(s.last_exit_code, 1);
    }
}
