//! Terminal setup and the background event reader.

use std::io::{self, Write};

use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Keyboard protocol flags pushed when the terminal supports them. Enough to
/// tell Ctrl+Shift+C apart from Ctrl+C; shifted keys still arrive as the
/// shifted text.
pub const KEYBOARD_FLAGS: KeyboardEnhancementFlags =
    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;

/// Puts the terminal into raw mode on the alternate screen, and restores it
/// when dropped.
pub struct TerminalGuard {
    keyboard_enhanced: bool,
}

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, EnableBracketedPaste) {
            terminal::disable_raw_mode().ok();
            return Err(e);
        }

        let keyboard_enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(out, PushKeyboardEnhancementFlags(KEYBOARD_FLAGS)).is_ok();
        debug!(target: "terminal", keyboard_enhanced, "terminal_acquired");
        Ok(Self { keyboard_enhanced })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        if self.keyboard_enhanced {
            execute!(out, PopKeyboardEnhancementFlags).ok();
        }
        if let Err(e) = execute!(
            out,
            DisableBracketedPaste,
            LeaveAlternateScreen,
            cursor::Show
        ) {
            warn!(target: "terminal", error = %e, "terminal_restore_failed");
        }
        terminal::disable_raw_mode().ok();
        out.flush().ok();
    }
}

/// Best-effort restore for the panic hook, where the guard cannot run.
pub fn restore() {
    let mut out = io::stdout();
    execute!(
        out,
        PopKeyboardEnhancementFlags,
        DisableBracketedPaste,
        LeaveAlternateScreen,
        cursor::Show
    )
    .ok();
    terminal::disable_raw_mode().ok();
}

/// Spawn a task that forwards crossterm events into a channel.
///
/// The channel closes when the event stream ends or errors.
pub fn spawn_event_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut stream = EventStream::new();
        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(target: "terminal", error = %e, "event_stream_failed");
                    return;
                }
            }
        }
    });
    rx
}

/// Current terminal size, defaulting to 80x24.
pub fn size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_flags_keep_shifted_text() {
        // Reporting every key as an escape code without alternate keys turns
        // Shift+a into a bare 'a'.
        assert!(
            !KEYBOARD_FLAGS.contains(KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES)
                || KEYBOARD_FLAGS.contains(KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS)
        );
        assert!(KEYBOARD_FLAGS.contains(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES));
    }
}
