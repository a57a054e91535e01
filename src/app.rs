//! The editor's event loop.
//!
//! One task owns the [`App`]. Each iteration draws a frame, then waits for a
//! terminal event or for the current status message to expire. Actions that
//! run ndpc are awaited in place; while they run only Esc (cancel) and resize
//! events are honoured.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::info;

use crate::buffer::TextBuffer;
use crate::config::Config;
use crate::display::file_dialog::{DialogOutcome, FileDialog};
use crate::display::input::{self, EditCommand, InputAction, MenuCommand};
use crate::display::renderer::{self, Overlay, Renderer, Screen, Viewport};
use crate::ndpc::Ndpc;
use crate::session::actions::{self, Action};
use crate::session::state::Session;

const QUIT_WARNING: &str = "Unsaved changes: press Ctrl+Q again to quit";
/// Upper bound on how long the loop sleeps without input.
const IDLE_WAKEUP: Duration = Duration::from_secs(60);

/// Result of handling one terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
    Dispatch(Action),
}

pub struct App {
    session: Session,
    ndpc: Ndpc,
    viewport: Viewport,
    dialog: Option<FileDialog>,
    output_scroll: usize,
    tab_width: usize,
    /// Set by a first Ctrl+Q on a modified buffer.
    quit_armed: bool,
    size: (u16, u16),
}

impl App {
    pub fn new(config: &Config, file: PathBuf, size: (u16, u16)) -> Self {
        let session = Session::new(file, config.buffer_capacity, config.message_duration());
        Self {
            session,
            ndpc: Ndpc::resolve(config.ndpc.as_deref()),
            viewport: Viewport::default(),
            dialog: None,
            output_scroll: 0,
            tab_width: config.tab_width.max(1),
            quit_armed: false,
            size,
        }
    }

    /// Load the initial file if it exists; a missing file starts empty.
    pub fn open_initial(&mut self) {
        if self.session.file_path.exists() {
            actions::load(&mut self.session);
        } else {
            info!(target: "app", file = %self.session.file_path.display(), "new_file");
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn ndpc(&self) -> &Ndpc {
        &self.ndpc
    }

    pub fn dialog(&self) -> Option<&FileDialog> {
        self.dialog.as_ref()
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    /// Everything the next frame shows.
    pub fn screen<'a>(&'a self, popup: Option<&'a str>, busy: Option<&'a str>) -> Screen<'a> {
        let overlay = if let Some(ref dialog) = self.dialog {
            Overlay::Dialog(dialog)
        } else if let Some(text) = popup {
            Overlay::Output {
                text,
                scroll: self.output_scroll,
            }
        } else {
            Overlay::None
        };
        Screen {
            session: &self.session,
            viewport: self.viewport,
            overlay,
            busy,
            notice: self.quit_armed.then_some(QUIT_WARNING),
            tab_width: self.tab_width,
            now: Instant::now(),
        }
    }

    /// Compose and write a frame.
    pub fn draw<W: Write>(&self, renderer: &mut Renderer<W>, busy: Option<&str>) -> Result<()> {
        let popup = self.session.popup_output();
        let screen = self.screen(popup.as_deref(), busy);
        let (width, height) = self.size;
        renderer
            .render(renderer::compose(&screen, width, height))
            .context("failed to draw frame")
    }

    pub fn handle_event(&mut self, event: &Event) -> Step {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Paste(text) => {
                if let Some(ref mut dialog) = self.dialog {
                    for c in text.chars().filter(|c| !c.is_control()) {
                        dialog.handle_key(
                            &KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE),
                            0,
                        );
                    }
                } else if self.session.popup_output().is_none() {
                    self.apply_edit(EditCommand::Paste(input::normalize_paste(text)));
                }
                Step::Continue
            }
            Event::Resize(width, height) => {
                self.set_size(*width, *height);
                self.follow_cursor();
                Step::Continue
            }
            _ => Step::Continue,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Step {
        let quit_armed = std::mem::take(&mut self.quit_armed);

        if let Some(ref mut dialog) = self.dialog {
            let page = renderer::dialog_list_rows(self.size.1);
            match dialog.handle_key(key, page) {
                DialogOutcome::Pending => {}
                DialogOutcome::Cancelled => self.dialog = None,
                DialogOutcome::Selected(path) => {
                    self.dialog = None;
                    return Step::Dispatch(Action::Open(path));
                }
            }
            return Step::Continue;
        }

        let action = input::map_key(key);
        if let InputAction::Menu(menu) = action {
            return self.menu(menu, quit_armed);
        }

        if let Some(popup) = self.session.popup_output() {
            self.popup_key(key, &popup);
            return Step::Continue;
        }

        if let InputAction::Edit(edit) = action {
            self.apply_edit(edit);
        }
        Step::Continue
    }

    fn menu(&mut self, menu: MenuCommand, quit_armed: bool) -> Step {
        match menu {
            MenuCommand::Open => {
                self.dialog = Some(FileDialog::for_file(&self.session.file_path));
                Step::Continue
            }
            MenuCommand::Save => Step::Dispatch(Action::Save),
            MenuCommand::Compile => Step::Dispatch(Action::Compile),
            MenuCommand::Check => Step::Dispatch(Action::Check),
            MenuCommand::Format => Step::Dispatch(Action::Format),
            MenuCommand::Quit => {
                if self.session.modified && !quit_armed {
                    self.quit_armed = true;
                    Step::Continue
                } else {
                    Step::Quit
                }
            }
        }
    }

    fn popup_key(&mut self, key: &KeyEvent, popup: &str) {
        let (width, height) = self.size;
        let max = renderer::output_max_scroll(popup, width, height);
        let page = usize::from(height / 2).max(1);
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.session.dismiss_output();
                self.output_scroll = 0;
            }
            KeyCode::Up => self.output_scroll = self.output_scroll.saturating_sub(1),
            KeyCode::Down => self.output_scroll = (self.output_scroll + 1).min(max),
            KeyCode::PageUp => self.output_scroll = self.output_scroll.saturating_sub(page),
            KeyCode::PageDown => self.output_scroll = (self.output_scroll + page).min(max),
            KeyCode::Home => self.output_scroll = 0,
            KeyCode::End => self.output_scroll = max,
            _ => {}
        }
    }

    fn apply_edit(&mut self, edit: EditCommand) {
        let page = renderer::text_rows(self.size.1);
        let buffer = &mut self.session.buffer;
        match edit {
            EditCommand::Left => buffer.move_left(),
            EditCommand::Right => buffer.move_right(),
            EditCommand::Up => buffer.move_up(1),
            EditCommand::Down => buffer.move_down(1),
            EditCommand::LineStart => buffer.move_line_start(),
            EditCommand::LineEnd => buffer.move_line_end(),
            EditCommand::PageUp => buffer.move_up(page),
            EditCommand::PageDown => buffer.move_down(page),
            EditCommand::DocStart => buffer.move_doc_start(),
            EditCommand::DocEnd => buffer.move_doc_end(),
            EditCommand::Insert(c) => {
                self.session.edit(|b| b.insert_char(c));
            }
            EditCommand::Newline => {
                self.session.edit(|b| b.insert_char('\n'));
            }
            EditCommand::Paste(text) => {
                self.session.edit(|b| b.insert_str(&text));
            }
            EditCommand::Tab => {
                let tab_width = self.tab_width;
                self.session.edit(|b| {
                    let col = renderer::display_col(b.line_before_cursor(), tab_width);
                    b.insert_str(&" ".repeat(tab_width - col % tab_width))
                });
            }
            EditCommand::Backspace => {
                self.session.edit(TextBuffer::backspace);
            }
            EditCommand::Delete => {
                self.session.edit(TextBuffer::delete);
            }
        }
        self.follow_cursor();
    }

    fn follow_cursor(&mut self) {
        let buffer = &self.session.buffer;
        let (line, _) = buffer.cursor_position();
        let col = renderer::display_col(buffer.line_before_cursor(), self.tab_width);
        let (width, height) = self.size;
        self.viewport
            .follow(line, col, renderer::text_rows(height), usize::from(width));
    }

    /// Run `action`, letting Esc cancel it if it runs ndpc.
    ///
    /// Returns false if the terminal event stream ended while waiting.
    pub async fn run_action<W: Write>(
        &mut self,
        action: Action,
        events: &mut mpsc::UnboundedReceiver<Event>,
        renderer: &mut Renderer<W>,
    ) -> Result<bool> {
        if !action.runs_command() {
            actions::dispatch(&action, &mut self.session, &self.ndpc).await;
            self.output_scroll = 0;
            self.viewport = Viewport::default();
            self.follow_cursor();
            return Ok(true);
        }

        let label = action.to_string();
        self.draw(renderer, Some(&label))?;

        let mut resized = None;
        let mut stream_open = true;
        let cancelled = {
            let dispatch = actions::dispatch(&action, &mut self.session, &self.ndpc);
            tokio::pin!(dispatch);
            loop {
                tokio::select! {
                    () = &mut dispatch => break false,
                    event = events.recv() => match event {
                        Some(Event::Key(key)) if is_cancel(&key) => break true,
                        Some(Event::Resize(w, h)) => resized = Some((w, h)),
                        Some(_) => {}
                        None => {
                            stream_open = false;
                            break true;
                        }
                    },
                }
            }
        };

        if let Some((w, h)) = resized {
            self.set_size(w, h);
            renderer.invalidate();
        }
        if cancelled {
            info!(target: "app", %action, "command_cancelled");
            if action == Action::Format {
                // The killed formatter may have left the file half-written.
                actions::save(&mut self.session);
            }
            self.session.set_error(format!("{label} cancelled"));
        } else if action == Action::Format {
            self.viewport = Viewport::default();
        }
        self.output_scroll = 0;
        self.follow_cursor();
        Ok(stream_open)
    }

    /// Time at which the frame must be redrawn even without input.
    fn next_wakeup(&self, now: Instant) -> Instant {
        self.session
            .status_expires_at()
            .filter(|at| *at > now)
            .unwrap_or(now + IDLE_WAKEUP)
    }
}

fn is_cancel(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && (key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)))
}

/// Drive the editor until the user quits or the event stream ends.
pub async fn run<W: Write>(
    mut app: App,
    mut events: mpsc::UnboundedReceiver<Event>,
    renderer: &mut Renderer<W>,
) -> Result<()> {
    info!(target: "app", file = %app.session.file_path.display(), ndpc = %app.ndpc.program().display(), "editor_started");
    loop {
        app.draw(renderer, None)?;
        let wakeup = app.next_wakeup(Instant::now());

        let event = tokio::select! {
            event = events.recv() => event,
            () = tokio::time::sleep_until(wakeup.into()) => continue,
        };
        let Some(event) = event else {
            break;
        };
        if matches!(event, Event::Resize(..)) {
            renderer.invalidate();
        }

        match app.handle_event(&event) {
            Step::Continue => {}
            Step::Quit => break,
            Step::Dispatch(action) => {
                if !app.run_action(action, &mut events, renderer).await? {
                    break;
                }
            }
        }
    }
    info!(target: "app", "editor_stopped");
    Ok(())
}
