use std::io::{self, Write};
use std::time::Instant;

use crossterm::style::ContentStyle;

use super::file_dialog::{self, EntryKind, FileDialog};
use super::frame::{Frame, char_width};
use super::input::MENU;
use super::theme;
use crate::session::state::{Session, StatusLine};

pub const POPUP_TITLE: &str = "Something went wrong...";
const POPUP_MAX_WIDTH: u16 = 80;
const DIALOG_MAX_WIDTH: u16 = 72;
const DIALOG_MAX_HEIGHT: u16 = 20;

/// Rows above and below the text area: menu bar, separator, status line.
const CHROME_ROWS: u16 = 3;

/// First visible line and column of the text area.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub left: usize,
}

impl Viewport {
    /// Scroll the minimum needed to keep `(line, col)` on screen.
    pub fn follow(&mut self, line: usize, col: usize, rows: usize, cols: usize) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if line < self.top {
            self.top = line;
        } else if line >= self.top + rows {
            self.top = line + 1 - rows;
        }
        if col < self.left {
            self.left = col;
        } else if col >= self.left + cols {
            self.left = col + 1 - cols;
        }
    }
}

/// Something drawn on top of the editor.
pub enum Overlay<'a> {
    None,
    Dialog(&'a FileDialog),
    Output { text: &'a str, scroll: usize },
}

/// Everything one frame shows.
pub struct Screen<'a> {
    pub session: &'a Session,
    pub viewport: Viewport,
    pub overlay: Overlay<'a>,
    /// Label of the command currently running, if any.
    pub busy: Option<&'a str>,
    /// Warning that replaces the status line (e.g. unsaved changes on quit).
    pub notice: Option<&'a str>,
    pub tab_width: usize,
    pub now: Instant,
}

/// Height of the text area for a terminal of `height` rows.
pub fn text_rows(height: u16) -> usize {
    usize::from(height.saturating_sub(CHROME_ROWS).max(1))
}

/// Display column reached after `prefix`, with tabs expanded to `tab_width`.
pub fn display_col(prefix: &str, tab_width: usize) -> usize {
    prefix
        .chars()
        .fold(0, |col, c| col + cell_width(c, col, tab_width))
}

fn cell_width(c: char, col: usize, tab_width: usize) -> usize {
    if c == '\t' {
        let tab = tab_width.max(1);
        tab - col % tab
    } else {
        char_width(c)
    }
}

/// Render `line` from display column `left`, tabs expanded, at most `cols`
/// columns wide.
fn visible_slice(line: &str, left: usize, cols: usize, tab_width: usize) -> String {
    let mut out = String::new();
    let mut col = 0;
    for c in line.chars() {
        let w = cell_width(c, col, tab_width);
        let end = col + w;
        if end > left + cols {
            break;
        }
        if col >= left {
            if c == '\t' {
                out.extend(std::iter::repeat_n(' ', w));
            } else {
                out.push(c);
            }
        } else if end > left {
            // Partially scrolled-off wide char or tab.
            out.extend(std::iter::repeat_n(' ', end - left));
        }
        col = end;
    }
    out
}

/// Wrap `text` into lines of at most `width` columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        let mut col = 0;
        for c in raw.chars() {
            let (s, w) = if c == '\t' {
                ("    ".to_string(), 4)
            } else {
                (c.to_string(), char_width(c))
            };
            if col + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                col = 0;
            }
            line.push_str(&s);
            col += w;
        }
        lines.push(line);
    }
    lines
}

/// Cut `s` to at most `max_width` columns, ending in `...` when shortened.
/// A width too narrow for the ellipsis yields an empty string.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    const ELLIPSIS: &str = "...";
    if s.chars().map(char_width).sum::<usize>() <= max_width {
        return s.to_string();
    }
    let Some(budget) = max_width.checked_sub(ELLIPSIS.len()) else {
        return String::new();
    };
    let mut used = 0;
    let mut kept: String = s
        .chars()
        .take_while(|&c| {
            used += char_width(c);
            used <= budget
        })
        .collect();
    kept.push_str(ELLIPSIS);
    kept
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
}

fn centered(width: u16, height: u16, frame_width: u16, frame_height: u16) -> Rect {
    let width = width.min(frame_width);
    let height = height.min(frame_height);
    Rect {
        x: (frame_width - width) / 2,
        y: (frame_height - height) / 2,
        width,
        height,
    }
}

fn popup_rect(frame_width: u16, frame_height: u16, line_count: usize) -> Rect {
    let width = frame_width.saturating_sub(4).clamp(20, POPUP_MAX_WIDTH);
    let wanted = u16::try_from(line_count.max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(4);
    let height = wanted.min(frame_height.saturating_sub(2)).max(5);
    centered(width, height, frame_width, frame_height)
}

/// Largest useful scroll offset for the output popup.
pub fn output_max_scroll(text: &str, width: u16, height: u16) -> usize {
    let inner = popup_rect(width, height, 0).width.saturating_sub(2);
    let lines = wrap_text(text, usize::from(inner));
    let rect = popup_rect(width, height, lines.len());
    lines
        .len()
        .saturating_sub(usize::from(rect.height.saturating_sub(4)))
}

/// Number of entry rows the file dialog shows.
pub fn dialog_list_rows(height: u16) -> usize {
    usize::from(
        DIALOG_MAX_HEIGHT
            .min(height.saturating_sub(2))
            .saturating_sub(5)
            .max(1),
    )
}

/// Build the frame for `screen` on a `width` × `height` terminal.
pub fn compose(screen: &Screen<'_>, width: u16, height: u16) -> Frame {
    let mut frame = Frame::new(width, height);
    if width == 0 || height == 0 {
        return frame;
    }

    draw_menu_bar(&mut frame);
    draw_text_area(&mut frame, screen);

    let sep_row = height.saturating_sub(2);
    if sep_row > 0 {
        frame.hline(0, sep_row, width, '─', theme::dim());
    }
    draw_status_line(&mut frame, screen, height - 1);

    match screen.overlay {
        Overlay::None => {}
        Overlay::Dialog(dialog) => draw_dialog(&mut frame, dialog),
        Overlay::Output { text, scroll } => {
            frame.clear_cursor();
            draw_output_popup(&mut frame, text, scroll);
        }
    }
    frame
}

fn draw_menu_bar(frame: &mut Frame) {
    let width = frame.width();
    frame.fill(0, 0, width, theme::menu_bar());
    let mut col = 1;
    for (_, label, hint) in MENU {
        col += frame.put_str(col, 0, label, theme::menu_key(), u16::MAX);
        col += 1;
        col += frame.put_str(col, 0, hint, theme::menu_bar(), u16::MAX);
        col += 2;
        if col >= width {
            break;
        }
    }
}

fn draw_text_area(frame: &mut Frame, screen: &Screen<'_>) {
    let rows = text_rows(frame.height());
    let cols = usize::from(frame.width());
    let buffer = &screen.session.buffer;
    let Viewport { top, left } = screen.viewport;

    for (i, line) in buffer.lines().skip(top).take(rows).enumerate() {
        let y = u16::try_from(i + 1).unwrap_or(u16::MAX);
        let visible = visible_slice(line, left, cols, screen.tab_width);
        frame.put_str(0, y, &visible, theme::plain(), frame.width());
    }

    let (line, _) = buffer.cursor_position();
    let col = display_col(buffer.line_before_cursor(), screen.tab_width);
    if line >= top && line < top + rows && col >= left && col < left + cols {
        let x = u16::try_from(col - left).unwrap_or(u16::MAX);
        let y = u16::try_from(line - top + 1).unwrap_or(u16::MAX);
        frame.set_cursor(x, y);
    }
}

fn draw_status_line(frame: &mut Frame, screen: &Screen<'_>, y: u16) {
    let width = frame.width();
    let (text, style) = if let Some(label) = screen.busy {
        (format!("Running {label}… (Esc to cancel)"), theme::dim())
    } else if let Some(notice) = screen.notice {
        (notice.to_string(), theme::error())
    } else {
        let line = screen.session.status_line(screen.now);
        let style = match line {
            StatusLine::Error(_) => theme::error(),
            StatusLine::Message(_) => theme::success(),
            StatusLine::Editing { .. } => theme::plain(),
        };
        (line.to_string(), style)
    };
    let text = truncate_to_width(&text, usize::from(width));
    frame.put_str(0, y, &text, style, width);
}

fn draw_box(frame: &mut Frame, rect: Rect, title: &str, title_style: ContentStyle) {
    let border = theme::border();
    let right = rect.x + rect.width - 1;
    let bottom = rect.y + rect.height - 1;
    for y in rect.y..=bottom {
        frame.fill(rect.x, y, rect.width, theme::plain());
        frame.put_str(rect.x, y, "│", border, 1);
        frame.put_str(right, y, "│", border, 1);
    }
    frame.hline(rect.x + 1, rect.y, rect.width - 2, '─', border);
    frame.hline(rect.x + 1, bottom, rect.width - 2, '─', border);
    frame.put_str(rect.x, rect.y, "┌", border, 1);
    frame.put_str(right, rect.y, "┐", border, 1);
    frame.put_str(rect.x, bottom, "└", border, 1);
    frame.put_str(right, bottom, "┘", border, 1);

    let title = format!(" {title} ");
    frame.put_str(
        rect.x + 2,
        rect.y,
        &title,
        title_style,
        rect.width.saturating_sub(4),
    );
}

fn draw_divider(frame: &mut Frame, rect: Rect, y: u16) {
    let border = theme::border();
    frame.put_str(rect.x, y, "├", border, 1);
    frame.hline(rect.x + 1, y, rect.width - 2, '─', border);
    frame.put_str(rect.x + rect.width - 1, y, "┤", border, 1);
}

fn draw_output_popup(frame: &mut Frame, text: &str, scroll: usize) {
    let inner = popup_rect(frame.width(), frame.height(), 0).width.saturating_sub(2);
    let lines = wrap_text(text, usize::from(inner));
    let rect = popup_rect(frame.width(), frame.height(), lines.len());
    if rect.width < 4 || rect.height < 5 {
        return;
    }
    draw_box(frame, rect, POPUP_TITLE, theme::popup_title());

    let content_rows = usize::from(rect.height - 4);
    let scroll = scroll.min(lines.len().saturating_sub(content_rows));
    let inner_width = rect.width - 2;
    for (i, line) in lines.iter().skip(scroll).take(content_rows).enumerate() {
        let y = rect.y + 1 + u16::try_from(i).unwrap_or(0);
        frame.put_str(rect.x + 1, y, line, theme::plain(), inner_width);
    }

    let divider = rect.y + rect.height - 3;
    draw_divider(frame, rect, divider);
    let button_row = divider + 1;
    let col = rect.x + 2;
    let written = frame.put_str(col, button_row, "[ Close ]", theme::selected(), inner_width);
    let hint = if lines.len() > content_rows {
        "  Esc/Enter · ↑↓ scroll"
    } else {
        "  Esc/Enter"
    };
    frame.put_str(
        col + written,
        button_row,
        hint,
        theme::dim(),
        inner_width.saturating_sub(written + 1),
    );
}

fn draw_dialog(frame: &mut Frame, dialog: &FileDialog) {
    let list_rows = dialog_list_rows(frame.height());
    let height = u16::try_from(list_rows + 5).unwrap_or(u16::MAX);
    let width = frame.width().saturating_sub(4).min(DIALOG_MAX_WIDTH);
    let rect = centered(width, height, frame.width(), frame.height());
    if rect.width < 8 || rect.height < 6 {
        return;
    }
    draw_box(frame, rect, file_dialog::TITLE, theme::dialog_title());
    let inner_width = rect.width - 2;
    let x = rect.x + 1;

    let (header, header_style) = match dialog.error() {
        Some(err) => (err.to_string(), theme::error()),
        None => (dialog.dir().display().to_string(), theme::dim()),
    };
    frame.put_str(
        x,
        rect.y + 1,
        &truncate_to_width(&header, usize::from(inner_width)),
        header_style,
        inner_width,
    );

    let offset = dialog.selected().saturating_sub(list_rows - 1);
    for (i, entry) in dialog
        .entries()
        .iter()
        .enumerate()
        .skip(offset)
        .take(list_rows)
    {
        let y = rect.y + 2 + u16::try_from(i - offset).unwrap_or(0);
        let style = if i == dialog.selected() {
            theme::selected()
        } else if entry.kind == EntryKind::File {
            theme::plain()
        } else {
            theme::directory()
        };
        if i == dialog.selected() {
            frame.fill(x, y, inner_width, style);
        }
        frame.put_str(x + 1, y, &entry.label(), style, inner_width - 1);
    }

    let divider = rect.y + rect.height - 3;
    draw_divider(frame, rect, divider);
    let name_row = divider + 1;
    let label = "Name: ";
    let written = frame.put_str(x + 1, name_row, label, theme::dim(), inner_width - 1);
    let name_x = x + 1 + written;
    let avail = inner_width.saturating_sub(1 + written + 1);
    // Keep the end of a long name visible.
    let name = dialog.name();
    let name_width = display_col(name, 1);
    let shown: String = if name_width > usize::from(avail) {
        let mut skip = name_width - usize::from(avail);
        name.chars()
            .skip_while(|c| {
                let w = char_width(*c);
                if skip == 0 {
                    false
                } else {
                    skip = skip.saturating_sub(w);
                    true
                }
            })
            .collect()
    } else {
        name.to_string()
    };
    let written = frame.put_str(name_x, name_row, &shown, theme::plain(), avail);
    frame.set_cursor(name_x + written, name_row);
}

/// Writes composed frames to the terminal, redrawing only changed rows.
pub struct Renderer<W: Write = io::Stdout> {
    out: W,
    previous: Option<Frame>,
}

impl Renderer<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for Renderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Renderer<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            out: writer,
            previous: None,
        }
    }

    /// Force the next frame to be drawn in full (after a resize).
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn render(&mut self, frame: Frame) -> io::Result<()> {
        frame.draw(&mut self.out, self.previous.as_ref())?;
        self.previous = Some(frame);
        Ok(())
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.previous.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn session(text: &str) -> Session {
        let mut s = Session::new(PathBuf::from("a.ndp"), 1024, Duration::from_secs(1));
        s.buffer.replace(text.to_string()).unwrap();
        s
    }

    fn screen<'a>(session: &'a Session, overlay: Overlay<'a>) -> Screen<'a> {
        Screen {
            session,
            viewport: Viewport::default(),
            overlay,
            busy: None,
            notice: None,
            tab_width: 4,
            now: Instant::now(),
        }
    }

    fn body(frame: &Frame) -> String {
        (1..frame.height())
            .map(|y| frame.row_text(y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn editor_frame_layout() {
        let mut s = session("p -> q\n\tq");
        s.modified = true;
        let frame = compose(&screen(&s, Overlay::None), 30, 7);
        insta::assert_snapshot!(body(&frame), @r"
        p -> q
            q


        ──────────────────────────────
        Editing a.ndp [modified]
        ");
        assert!(frame.row_text(0).starts_with(" Open ^O"));
        assert_eq!(frame.cursor(), Some((0, 1)));
    }

    #[test]
    fn busy_status_overrides_everything() {
        let mut s = session("");
        s.set_error("Failed to write to a.ndp");
        let mut scr = screen(&s, Overlay::None);
        scr.busy = Some("Check");
        let frame = compose(&scr, 60, 6);
        assert_eq!(frame.row_text(5), "Running Check… (Esc to cancel)");
    }

    #[test]
    fn error_status_is_shown() {
        let mut s = session("");
        s.set_error("Failed to write to a.ndp");
        let frame = compose(&screen(&s, Overlay::None), 60, 6);
        assert_eq!(frame.row_text(5), "Failed to write to a.ndp");
    }

    #[test]
    fn output_popup_shows_title_and_text() {
        let s = session("");
        let overlay = Overlay::Output {
            text: "error: bad step\n  at line 2",
            scroll: 0,
        };
        let frame = compose(&screen(&s, overlay), 60, 20);
        let text = frame.text();
        assert!(text.contains(POPUP_TITLE));
        assert!(text.contains("│error: bad step"));
        assert!(text.contains("[ Close ]"));
        assert_eq!(frame.cursor(), None);
    }

    #[test]
    fn output_popup_scrolls() {
        let s = session("");
        let output: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let max = output_max_scroll(&output, 60, 20);
        assert!(max > 0);
        let overlay = Overlay::Output {
            text: &output,
            scroll: max + 10,
        };
        let frame = compose(&screen(&s, overlay), 60, 20);
        let text = frame.text();
        assert!(text.contains("line 49"));
        assert!(!text.contains("line 0\n"));
    }

    #[test]
    fn dialog_lists_entries_and_places_cursor() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("proof.ndp"), "").unwrap();
        let dialog = FileDialog::open(dir.path());
        let s = session("");
        let frame = compose(&screen(&s, Overlay::Dialog(&dialog)), 60, 20);
        let text = frame.text();
        assert!(text.contains(file_dialog::TITLE));
        assert!(text.contains("proof.ndp"));
        assert!(text.contains("Name:"));
        let (_, y) = frame.cursor().unwrap();
        assert!(frame.row_text(y).contains("Name:"));
    }

    #[test]
    fn viewport_follows_cursor() {
        let mut view = Viewport::default();
        view.follow(10, 0, 5, 80);
        assert_eq!(view.top, 6);
        view.follow(2, 0, 5, 80);
        assert_eq!(view.top, 2);
        view.follow(2, 100, 5, 80);
        assert_eq!(view.left, 21);
    }

    #[test]
    fn horizontal_scroll_slices_by_column() {
        assert_eq!(visible_slice("abcdef", 2, 3, 4), "cde");
        assert_eq!(visible_slice("漢字ab", 1, 4, 4), " 字a");
        assert_eq!(visible_slice("\tx", 2, 10, 4), "  x");
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        assert_eq!(display_col("\t", 4), 4);
        assert_eq!(display_col("ab\t", 4), 4);
        assert_eq!(display_col("abcd\t", 4), 8);
    }

    #[test]
    fn wrap_splits_long_lines() {
        assert_eq!(wrap_text("abcdef\ngh", 4), vec!["abcd", "ef", "gh"]);
        assert_eq!(wrap_text("", 4), Vec::<String>::new());
    }

    #[test]
    fn truncate_to_width_truncates_with_ellipsis() {
        assert_eq!(truncate_to_width("hello world", 8), "hello...");
        assert_eq!(truncate_to_width("hello", 5), "hello");
        assert_eq!(truncate_to_width("hello", 2), "");
        // A wide char that would straddle the cut is dropped whole.
        assert_eq!(truncate_to_width("ab日本語", 6), "ab...");
    }

    #[test]
    fn renderer_redraws_after_invalidate() {
        let s = session("abc");
        let mut renderer = Renderer::with_writer(Vec::new());
        renderer
            .render(compose(&screen(&s, Overlay::None), 20, 5))
            .unwrap();
        renderer.invalidate();
        assert!(renderer.last_frame().is_none());
        renderer
            .render(compose(&screen(&s, Overlay::None), 20, 5))
            .unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches("abc").count(), 2);
    }
}
