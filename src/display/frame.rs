//! Off-screen cell grid.
//!
//! Each redraw composes a whole [`Frame`] and then writes only the rows that
//! differ from the previously drawn one.

use std::io::{self, Write};

use crossterm::style::{ContentStyle, Print, PrintStyledContent};
use crossterm::{cursor, queue};
use unicode_width::UnicodeWidthChar;

/// Marks the second column of a double-width character.
const CONTINUATION: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    symbol: char,
    style: ContentStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            symbol: ' ',
            style: ContentStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    cursor: Option<(u16, u16)>,
}

/// Display width of `c`. Control characters take one column (they are drawn
/// as spaces); zero-width characters are dropped.
pub fn char_width(c: char) -> usize {
    if c.is_control() {
        1
    } else {
        c.width().unwrap_or(0)
    }
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
            cursor: None,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    pub fn set_cursor(&mut self, x: u16, y: u16) {
        if x < self.width && y < self.height {
            self.cursor = Some((x, y));
        }
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Write `text` starting at `(x, y)`, clipped to `max_width` columns and
    /// the frame edge. Returns the number of columns written.
    pub fn put_str(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        style: ContentStyle,
        max_width: u16,
    ) -> u16 {
        if y >= self.height {
            return 0;
        }
        let limit = self.width.min(x.saturating_add(max_width));
        let mut col = x;
        for c in text.chars() {
            let w = char_width(c);
            if w == 0 {
                continue;
            }
            // w is 1 or 2
            let w = u16::try_from(w).unwrap_or(1);
            if col + w > limit {
                break;
            }
            let symbol = if c.is_control() { ' ' } else { c };
            self.set(col, y, Cell { symbol, style });
            if w == 2 {
                self.set(
                    col + 1,
                    y,
                    Cell {
                        symbol: CONTINUATION,
                        style,
                    },
                );
            }
            col += w;
        }
        col - x
    }

    /// Paint `width` cells of row `y` from `x` with spaces in `style`.
    pub fn fill(&mut self, x: u16, y: u16, width: u16, style: ContentStyle) {
        let end = self.width.min(x.saturating_add(width));
        for col in x..end {
            self.set(col, y, Cell { symbol: ' ', style });
        }
    }

    /// Repeat `symbol` across `width` cells.
    pub fn hline(&mut self, x: u16, y: u16, width: u16, symbol: char, style: ContentStyle) {
        let end = self.width.min(x.saturating_add(width));
        for col in x..end {
            self.set(col, y, Cell { symbol, style });
        }
    }

    fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x < self.width && y < self.height {
            let idx = usize::from(y) * usize::from(self.width) + usize::from(x);
            self.cells[idx] = cell;
        }
    }

    fn row(&self, y: u16) -> &[Cell] {
        let w = usize::from(self.width);
        let start = usize::from(y) * w;
        &self.cells[start..start + w]
    }

    /// Plain text of row `y`, trailing spaces trimmed.
    pub fn row_text(&self, y: u16) -> String {
        let text: String = self
            .row(y)
            .iter()
            .filter(|c| c.symbol != CONTINUATION)
            .map(|c| c.symbol)
            .collect();
        text.trim_end().to_string()
    }

    /// Plain text of the whole frame, one line per row.
    pub fn text(&self) -> String {
        (0..self.height)
            .map(|y| self.row_text(y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write the frame to `out`, skipping rows identical in `previous`.
    pub fn draw<W: Write>(&self, out: &mut W, previous: Option<&Frame>) -> io::Result<()> {
        let previous = previous.filter(|p| p.width == self.width && p.height == self.height);
        queue!(out, cursor::Hide)?;
        for y in 0..self.height {
            let row = self.row(y);
            if previous.is_some_and(|p| p.row(y) == row) {
                continue;
            }
            queue!(out, cursor::MoveTo(0, y))?;
            let mut run = String::new();
            let mut run_style = row.first().map(|c| c.style).unwrap_or_default();
            for cell in row {
                if cell.symbol == CONTINUATION {
                    continue;
                }
                if cell.style != run_style {
                    flush_run(out, &mut run, run_style)?;
                    run_style = cell.style;
                }
                run.push(cell.symbol);
            }
            flush_run(out, &mut run, run_style)?;
        }
        if let Some((x, y)) = self.cursor {
            queue!(out, cursor::MoveTo(x, y), cursor::Show)?;
        }
        out.flush()
    }
}

fn flush_run<W: Write>(out: &mut W, run: &mut String, style: ContentStyle) -> io::Result<()> {
    if run.is_empty() {
        return Ok(());
    }
    if style == ContentStyle::default() {
        queue!(out, Print(&run))?;
    } else {
        queue!(out, PrintStyledContent(style.apply(run.as_str())))?;
    }
    run.clear();
    Ok(())
}
