//! Incremental renderer for bb.
//!
//! Screen layout, top to bottom: the tab line (current path and selection
//! count), the column header, one row per visible entry, and the footer.
//!
//! [Renderer] remembers the cursor and scroll it last drew. When only those
//! moved it shifts the list with a scroll region and repaints just the rows
//! that changed (see [lazy_rows]); anything structural repaints everything.
//!
//! All output is queued with crossterm commands and flushed once per frame.

use crate::app::state::BrowserState;
use crate::config::display::InternalDisplay;
use crate::config::theme::{ColorPair, Theme};
use crate::core::fm::Entry;
use crate::core::formatter::{
    Segment, TimeFormat, display_width, escape_segments, fit_right, fit_to_width,
    format_file_size, format_permissions, format_time, truncate_to_width,
};
use crate::core::sort::SortMethod;
use crate::ui::columns::{Cell, Column, GUTTER, Layout};
use crate::utils::helpers::shorten_home_path;

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, ScrollDown, ScrollUp};
use crossterm::{Command, cursor::MoveTo, queue};

use std::fmt;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;

/// Rows above the list: tab line and column header.
pub const HEADER_ROWS: u16 = 2;
/// Rows below the list: the footer.
pub const FOOTER_ROWS: u16 = 1;

const MARKER: &str = "*";
const RELATIVE_TIME_WIDTH: usize = 8;
const ASCENDING: &str = "▲";
const DESCENDING: &str = "▼";

/// Number of list rows that fit in a terminal of `rows` lines.
pub fn viewport_height(rows: u16) -> usize {
    usize::from(rows.saturating_sub(HEADER_ROWS + FOOTER_ROWS)).max(1)
}

/// Sets the scrolling region to the 1-based rows `top..=bottom` (DECSTBM).
#[derive(Debug, Clone, Copy)]
struct SetScrollRegion(u16, u16);

impl Command for SetScrollRegion {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[{};{}r", self.0, self.1)
    }
}

/// Restores the full-screen scrolling region.
#[derive(Debug, Clone, Copy)]
struct ResetScrollRegion;

impl Command for ResetScrollRegion {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[r")
    }
}

/// Position the renderer last drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    cursor: usize,
    scroll: usize,
}

/// View indices a lazy redraw must repaint after moving from
/// `prev_cursor`/`prev_scroll` to `cursor`/`scroll`, given `height` list
/// rows: the rows that scrolled into view plus the old and new cursor rows.
/// The result is sorted and only holds rows that are on screen.
pub fn lazy_rows(
    prev_cursor: usize,
    prev_scroll: usize,
    cursor: usize,
    scroll: usize,
    height: usize,
) -> Vec<usize> {
    let visible = scroll..scroll + height;
    let shift = scroll.abs_diff(prev_scroll);
    let mut rows: Vec<usize> = if shift >= height {
        visible.clone().collect()
    } else if scroll > prev_scroll {
        (scroll + height - shift..scroll + height).collect()
    } else {
        (scroll..scroll + shift).collect()
    };
    rows.extend([prev_cursor, cursor].into_iter().filter(|i| visible.contains(i)));
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Width of the timestamp columns for the configured format.
pub fn time_width(format: &TimeFormat, now: i64) -> usize {
    match format {
        TimeFormat::Relative => RELATIVE_TIME_WIDTH,
        TimeFormat::Pattern(_) => {
            let ts = crate::core::fm::Timestamp { sec: now, nsec: 0 };
            display_width(&format_time(ts, format, now))
        }
    }
}

/// Colored piece of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub fg: Color,
}

impl Span {
    fn new(text: impl Into<String>, fg: Color) -> Self {
        Span {
            text: text.into(),
            fg,
        }
    }
}

/// Appends text, joining it onto the previous span when the color matches.
fn push_span(spans: &mut Vec<Span>, text: &str, fg: Color) {
    match spans.last_mut() {
        Some(last) if last.fg == fg => last.text.push_str(text),
        _ => spans.push(Span::new(text, fg)),
    }
}

fn push_escaped(spans: &mut Vec<Span>, bytes: &[u8], fg: Color, escape: Color) {
    for segment in escape_segments(bytes) {
        match segment {
            Segment::Text(text) => push_span(spans, &text, fg),
            Segment::Escape(token) => spans.push(Span::new(token, escape)),
        }
    }
}

/// Name cell of an entry: colored by type, non-printable bytes shown as
/// escape tokens, `/` after directories and ` -> target` after symlinks.
pub fn name_spans(entry: &Entry, theme: &Theme) -> Vec<Span> {
    let fg = if entry.is_symlink() {
        theme.symlink()
    } else if entry.is_dir() {
        theme.directory()
    } else if entry.is_executable() {
        theme.executable()
    } else {
        Color::Reset
    };

    let mut spans = Vec::new();
    push_escaped(&mut spans, entry.name().as_bytes(), fg, theme.escape());
    if entry.is_dir() {
        push_span(&mut spans, "/", fg);
    }
    if let Some(target) = entry.link_target() {
        push_span(&mut spans, " -> ", Color::Reset);
        push_escaped(
            &mut spans,
            target.as_os_str().as_bytes(),
            Color::Reset,
            theme.escape(),
        );
    }
    spans
}

/// Text of a secondary column.
pub fn column_text(entry: &Entry, column: Column, time_format: &TimeFormat, now: i64) -> String {
    if entry.is_parent_ref() && column != Column::Name {
        return String::new();
    }
    let stat = entry.stat();
    match column {
        Column::Name => entry.name().to_string_lossy().into_owned(),
        Column::Size => format_file_size(stat.size),
        Column::Permissions => format_permissions(stat.mode),
        Column::ModifyTime => format_time(stat.mtime, time_format, now),
        Column::ChangeTime => format_time(stat.ctime, time_format, now),
        Column::AccessTime => format_time(stat.atime, time_format, now),
        Column::Rank => match entry.shuffle_rank() {
            0 => "-".to_string(),
            rank => rank.to_string(),
        },
    }
}

fn header_text(column: Column, sort: SortMethod, reverse: bool, primary: bool) -> String {
    if !primary || column.sort_method() != sort {
        return column.title().to_string();
    }
    let arrow = if reverse { DESCENDING } else { ASCENDING };
    format!("{}{}", column.title(), arrow)
}

/// Draws a [BrowserState] onto a terminal.
#[derive(Debug)]
pub struct Renderer {
    width: u16,
    height: u16,
    layout: Layout,
    last: Option<Frame>,
}

impl Renderer {
    pub fn new(width: u16, height: u16) -> Self {
        Renderer {
            width,
            height,
            layout: Layout::default(),
            last: None,
        }
    }

    /// New terminal size. The next draw repaints everything.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.last = None;
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn viewport_height(&self) -> usize {
        viewport_height(self.height)
    }

    /// Draws one frame. Lazy unless the state asked for a full redraw or
    /// nothing has been drawn since the last resize.
    pub fn draw<W: Write>(
        &mut self,
        out: &mut W,
        state: &mut BrowserState,
        theme: &Theme,
        display: &InternalDisplay,
    ) -> io::Result<()> {
        let now = chrono::Local::now().timestamp();
        let full = state.take_full_redraw();
        let current = Frame {
            cursor: state.cursor(),
            scroll: state.scroll(),
        };

        match self.last {
            Some(prev) if !full => self.draw_lazy(out, state, theme, display, prev, now)?,
            _ => self.draw_full(out, state, theme, display, now)?,
        }
        self.draw_tab_line(out, state, theme)?;
        self.draw_footer(out, theme, display)?;
        queue!(out, ResetColor)?;
        out.flush()?;
        self.last = Some(current);
        Ok(())
    }

    fn draw_full<W: Write>(
        &mut self,
        out: &mut W,
        state: &BrowserState,
        theme: &Theme,
        display: &InternalDisplay,
        now: i64,
    ) -> io::Result<()> {
        self.layout = Layout::compute(
            state.columns(),
            usize::from(self.width),
            time_width(display.time_format(), now),
        );
        queue!(out, ResetColor, Clear(ClearType::All))?;
        self.draw_header(out, state, theme)?;
        let scroll = state.scroll();
        for i in scroll..scroll + self.viewport_height() {
            self.draw_row(out, state, theme, display, i, now)?;
        }
        Ok(())
    }

    fn draw_lazy<W: Write>(
        &mut self,
        out: &mut W,
        state: &BrowserState,
        theme: &Theme,
        display: &InternalDisplay,
        prev: Frame,
        now: i64,
    ) -> io::Result<()> {
        let height = self.viewport_height();
        let scroll = state.scroll();
        let shift = scroll.abs_diff(prev.scroll);
        if shift > 0 && shift < height {
            let top = HEADER_ROWS + 1;
            let bottom = HEADER_ROWS + height as u16;
            let n = shift as u16;
            queue!(out, ResetColor, SetScrollRegion(top, bottom))?;
            if scroll > prev.scroll {
                queue!(out, ScrollUp(n))?;
            } else {
                queue!(out, ScrollDown(n))?;
            }
            queue!(out, ResetScrollRegion)?;
        }
        for i in lazy_rows(prev.cursor, prev.scroll, state.cursor(), scroll, height) {
            self.draw_row(out, state, theme, display, i, now)?;
        }
        Ok(())
    }

    fn draw_tab_line<W: Write>(
        &self,
        out: &mut W,
        state: &BrowserState,
        theme: &Theme,
    ) -> io::Result<()> {
        let width = usize::from(self.width);
        let path = shorten_home_path(state.path());
        let selected = state.store().selection_len();
        let count = if selected > 0 {
            format!(" [{} selected]", selected)
        } else {
            String::new()
        };
        let path_width = width.saturating_sub(display_width(&count));
        let pair = theme.path();
        queue!(
            out,
            MoveTo(0, 0),
            SetForegroundColor(pair.fg),
            SetBackgroundColor(pair.bg),
            Print(fit_to_width(&path, path_width)),
            SetForegroundColor(theme.marker()),
            Print(fit_to_width(&count, width - path_width)),
            ResetColor
        )
    }

    fn draw_header<W: Write>(
        &self,
        out: &mut W,
        state: &BrowserState,
        theme: &Theme,
    ) -> io::Result<()> {
        let primary = state.sort().primary();
        let pair = theme.header();
        queue!(
            out,
            MoveTo(0, 1),
            SetForegroundColor(pair.fg),
            SetBackgroundColor(pair.bg),
            Clear(ClearType::CurrentLine)
        )?;
        let mut shown = false;
        for cell in self.layout.cells() {
            // Only the first column of the primary method carries the arrow.
            let is_primary = !shown && cell.column.sort_method() == primary.method;
            shown |= is_primary;
            let title = header_text(cell.column, primary.method, primary.reverse, is_primary);
            queue!(
                out,
                MoveTo(cell.x as u16, 1),
                Print(fit_to_width(&title, cell.width))
            )?;
        }
        queue!(out, ResetColor)
    }

    fn draw_footer<W: Write>(
        &self,
        out: &mut W,
        theme: &Theme,
        display: &InternalDisplay,
    ) -> io::Result<()> {
        let pair = theme.footer();
        queue!(
            out,
            MoveTo(0, self.height.saturating_sub(1)),
            SetForegroundColor(pair.fg),
            SetBackgroundColor(pair.bg),
            Print(fit_to_width(display.footer(), usize::from(self.width))),
            ResetColor
        )
    }

    fn draw_row<W: Write>(
        &self,
        out: &mut W,
        state: &BrowserState,
        theme: &Theme,
        display: &InternalDisplay,
        i: usize,
        now: i64,
    ) -> io::Result<()> {
        let Some(row) = i.checked_sub(state.scroll()) else {
            return Ok(());
        };
        if row >= self.viewport_height() {
            return Ok(());
        }
        let y = HEADER_ROWS + row as u16;
        queue!(out, MoveTo(0, y), ResetColor, Clear(ClearType::CurrentLine))?;
        let Some(entry) = state.entry_at(i) else {
            return Ok(());
        };

        let is_cursor = i == state.cursor();
        let cursor_pair = theme.cursor();
        if is_cursor {
            queue!(
                out,
                SetForegroundColor(cursor_pair.fg),
                SetBackgroundColor(cursor_pair.bg),
                Print(" ".repeat(usize::from(self.width)))
            )?;
        }

        let marker = if state.is_selected_at(i) { MARKER } else { " " };
        queue!(
            out,
            MoveTo(0, y),
            SetForegroundColor(theme.marker()),
            Print(fit_to_width(marker, GUTTER))
        )?;

        let row_pair = if is_cursor {
            Some(cursor_pair)
        } else {
            None
        };
        for cell in self.layout.cells() {
            queue!(out, MoveTo(cell.x as u16, y))?;
            match cell.column {
                Column::Name => {
                    write_spans(out, &name_spans(entry, theme), cell, row_pair, theme.escape())?
                }
                column => {
                    let text = column_text(entry, column, display.time_format(), now);
                    let fg = row_pair.map_or(Color::Reset, |p| p.fg);
                    queue!(out, SetForegroundColor(fg), Print(fit_right(&text, cell.width)))?;
                }
            }
        }
        queue!(out, ResetColor)
    }
}

/// Writes spans into a cell, cutting them off at the cell width. On the
/// cursor row everything but escape tokens takes the cursor color.
fn write_spans<W: Write>(
    out: &mut W,
    spans: &[Span],
    cell: &Cell,
    row_pair: Option<ColorPair>,
    escape: Color,
) -> io::Result<()> {
    let mut left = cell.width;
    for span in spans {
        if left == 0 {
            break;
        }
        let fg = match row_pair {
            Some(pair) if span.fg != escape => pair.fg,
            _ => span.fg,
        };
        let (text, used) = truncate_to_width(&span.text, left);
        queue!(out, SetForegroundColor(fg), Print(text))?;
        left -= used;
    }
    Ok(())
}
