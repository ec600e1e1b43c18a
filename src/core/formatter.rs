//! Display formatting for entries in bb.
//!
//! Sizes, permission bits, timestamps and the escaping of non-printable
//! bytes in file names. Everything here is pure so the renderer can stay a
//! thin layer of terminal writes on top of it.

use crate::core::fm::Timestamp;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use humansize::{BINARY, FormatSizeOptions, format_size};
use unicode_width::UnicodeWidthChar;

use std::borrow::Cow;

/// Default strftime pattern for timestamp columns.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// How timestamp columns are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    Relative,
    Pattern(String),
}

impl TimeFormat {
    /// Parses a config value. Unknown strftime specifiers fall back to the
    /// default pattern, since chrono would fail while rendering them.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("relative") {
            return TimeFormat::Relative;
        }
        if s.is_empty() || StrftimeItems::new(s).any(|item| matches!(item, Item::Error)) {
            return TimeFormat::Pattern(DEFAULT_TIME_FORMAT.to_string());
        }
        TimeFormat::Pattern(s.to_string())
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat::Pattern(DEFAULT_TIME_FORMAT.to_string())
    }
}

/// A piece of a displayed name: either text that can be printed as is, or
/// the visible token standing in for one non-printable byte or character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(Cow<'a, str>),
    Escape(String),
}

/// `true` if the bytes contain invalid UTF-8 or any control character.
pub fn has_nonprintable(bytes: &[u8]) -> bool {
    bytes
        .utf8_chunks()
        .any(|chunk| !chunk.invalid().is_empty() || chunk.valid().chars().any(char::is_control))
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".into(),
        '\t' => "\\t".into(),
        '\r' => "\\r".into(),
        '\x07' => "\\a".into(),
        '\x08' => "\\b".into(),
        '\x0b' => "\\v".into(),
        '\x0c' => "\\f".into(),
        '\x1b' => "\\e".into(),
        c => format!("\\x{:02X}", c as u32),
    }
}

/// Splits raw name bytes into printable text and escape tokens.
pub fn escape_segments(bytes: &[u8]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    for chunk in bytes.utf8_chunks() {
        let valid = chunk.valid();
        let mut start = 0;
        for (i, c) in valid.char_indices() {
            if c.is_control() {
                if start < i {
                    out.push(Segment::Text(Cow::Borrowed(&valid[start..i])));
                }
                out.push(Segment::Escape(escape_char(c)));
                start = i + c.len_utf8();
            }
        }
        if start < valid.len() {
            out.push(Segment::Text(Cow::Borrowed(&valid[start..])));
        }
        for byte in chunk.invalid() {
            out.push(Segment::Escape(format!("\\x{:02X}", byte)));
        }
    }
    out
}

/// Formats a size in binary-scaled units, eg. `1.5 KiB`.
pub fn format_file_size(size: u64) -> String {
    format_size(size, FormatSizeOptions::from(BINARY).decimal_places(1))
}

/// Octal permission bits, eg. `755` or `4755`.
pub fn format_permissions(mode: u32) -> String {
    format!("{:o}", mode & 0o7777)
}

/// Age of a timestamp, `now` and `then` in seconds since the epoch.
pub fn format_relative(now: i64, then: i64) -> String {
    let delta = (now - then).max(0);
    let (n, unit) = match delta {
        d if d < MINUTE => (d, "s"),
        d if d < HOUR => (d / MINUTE, "m"),
        d if d < DAY => (d / HOUR, "h"),
        d if d < MONTH => (d / DAY, "d"),
        d if d < YEAR => (d / MONTH, "mo"),
        d => (d / YEAR, "y"),
    };
    format!("{}{} ago", n, unit)
}

/// Formats a timestamp in local time, or as an age relative to `now`.
pub fn format_time(ts: Timestamp, format: &TimeFormat, now: i64) -> String {
    match format {
        TimeFormat::Relative => format_relative(now, ts.sec),
        TimeFormat::Pattern(pattern) => {
            let nsec = u32::try_from(ts.nsec).unwrap_or(0);
            match DateTime::from_timestamp(ts.sec, nsec) {
                Some(utc) => utc.with_timezone(&Local).format(pattern).to_string(),
                None => "-".to_string(),
            }
        }
    }
}

/// Display width of a string in terminal cells.
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncates `text` to at most `width` cells. Returns the kept prefix and its width.
pub fn truncate_to_width(text: &str, width: usize) -> (&str, usize) {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            return (&text[..i], used);
        }
        used += w;
    }
    (text, used)
}

/// Truncates or pads `text` with spaces so it fills exactly `width` cells.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let (kept, used) = truncate_to_width(text, width);
    let mut out = String::with_capacity(width);
    out.push_str(kept);
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

/// Right-aligns `text` in `width` cells, truncating when it does not fit.
pub fn fit_right(text: &str, width: usize) -> String {
    let (kept, used) = truncate_to_width(text, width);
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat_n(' ', width - used));
    out.push_str(kept);
    out
}

/// Escapes backslashes and newlines so every path stays on one output line.
pub fn escape_newlines(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.iter().any(|b| *b == b'\n' || *b == b'\\') {
        return Cow::Borrowed(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len() + 8);
    for b in bytes {
        match b {
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b => out.push(*b),
        }
    }
    Cow::Owned(out)
}
