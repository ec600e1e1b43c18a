//! Helpers for bb.
//!
//! - Color parsing from strings or hex codes
//! - Expanding a leading `~` and resolving paths against the current directory
//! - Displaying home directories as "~" in file paths

use crossterm::style::Color;

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Parses a string (color name or hex) into a crossterm color.
///
/// Supports standard names (red, green, etc.) as well as hex values (#RRGGBB or #RGB).
/// Anything else falls back to the terminal default.
pub fn parse_color(s: &str) -> Color {
    match s.to_lowercase().as_str() {
        "default" | "reset" => Color::Reset,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "black" => Color::Black,
        "gray" | "grey" => Color::Grey,
        "darkgray" | "darkgrey" => Color::DarkGrey,
        "darkred" => Color::DarkRed,
        "darkgreen" => Color::DarkGreen,
        "darkyellow" => Color::DarkYellow,
        "darkblue" => Color::DarkBlue,
        "darkmagenta" => Color::DarkMagenta,
        "darkcyan" => Color::DarkCyan,
        _ => parse_hex(s).unwrap_or(Color::Reset),
    }
}

fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    let expanded = match hex.len() {
        6 => hex.to_string(),
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => return None,
    };
    let rgb = u32::from_str_radix(&expanded, 16).ok()?;
    Some(Color::Rgb {
        r: ((rgb >> 16) & 0xFF) as u8,
        g: ((rgb >> 8) & 0xFF) as u8,
        b: (rgb & 0xFF) as u8,
    })
}

pub fn get_home() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Replaces a leading `~` (alone or followed by `/`) with the home directory.
pub fn expand_home_path(value: &OsStr) -> PathBuf {
    let bytes = value.as_bytes();
    match bytes {
        [b'~'] => get_home().unwrap_or_else(|| PathBuf::from(value)),
        [b'~', b'/', rest @ ..] => match get_home() {
            Some(home) => home.join(OsStr::from_bytes(rest)),
            None => PathBuf::from(value),
        },
        _ => PathBuf::from(value),
    }
}

/// Expands `~` and joins relative paths onto `base`. The result is not
/// canonicalized.
pub fn resolve_path(value: &OsStr, base: &Path) -> PathBuf {
    let expanded = expand_home_path(value);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Shortens the home directory path to "~" for display.
pub fn shorten_home_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if let Some(home_dir) = get_home()
        && let Ok(stripped) = path.strip_prefix(&home_dir)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~{}{}", MAIN_SEPARATOR, stripped.display());
    }
    path.display().to_string()
}
