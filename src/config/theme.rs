//! Theme configuration options for bb
//!
//! This module defines the colors read from the `[theme]` table of bb.toml.
//! # Examples
//! ```toml
//! [theme]
//! directory = "blue"
//! symlink = "#00afaf"
//! [theme.cursor]
//! fg = "black"
//! bg = "white"
//! ```

use crate::utils::parse_color;

use crossterm::style::Color;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "deserialize_color_field")]
    directory: Color,
    #[serde(deserialize_with = "deserialize_color_field")]
    symlink: Color,
    #[serde(deserialize_with = "deserialize_color_field")]
    executable: Color,
    #[serde(deserialize_with = "deserialize_color_field")]
    escape: Color,
    #[serde(deserialize_with = "deserialize_color_field")]
    marker: Color,
    cursor: ColorPair,
    path: ColorPair,
    header: ColorPair,
    footer: ColorPair,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            directory: Color::Blue,
            symlink: Color::Cyan,
            executable: Color::Green,
            escape: Color::Red,
            marker: Color::Yellow,
            cursor: ColorPair {
                fg: Color::Black,
                bg: Color::Grey,
            },
            path: ColorPair {
                fg: Color::Magenta,
                ..ColorPair::default()
            },
            header: ColorPair {
                fg: Color::Yellow,
                ..ColorPair::default()
            },
            footer: ColorPair {
                fg: Color::DarkGrey,
                ..ColorPair::default()
            },
        }
    }
}

impl Theme {
    #[inline]
    pub fn directory(&self) -> Color {
        self.directory
    }

    #[inline]
    pub fn symlink(&self) -> Color {
        self.symlink
    }

    #[inline]
    pub fn executable(&self) -> Color {
        self.executable
    }

    #[inline]
    pub fn escape(&self) -> Color {
        self.escape
    }

    #[inline]
    pub fn marker(&self) -> Color {
        self.marker
    }

    #[inline]
    pub fn cursor(&self) -> ColorPair {
        self.cursor
    }

    #[inline]
    pub fn path(&self) -> ColorPair {
        self.path
    }

    #[inline]
    pub fn header(&self) -> ColorPair {
        self.header
    }

    #[inline]
    pub fn footer(&self) -> ColorPair {
        self.footer
    }
}

/// A foreground/background pair. `Reset` leaves the terminal default.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    #[serde(default = "reset_color", deserialize_with = "deserialize_color_field")]
    pub fg: Color,
    #[serde(default = "reset_color", deserialize_with = "deserialize_color_field")]
    pub bg: Color,
}

impl Default for ColorPair {
    fn default() -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
        }
    }
}

fn reset_color() -> Color {
    Color::Reset
}

fn deserialize_color_field<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(parse_color(&s))
}
