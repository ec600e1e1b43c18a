//! The general configuration settings for bb.
//!
//! This module defines the [General] struct for deserializing
//! general settings from the bb.toml configuration file
//! and the [InternalGeneral] struct for internal use within bb.

use crate::app::marks::Marks;
use crate::utils::expand_home_path;

use serde::Deserialize;

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

const TIMEOUT_RANGE: (u64, u64) = (10, 1000);
const ESCAPE_RANGE: (u64, u64) = (1, 1000);
const MAX_SCROLL_MARGIN: usize = 50;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct General {
    show_dotfiles: bool,
    interleave_dirs: bool,
    input_timeout_ms: u64,
    escape_delay_ms: u64,
    scroll_margin: usize,
    marks_file: Option<String>,
}

impl Default for General {
    fn default() -> Self {
        General {
            show_dotfiles: false,
            interleave_dirs: false,
            input_timeout_ms: 100,
            escape_delay_ms: 25,
            scroll_margin: 5,
            marks_file: None,
        }
    }
}

#[derive(Debug)]
pub struct InternalGeneral {
    show_dotfiles: bool,
    interleave_dirs: bool,
    input_timeout: Duration,
    escape_delay: Duration,
    scroll_margin: usize,
    marks_file: Option<PathBuf>,
}

impl From<General> for InternalGeneral {
    fn from(g: General) -> Self {
        let marks_file = match g.marks_file {
            Some(path) => Some(expand_home_path(OsStr::new(&path))),
            None => Marks::default_path(),
        };
        Self {
            show_dotfiles: g.show_dotfiles,
            interleave_dirs: g.interleave_dirs,
            input_timeout: Duration::from_millis(clamp_setting(
                "input_timeout_ms",
                g.input_timeout_ms,
                TIMEOUT_RANGE,
            )),
            escape_delay: Duration::from_millis(clamp_setting(
                "escape_delay_ms",
                g.escape_delay_ms,
                ESCAPE_RANGE,
            )),
            scroll_margin: clamp_setting("scroll_margin", g.scroll_margin, (0, MAX_SCROLL_MARGIN)),
            marks_file,
        }
    }
}

impl InternalGeneral {
    #[inline]
    pub fn show_dotfiles(&self) -> bool {
        self.show_dotfiles
    }

    #[inline]
    pub fn interleave_dirs(&self) -> bool {
        self.interleave_dirs
    }

    #[inline]
    pub fn input_timeout(&self) -> Duration {
        self.input_timeout
    }

    #[inline]
    pub fn escape_delay(&self) -> Duration {
        self.escape_delay
    }

    #[inline]
    pub fn scroll_margin(&self) -> usize {
        self.scroll_margin
    }

    #[inline]
    pub fn marks_file(&self) -> Option<&PathBuf> {
        self.marks_file.as_ref()
    }
}

/// Clamps a numeric setting into its range, warning when it was out of range.
fn clamp_setting<T>(name: &str, value: T, (min, max): (T, T)) -> T
where
    T: Ord + Copy + std::fmt::Display,
{
    let clamped = value.clamp(min, max);
    if clamped != value {
        eprintln!(
            "[Warning] {}={} out of range ({}..={}), clamped to {}",
            name, value, min, max, clamped
        );
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_clamped() {
        let general = InternalGeneral::from(General {
            input_timeout_ms: 5,
            escape_delay_ms: 90_000,
            scroll_margin: 400,
            ..General::default()
        });
        assert_eq!(general.input_timeout(), Duration::from_millis(10));
        assert_eq!(general.escape_delay(), Duration::from_millis(1000));
        assert_eq!(general.scroll_margin(), MAX_SCROLL_MARGIN);
    }

    #[test]
    fn marks_file_expands_home() {
        let general = InternalGeneral::from(General {
            marks_file: Some("/tmp/bb-marks.toml".into()),
            ..General::default()
        });
        assert_eq!(general.marks_file(), Some(&PathBuf::from("/tmp/bb-marks.toml")));
    }
}
