//! Miscellaneous utility functions for bb.
//!
//! [helpers] holds color parsing and path helpers, [cli] the command line.

pub mod cli;
pub mod helpers;

pub use helpers::{expand_home_path, get_home, parse_color, resolve_path, shorten_home_path};
