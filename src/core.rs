//! Core runtime logic for bb.
//!
//! This module contains the non-UI "engine" pieces used by the application:
//! - [fm]: entries, the entry arena and directory listing.
//! - [sort]: sort specifications and the entry comparator.
//! - [formatter]: size, permission and time formatting, name escaping.
//! - [input]: raw terminal input decoding.
//! - [signals]: signal delivery through a self-pipe.
//! - [proc]: running bound scripts with the selection.
//! - [terminal]: terminal session and the main event loop.

pub mod fm;
pub mod formatter;
pub mod input;
pub mod proc;
pub mod signals;
pub mod sort;
pub mod terminal;

pub use fm::{Entry, EntryId, EntryStore, list_dir};
pub use sort::{SortMethod, SortSpec};
