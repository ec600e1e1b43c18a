//! Application state and command handling for bb.
//!
//! - [state]: [BrowserState], the view, selection and display settings.
//! - [nav]: cursor and scroll movement with the scroll-off margin.
//! - [commands]: the `verb[:value]` interpreter.
//! - [cmdfile]: the command file children write commands into.
//! - [marks]: persistent single-key bookmarks.
//! - [keymap]: key and mouse bindings.

pub mod cmdfile;
pub mod commands;
pub mod keymap;
pub mod marks;
pub mod nav;
pub mod state;

pub use cmdfile::CommandFile;
pub use commands::{CommandResult, run_command};
pub use keymap::Keymap;
pub use state::{BrowserSettings, BrowserState};
