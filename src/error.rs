//! Fatal error taxonomy for bb.
//!
//! Only conditions that end the session live here. A malformed command is
//! reported as [crate::app::CommandResult::Invalid] and a malformed input
//! sequence simply decodes to no event.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("could not open directory {}: {source}", path.display())]
    OpenDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory {} produced no entries", .0.display())]
    EmptyListing(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BrowseError>;
