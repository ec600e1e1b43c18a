//! The command file through which child processes drive the browser.
//!
//! The file is an append-only list of NUL-terminated command strings. Its
//! path is handed to children in [CMD_ENV]; `bb +cmd` run from a child
//! appends to it with [append]. The browser drains it between input cycles
//! and after every child exits, resuming from where it last stopped.

use crate::app::commands::{CommandResult, run_command};
use crate::app::state::BrowserState;

use tempfile::TempDir;

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Environment variable holding the command file path.
pub const CMD_ENV: &str = "BBCMD";

#[derive(Debug)]
pub struct CommandFile {
    path: PathBuf,
    offset: u64,
    _dir: Option<TempDir>,
}

impl CommandFile {
    /// Command file in a fresh private directory, removed on drop.
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("bb.").tempdir()?;
        Ok(CommandFile {
            path: dir.path().join("cmd"),
            offset: 0,
            _dir: Some(dir),
        })
    }

    /// Command file at a fixed path.
    pub fn at(path: PathBuf) -> Self {
        CommandFile {
            path,
            offset: 0,
            _dir: None,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Runs every complete command appended since the last drain.
    ///
    /// Stops right after a command that needs a refresh or quits and returns
    /// that result; the rest is picked up by the next drain. Once everything
    /// is consumed the file is deleted and the offset starts over. A trailing
    /// command without its NUL stays in the file for later.
    pub fn drain(&mut self, state: &mut BrowserState) -> io::Result<CommandResult> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CommandResult::NoOp),
            Err(e) => return Err(e),
        };
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        drop(file);

        let mut outcome = CommandResult::NoOp;
        let mut consumed = 0;
        let mut count = 0usize;
        while let Some(len) = buf[consumed..].iter().position(|b| *b == 0) {
            let cmd = OsStr::from_bytes(&buf[consumed..consumed + len]);
            consumed += len + 1;
            if cmd.is_empty() {
                continue;
            }
            count += 1;
            match run_command(state, cmd) {
                result @ (CommandResult::Refresh | CommandResult::Quit) => {
                    self.offset += consumed as u64;
                    tracing::debug!(count, ?result, "command file interrupted");
                    return Ok(result);
                }
                CommandResult::Dirty => outcome = CommandResult::Dirty,
                CommandResult::NoOp | CommandResult::Invalid => {}
            }
        }

        self.offset += consumed as u64;
        if consumed == buf.len() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            self.offset = 0;
        }
        if count > 0 {
            tracing::debug!(count, "command file drained");
        }
        Ok(outcome)
    }
}

/// Appends NUL-terminated commands to the command file at `path`.
pub fn append<S: AsRef<OsStr>>(path: &Path, commands: &[S]) -> io::Result<()> {
    let mut buf = Vec::new();
    for cmd in commands {
        buf.extend_from_slice(cmd.as_ref().as_bytes());
        buf.push(0);
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::BrowserSettings;
    use std::fs::File;
    use tempfile::tempdir;

    fn setup() -> Result<(TempDir, BrowserState, CommandFile), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        for name in ["a", "b", "c"] {
            File::create(tmp.path().join(name))?;
        }
        fs::create_dir(tmp.path().join("sub"))?;
        let state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        let cmds = CommandFile::at(tmp.path().join("cmd"));
        Ok((tmp, state, cmds))
    }

    #[test]
    fn missing_file_is_noop() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state, mut cmds) = setup()?;
        assert_eq!(cmds.drain(&mut state)?, CommandResult::NoOp);
        Ok(())
    }

    #[test]
    fn commands_run_in_order_and_file_is_removed() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state, mut cmds) = setup()?;
        append(cmds.path(), &["select:a", "select:c", "move:+1"])?;

        assert_eq!(cmds.drain(&mut state)?, CommandResult::Dirty);
        assert_eq!(state.store().selection_len(), 2);
        assert_eq!(state.cursor(), 1);
        assert!(!cmds.path().exists());
        assert_eq!(cmds.offset(), 0);
        Ok(())
    }

    #[test]
    fn refresh_interrupts_and_resumes() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state, mut cmds) = setup()?;
        append(cmds.path(), &["cd:sub", "select:x"])?;

        assert_eq!(cmds.drain(&mut state)?, CommandResult::Refresh);
        assert_eq!(cmds.offset(), "cd:sub\0".len() as u64);
        assert!(cmds.path().exists());

        state.populate()?;
        assert!(state.path().ends_with("sub"));
        assert_eq!(cmds.drain(&mut state)?, CommandResult::NoOp);
        assert!(!cmds.path().exists());
        Ok(())
    }

    #[test]
    fn partial_command_waits_for_terminator() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state, mut cmds) = setup()?;
        fs::write(cmds.path(), b"select:a\0select:b")?;

        cmds.drain(&mut state)?;
        assert_eq!(state.store().selection_len(), 1);
        assert!(cmds.path().exists());
        assert_eq!(cmds.offset(), "select:a\0".len() as u64);

        let mut file = OpenOptions::new().append(true).open(cmds.path())?;
        file.write_all(b"\0")?;
        cmds.drain(&mut state)?;
        assert_eq!(state.store().selection_len(), 2);
        assert!(!cmds.path().exists());
        Ok(())
    }

    #[test]
    fn quit_stops_the_drain() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state, mut cmds) = setup()?;
        append(cmds.path(), &["quit", "select:a"])?;
        assert_eq!(cmds.drain(&mut state)?, CommandResult::Quit);
        assert_eq!(state.store().selection_len(), 0);
        Ok(())
    }

    #[test]
    fn created_file_lives_in_private_dir() -> Result<(), Box<dyn std::error::Error>> {
        let cmds = CommandFile::create()?;
        let dir = cmds.path().parent().ok_or("no parent")?.to_path_buf();
        assert!(dir.is_dir());
        drop(cmds);
        assert!(!dir.exists());
        Ok(())
    }
}
