//! Child process supervision for bb.
//!
//! Scripts bound to keys run through `sh -c` with the selection as their
//! positional arguments (the cursor entry when nothing is selected). The
//! environment tells them where they are and how to talk back:
//!
//! | Variable       | Value                                        |
//! |----------------|----------------------------------------------|
//! | `BBCURSOR`     | name of the entry under the cursor           |
//! | `BBFULLCURSOR` | full path of the entry under the cursor      |
//! | `BBCMD`        | path of the command file                     |
//! | `BBDEPTH`      | nesting depth, one more than the parent's    |
//! | `BB`           | path of the running `bb` executable          |
//!
//! The child gets the terminal as its stdio and the browser blocks until it
//! exits. Terminal mode switching around the child is done by the caller.

use crate::app::cmdfile::CMD_ENV;
use crate::app::state::BrowserState;

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

pub const CURSOR_ENV: &str = "BBCURSOR";
pub const FULL_CURSOR_ENV: &str = "BBFULLCURSOR";
pub const DEPTH_ENV: &str = "BBDEPTH";
pub const EXE_ENV: &str = "BB";

const SHELL: &str = "sh";
/// `$0` of the script.
const SCRIPT_NAME: &str = "bb";

/// Nesting depth of this process, read from the environment.
pub fn current_depth() -> u32 {
    std::env::var(DEPTH_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    cmd_path: PathBuf,
    depth: u32,
    exe: Option<PathBuf>,
}

impl Supervisor {
    pub fn new(cmd_path: &Path) -> Self {
        Supervisor {
            cmd_path: cmd_path.to_path_buf(),
            depth: current_depth(),
            exe: std::env::current_exe().ok(),
        }
    }

    /// Arguments for a script: the selection, or the cursor entry.
    fn arguments(state: &BrowserState) -> Vec<OsString> {
        let selection = state.selection_paths();
        if !selection.is_empty() {
            return selection.into_iter().map(PathBuf::into_os_string).collect();
        }
        state
            .cursor_entry()
            .map(|e| vec![e.path().as_os_str().to_os_string()])
            .unwrap_or_default()
    }

    /// The command for `script`, with its environment and working directory
    /// set. `tty` becomes stdin, stdout and stderr when given.
    pub fn build_command(
        &self,
        script: &str,
        state: &BrowserState,
        tty: Option<&File>,
    ) -> io::Result<Command> {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(script)
            .arg(SCRIPT_NAME)
            .args(Self::arguments(state))
            .current_dir(state.path())
            .env(CMD_ENV, &self.cmd_path)
            .env(DEPTH_ENV, (self.depth + 1).to_string());

        if let Some(entry) = state.cursor_entry() {
            cmd.env(CURSOR_ENV, entry.name())
                .env(FULL_CURSOR_ENV, entry.path());
        }
        if let Some(exe) = &self.exe {
            cmd.env(EXE_ENV, exe);
        }
        if let Some(tty) = tty {
            cmd.stdin(Stdio::from(tty.try_clone()?))
                .stdout(Stdio::from(tty.try_clone()?))
                .stderr(Stdio::from(tty.try_clone()?));
        }
        Ok(cmd)
    }

    /// Runs `script` in the foreground and waits for it.
    pub fn run(
        &self,
        script: &str,
        state: &BrowserState,
        tty: Option<&File>,
    ) -> io::Result<ExitStatus> {
        let mut cmd = self.build_command(script, state, tty)?;
        tracing::info!(script, dir = %state.path().display(), "spawning child");
        let status = cmd.spawn()?.wait()?;
        if status.success() {
            tracing::debug!(%status, "child exited");
        } else {
            tracing::warn!(%status, "child failed");
        }
        Ok(status)
    }
}
