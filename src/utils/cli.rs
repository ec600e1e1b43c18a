//! Command-line argument parsing and help for bb.
//!
//! `bb [OPTIONS] [PATH] [+COMMAND...]` opens the browser. Arguments starting
//! with `+` are commands: inside a child of a running bb (`BBCMD` set) they
//! are appended to its command file and bb exits at once, otherwise they run
//! right after the first directory listing.

use crate::app::cmdfile::{self, CMD_ENV};
use crate::config::Config;
use crate::core::formatter::escape_newlines;

use std::ffi::OsString;
use std::io::{self, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// How selected paths are terminated on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Newline,
    Nul,
}

impl Separator {
    fn byte(self) -> u8 {
        match self {
            Separator::Newline => b'\n',
            Separator::Nul => 0,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub path: Option<PathBuf>,
    /// Print the selection on exit, terminated this way.
    pub output: Option<Separator>,
    pub escape: bool,
    /// Print the final directory on exit.
    pub print_dir: bool,
    pub commands: Vec<OsString>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedArgs {
    Run(RunOptions),
    Init,
    Help,
    Version,
}

pub enum CliAction {
    Run(RunOptions),
    Exit(i32),
}

/// Parses arguments, without the program name.
pub fn parse_args<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut opts = RunOptions::default();
    let mut only_paths = false;
    for arg in args {
        let bytes = arg.as_bytes();
        if only_paths || bytes == b"-" || !bytes.starts_with(b"-") {
            if !only_paths && bytes.starts_with(b"+") && bytes.len() > 1 {
                opts.commands.push(OsString::from_vec(bytes[1..].to_vec()));
                continue;
            }
            if opts.path.is_some() {
                return Err("only one PATH may be given".into());
            }
            opts.path = Some(PathBuf::from(arg));
            continue;
        }
        match bytes {
            b"--" => only_paths = true,
            b"--help" => return Ok(ParsedArgs::Help),
            b"--version" => return Ok(ParsedArgs::Version),
            b"--init" => return Ok(ParsedArgs::Init),
            b"--print-selection" => opts.output = Some(Separator::Newline),
            b"--null" => opts.output = Some(Separator::Nul),
            b"--escape" => opts.escape = true,
            b"--print-dir" => opts.print_dir = true,
            long if long.starts_with(b"--") => {
                return Err(format!("unknown option {}", arg.to_string_lossy()));
            }
            short => {
                for &flag in &short[1..] {
                    match flag {
                        b's' => opts.output = Some(Separator::Newline),
                        b'0' => opts.output = Some(Separator::Nul),
                        b'e' => opts.escape = true,
                        b'd' => opts.print_dir = true,
                        b'h' => return Ok(ParsedArgs::Help),
                        b'v' => return Ok(ParsedArgs::Version),
                        other => return Err(format!("unknown option -{}", other as char)),
                    }
                }
            }
        }
    }
    Ok(ParsedArgs::Run(opts))
}

pub fn handle_args() -> CliAction {
    match parse_args(std::env::args_os().skip(1)) {
        Ok(ParsedArgs::Run(opts)) => match std::env::var_os(CMD_ENV) {
            Some(path) if !opts.commands.is_empty() && opts.path.is_none() => {
                send_commands(Path::new(&path), &opts.commands)
            }
            _ => CliAction::Run(opts),
        },
        Ok(ParsedArgs::Help) => {
            print_help();
            CliAction::Exit(0)
        }
        Ok(ParsedArgs::Version) => {
            print_version();
            CliAction::Exit(0)
        }
        Ok(ParsedArgs::Init) => match Config::generate_default(&Config::default_path()) {
            Ok(()) => CliAction::Exit(0),
            Err(e) => {
                eprintln!("Error: {}", e);
                CliAction::Exit(1)
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Try --help for available options");
            CliAction::Exit(1)
        }
    }
}

fn send_commands(path: &Path, commands: &[OsString]) -> CliAction {
    match cmdfile::append(path, commands) {
        Ok(()) => CliAction::Exit(0),
        Err(e) => {
            eprintln!("Error: could not write to {}: {}", path.display(), e);
            CliAction::Exit(1)
        }
    }
}

/// Writes paths one per separator, escaping backslashes and newlines when
/// asked so every path stays on a single line.
pub fn write_paths<W: Write>(
    out: &mut W,
    paths: &[PathBuf],
    separator: Separator,
    escape: bool,
) -> io::Result<()> {
    for path in paths {
        let bytes = path.as_os_str().as_bytes();
        if escape {
            out.write_all(&escape_newlines(bytes))?;
        } else {
            out.write_all(bytes)?;
        }
        out.write_all(&[separator.byte()])?;
    }
    out.flush()
}

fn print_version() {
    println!("bb {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!(
        r#"bb - A terminal file browser that scripts can drive

USAGE:
  bb [OPTIONS] [PATH] [+COMMAND...]

PATH:
  Directory to open (defaults to current directory)

OPTIONS:
  -s, --print-selection   Print the selected paths on exit, one per line
  -0, --null              Print the selected paths on exit, NUL-terminated
  -e, --escape            Escape backslashes and newlines in printed paths
  -d, --print-dir         Print the final directory on exit
      --init              Generate a default configuration file
  -h, --help              Print help information
  -v, --version           Display the current installed version of bb

COMMANDS:
  cd:PATH  columns:CHARS  deselect[:NAME|*]  dotfiles[:0|1]  goto:NAME
  interleave[:0|1]  jump:KEY  mark:KEY[=PATH]  move:N  quit  refresh
  scroll:N  select[:NAME|*]  sort:[+-]KEYS  spread:N  toggle[:NAME]

  N is absolute, or relative with a leading + or -, optionally followed by
  % (percent of the screen) or %n (percent of the entries).

ENVIRONMENT:
  BB_CONFIG               Override the default config path
  BB_LOG                  Log filter, eg. "debug"; logs go to the cache directory
  BBCMD                   Set for scripts run by bb; "bb +COMMAND" sends commands back
"#
    );
}
