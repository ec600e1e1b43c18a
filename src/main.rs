//! main.rs
//! Entry point for bb

use bbrowse::app::{BrowserState, CommandFile, CommandResult, Keymap, run_command};
use bbrowse::config::Config;
use bbrowse::core::terminal;
use bbrowse::error::{BrowseError, Result};
use bbrowse::logging;
use bbrowse::utils::cli::{CliAction, RunOptions, Separator, handle_args, write_paths};

use std::path::PathBuf;

fn main() {
    std::panic::set_hook(Box::new(|info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let mut tty = std::io::stderr();
        let _ = crossterm::execute!(
            tty,
            crossterm::event::DisableMouseCapture,
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );

        eprintln!("\n[bb] Error occurred: {}", info);

        #[cfg(debug_assertions)]
        {
            let bt = std::backtrace::Backtrace::force_capture();
            eprintln!("\nStack Backtrace:\n{}", bt);
        }
    }));

    let opts = match handle_args() {
        CliAction::Run(opts) => opts,
        CliAction::Exit(code) => std::process::exit(code),
    };

    let _log_guard = logging::init();
    if let Err(e) = run(opts) {
        eprintln!("[bb] Error: {}", e);
        std::process::exit(1);
    }
}

fn run(opts: RunOptions) -> Result<()> {
    let config = Config::load();
    let keymap = Keymap::from_config(config.bindings());

    let start = match &opts.path {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| BrowseError::InvalidPath(format!("current directory: {}", e)))?,
    };
    let mut state = BrowserState::open(&start, config.browser_settings())?;

    if run_startup_commands(&mut state, &opts)? {
        let mut cmds = CommandFile::create()?;
        tracing::info!(
            path = %state.path().display(),
            cmd = %cmds.path().display(),
            "session start"
        );
        terminal::run(&mut state, &config, &keymap, &mut cmds)?;
    }

    // The session has been torn down, so stdout is free for the results.
    let mut stdout = std::io::stdout().lock();
    if let Some(separator) = opts.output {
        write_paths(&mut stdout, &state.selection_paths(), separator, opts.escape)?;
    }
    if opts.print_dir {
        let dir = [PathBuf::from(state.path())];
        let separator = opts.output.unwrap_or(Separator::Newline);
        write_paths(&mut stdout, &dir, separator, opts.escape)?;
    }
    Ok(())
}

/// Runs `+command` arguments before the UI starts. Returns `false` when one
/// of them quits.
fn run_startup_commands(state: &mut BrowserState, opts: &RunOptions) -> Result<bool> {
    for cmd in &opts.commands {
        match run_command(state, cmd.as_os_str()) {
            CommandResult::Quit => return Ok(false),
            CommandResult::Refresh => state.populate()?,
            CommandResult::Invalid => {
                eprintln!("[bb] Invalid command: {}", cmd.to_string_lossy());
            }
            CommandResult::NoOp | CommandResult::Dirty => {}
        }
    }
    Ok(true)
}
