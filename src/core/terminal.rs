//! Terminal session and main event loop for bb.
//!
//! [Session] owns the terminal mode: raw mode, alternate screen, hidden
//! cursor and mouse reporting are acquired by [Session::enter] and released
//! by [Session::leave] or, on any other exit path, by `Drop`.
//!
//! [run] drives one browsing session. Every cycle handles pending signals
//! (resize, suspend), drains the command file, redraws if needed, then waits
//! for and dispatches one input event.

use crate::app::cmdfile::CommandFile;
use crate::app::commands::{CommandResult, run_command};
use crate::app::keymap::{Binding, BindingAction, Keymap, Trigger};
use crate::app::state::BrowserState;
use crate::config::Config;
use crate::core::input::{Event, InputDecoder, Mouse, MouseButton, MouseKind, TtyInput};
use crate::core::proc::Supervisor;
use crate::core::signals::{Signal, SignalPipe, stop_self};
use crate::error::Result;
use crate::ui::render::{HEADER_ROWS, Renderer};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::os::fd::{AsRawFd, RawFd};

const WHEEL_ROWS: &str = "3";

/// Scoped ownership of the controlling terminal.
#[derive(Debug)]
pub struct Session {
    out: BufWriter<File>,
    raw: bool,
    alternate: bool,
}

impl Session {
    /// Opens `/dev/tty`, so the UI works while stdout is redirected.
    pub fn open() -> io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        Ok(Session {
            out: BufWriter::new(tty),
            raw: false,
            alternate: false,
        })
    }

    /// Raw mode, alternate screen, hidden cursor, mouse reporting. Safe to
    /// call again after the terminal was disturbed (eg. on resume).
    pub fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.raw = true;
        execute!(self.out, EnterAlternateScreen, Hide, EnableMouseCapture)?;
        self.alternate = true;
        Ok(())
    }

    /// Cooked mode with a visible cursor. The alternate screen stays up when
    /// `keep_alternate` is set, for children that draw over the browser.
    pub fn leave(&mut self, keep_alternate: bool) -> io::Result<()> {
        if self.raw {
            execute!(self.out, DisableMouseCapture, Show)?;
            disable_raw_mode()?;
            self.raw = false;
        }
        if self.alternate && !keep_alternate {
            execute!(self.out, LeaveAlternateScreen)?;
            self.alternate = false;
        }
        Ok(())
    }

    #[inline]
    pub fn out(&mut self) -> &mut BufWriter<File> {
        &mut self.out
    }

    #[inline]
    pub fn tty(&self) -> &File {
        self.out.get_ref()
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.out.get_ref().as_raw_fd()
    }

    pub fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.leave(false);
    }
}

enum Flow {
    Continue,
    Quit,
}

struct EventLoop<'a> {
    config: &'a Config,
    keymap: &'a Keymap,
    cmds: &'a mut CommandFile,
    session: Session,
    signals: SignalPipe,
    renderer: Renderer,
    supervisor: Supervisor,
    dirty: bool,
}

/// Runs the browser until it quits. The terminal is restored on return,
/// whether or not an error occurred.
pub fn run(
    state: &mut BrowserState,
    config: &Config,
    keymap: &Keymap,
    cmds: &mut CommandFile,
) -> Result<()> {
    let signals = SignalPipe::install()?;
    let mut session = Session::open()?;
    session.enter()?;
    let (width, height) = session.size()?;
    let renderer = Renderer::new(width, height);
    state.set_viewport_height(renderer.viewport_height());
    state.request_full_redraw();

    let supervisor = Supervisor::new(cmds.path());
    let mut event_loop = EventLoop {
        config,
        keymap,
        cmds,
        session,
        signals,
        renderer,
        supervisor,
        dirty: true,
    };
    event_loop.run(state)
}

impl EventLoop<'_> {
    fn run(&mut self, state: &mut BrowserState) -> Result<()> {
        let mut input = TtyInput::new(self.session.fd(), Some(self.signals.fd()));
        let mut decoder = InputDecoder::new(self.config.general().escape_delay());
        let timeout = self.config.general().input_timeout();

        loop {
            for signal in self.signals.take() {
                if let Flow::Quit = self.handle_signal(state, signal)? {
                    return Ok(());
                }
            }

            let drained = self.cmds.drain(state)?;
            if let Flow::Quit = self.apply(state, drained)? {
                return Ok(());
            }

            if self.dirty {
                let display = self.config.display();
                let theme = self.config.theme();
                self.renderer
                    .draw(self.session.out(), state, theme, display)?;
                self.dirty = false;
            }

            let Some(event) = decoder.next_event(&mut input, timeout)? else {
                continue;
            };
            if let Flow::Quit = self.dispatch(state, event)? {
                return Ok(());
            }
        }
    }

    fn apply(&mut self, state: &mut BrowserState, result: CommandResult) -> Result<Flow> {
        match result {
            CommandResult::NoOp | CommandResult::Invalid => {}
            CommandResult::Dirty => self.dirty = true,
            CommandResult::Refresh => {
                state.populate()?;
                self.dirty = true;
            }
            CommandResult::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn handle_signal(&mut self, state: &mut BrowserState, signal: Signal) -> Result<Flow> {
        match signal {
            Signal::Resize => self.resize(state)?,
            Signal::Suspend => self.suspend(state)?,
            Signal::Continue => {
                self.session.enter()?;
                self.resize(state)?;
            }
            Signal::Interrupt | Signal::Terminate => {
                tracing::info!(?signal, "terminating");
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn resize(&mut self, state: &mut BrowserState) -> io::Result<()> {
        let (width, height) = self.session.size()?;
        self.renderer.resize(width, height);
        state.set_viewport_height(self.renderer.viewport_height());
        state.request_full_redraw();
        self.dirty = true;
        Ok(())
    }

    fn suspend(&mut self, state: &mut BrowserState) -> io::Result<()> {
        self.session.leave(false)?;
        stop_self();
        // Running again after SIGCONT.
        self.session.enter()?;
        self.resize(state)
    }

    fn dispatch(&mut self, state: &mut BrowserState, event: Event) -> Result<Flow> {
        let keymap = self.keymap;
        let trigger = match event {
            Event::Key(key) => Trigger::Key(key),
            Event::Mouse(mouse) => Trigger::Mouse(mouse.kind),
        };
        if let Some(binding) = keymap.lookup(trigger) {
            if let Event::Mouse(mouse) = event {
                self.click_row(state, mouse);
            }
            return self.run_binding(state, binding);
        }
        match event {
            Event::Mouse(mouse) => self.mouse(state, mouse),
            Event::Key(_) => Ok(Flow::Continue),
        }
    }

    /// Moves the cursor to the clicked row, if the event hit one.
    fn click_row(&mut self, state: &mut BrowserState, mouse: Mouse) -> bool {
        let Some(row) = mouse.y.checked_sub(HEADER_ROWS) else {
            return false;
        };
        let row = usize::from(row);
        if row >= self.renderer.viewport_height() {
            return false;
        }
        let i = state.scroll() + row;
        if i >= state.nfiles() {
            return false;
        }
        if i != state.cursor() {
            state.set_cursor(i as isize);
            self.dirty = true;
        }
        true
    }

    /// Built-in mouse behavior for unbound mouse events.
    fn mouse(&mut self, state: &mut BrowserState, mouse: Mouse) -> Result<Flow> {
        match mouse.kind {
            MouseKind::Press(MouseButton::Left) => {
                if mouse.y == HEADER_ROWS - 1 {
                    if let Some(column) = self.renderer.layout().column_at(usize::from(mouse.x)) {
                        let sort = state.sort().with_primary(column.sort_method());
                        state.set_sort(sort);
                        self.dirty = true;
                    }
                } else {
                    self.click_row(state, mouse);
                }
                Ok(Flow::Continue)
            }
            MouseKind::WheelUp => {
                let result = run_command(state, &format!("scroll:-{}", WHEEL_ROWS));
                self.apply(state, result)
            }
            MouseKind::WheelDown => {
                let result = run_command(state, &format!("scroll:+{}", WHEEL_ROWS));
                self.apply(state, result)
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn run_binding(&mut self, state: &mut BrowserState, binding: &Binding) -> Result<Flow> {
        match binding.action() {
            BindingAction::Command(cmd) => {
                let result = run_command(state, cmd.as_str());
                self.apply(state, result)
            }
            BindingAction::Script(script) => {
                self.run_script(state, binding, script)?;
                Ok(Flow::Continue)
            }
            BindingAction::Suspend => {
                self.suspend(state)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Hands the terminal to a script and takes it back afterwards. Commands
    /// the script queued are picked up by the next cycle's drain, before any
    /// new input.
    fn run_script(
        &mut self,
        state: &mut BrowserState,
        binding: &Binding,
        script: &str,
    ) -> io::Result<()> {
        self.session.leave(!binding.normal_term())?;
        if binding.show_cursor() {
            let (_, height) = self.session.size()?;
            execute!(
                self.session.out(),
                MoveTo(0, height.saturating_sub(1)),
                Clear(ClearType::CurrentLine)
            )?;
        } else {
            execute!(self.session.out(), Hide)?;
        }

        self.signals.set_job_control(true)?;
        let status = self.supervisor.run(script, state, Some(self.session.tty()));
        self.signals.set_job_control(false)?;
        self.signals.discard_interrupts();

        if let Err(e) = &status {
            tracing::warn!(error = %e, "could not run child");
        }
        self.session.enter()?;
        self.resize(state)
    }
}
