//! Signal delivery into the main loop.
//!
//! Handlers only write the signal number into a non-blocking pipe. The read
//! end is polled next to the terminal by [crate::core::input::TtyInput], and
//! the main loop turns the bytes into [Signal]s between input events.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

const HANDLED: [libc::c_int; 6] = [
    libc::SIGWINCH,
    libc::SIGTSTP,
    libc::SIGCONT,
    libc::SIGINT,
    libc::SIGTERM,
    libc::SIGHUP,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Resize,
    Suspend,
    Continue,
    Interrupt,
    Terminate,
}

impl Signal {
    fn from_raw(sig: libc::c_int) -> Option<Self> {
        Some(match sig {
            libc::SIGWINCH => Signal::Resize,
            libc::SIGTSTP => Signal::Suspend,
            libc::SIGCONT => Signal::Continue,
            libc::SIGINT => Signal::Interrupt,
            libc::SIGTERM | libc::SIGHUP => Signal::Terminate,
            _ => return None,
        })
    }
}

extern "C" fn on_signal(sig: libc::c_int) {
    let fd = WRITE_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        let byte = sig as u8;
        // SAFETY: write(2) is async-signal-safe; a full pipe just drops the byte.
        unsafe {
            libc::write(fd, (&byte as *const u8).cast(), 1);
        }
    }
}

fn set_handler(sig: libc::c_int, handler: libc::sighandler_t) -> io::Result<()> {
    // SAFETY: the sigaction struct is fully initialized before use.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(sig, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn handler() -> libc::sighandler_t {
    on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t
}

fn set_flags(fd: RawFd) -> io::Result<()> {
    // SAFETY: plain fcntl calls on a descriptor we own.
    unsafe {
        let fl = libc::fcntl(fd, libc::F_GETFL);
        if fl < 0 || libc::fcntl(fd, libc::F_SETFL, fl | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Self-pipe with the handlers installed. Dropping it restores the defaults.
#[derive(Debug)]
pub struct SignalPipe {
    read: OwnedFd,
    _write: OwnedFd,
    pending: Vec<Signal>,
}

impl SignalPipe {
    pub fn install() -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` has room for the two descriptors pipe(2) returns.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: pipe(2) succeeded, so both descriptors are open and ours.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        set_flags(read.as_raw_fd())?;
        set_flags(write.as_raw_fd())?;

        WRITE_FD.store(write.as_raw_fd(), Ordering::Relaxed);
        for sig in HANDLED {
            set_handler(sig, handler())?;
        }
        Ok(SignalPipe {
            read,
            _write: write,
            pending: Vec::new(),
        })
    }

    /// Descriptor to poll for pending signals.
    #[inline]
    pub fn fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    fn read_pipe(&mut self) {
        let mut buf = [0u8; 64];
        loop {
            // SAFETY: reading into a local buffer, bounded by its length.
            let n =
                unsafe { libc::read(self.read.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break;
            }
            for byte in &buf[..n as usize] {
                if let Some(sig) = Signal::from_raw(libc::c_int::from(*byte)) {
                    tracing::debug!(?sig, "signal received");
                    self.pending.push(sig);
                }
            }
        }
    }

    /// All signals received since the last call, oldest first.
    pub fn take(&mut self) -> Vec<Signal> {
        self.read_pipe();
        std::mem::take(&mut self.pending)
    }

    /// Drops pending interrupts. Used after a child ran in the foreground,
    /// since a Ctrl-C meant for the child reaches the browser too.
    pub fn discard_interrupts(&mut self) {
        self.read_pipe();
        self.pending.retain(|s| *s != Signal::Interrupt);
    }

    /// While a child runs, a terminal stop must stop the whole job instead
    /// of being queued for the browser.
    pub fn set_job_control(&self, child_running: bool) -> io::Result<()> {
        let action = if child_running {
            libc::SIG_DFL
        } else {
            handler()
        };
        set_handler(libc::SIGTSTP, action)
    }
}

impl Drop for SignalPipe {
    fn drop(&mut self) {
        WRITE_FD.store(-1, Ordering::Relaxed);
        for sig in HANDLED {
            let _ = set_handler(sig, libc::SIG_DFL);
        }
    }
}

/// Stops the process the way a terminal stop would, after the terminal has
/// been handed back.
pub fn stop_self() {
    // SAFETY: raise(3) with a valid signal number.
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
}
