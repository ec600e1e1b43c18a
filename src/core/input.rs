//! Raw terminal input decoding for bb.
//!
//! The terminal runs in raw mode with SGR mouse reporting, so input arrives
//! as plain bytes. [InputDecoder] turns that stream into one [Event] per
//! call:
//! - plain and control bytes map to [Key::Byte], multi-byte UTF-8 to [Key::Char]
//! - `ESC [ ...` (CSI) and `ESC O ...` (SS3) sequences map to named keys
//! - `ESC [ < b ; x ; y M|m` maps to mouse events with zero-based coordinates
//!
//! A lone ESC is reported as [Key::Escape] once the escape delay passes.
//! Malformed or unknown sequences decode to no event.
//!
//! Bytes come from a [ByteSource] so the decoder can be driven from memory.

use phf::phf_map;

use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

/// Two releases of the same button closer than this form a double-click.
pub const DOUBLE_CLICK: Duration = Duration::from_millis(200);

const ESC: u8 = 0x1b;
const MAX_SEQUENCE: usize = 32;

/// A bounded-wait byte stream plus the monotonic clock used for click timing.
pub trait ByteSource {
    /// Next byte, or `None` if nothing arrived within `timeout`.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;

    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable or control byte as typed, eg. `b'q'` or `0x04` for Ctrl-D.
    Byte(u8),
    /// A non-ASCII character.
    Char(char),
    Alt(u8),
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    BackTab,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseKind {
    Press(MouseButton),
    Release(MouseButton),
    DoubleClick(MouseButton),
    Drag(MouseButton),
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mouse {
    pub kind: MouseKind,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    Mouse(Mouse),
}

/// CSI and SS3 sequences, keyed by first parameter and final byte.
static SEQUENCES: phf::Map<&'static str, Key> = phf_map! {
    "A" => Key::Up,
    "B" => Key::Down,
    "C" => Key::Right,
    "D" => Key::Left,
    "H" => Key::Home,
    "F" => Key::End,
    "Z" => Key::BackTab,
    "P" => Key::F(1),
    "Q" => Key::F(2),
    "R" => Key::F(3),
    "S" => Key::F(4),
    "1~" => Key::Home,
    "7~" => Key::Home,
    "4~" => Key::End,
    "8~" => Key::End,
    "2~" => Key::Insert,
    "3~" => Key::Delete,
    "5~" => Key::PageUp,
    "6~" => Key::PageDown,
    "11~" => Key::F(1),
    "12~" => Key::F(2),
    "13~" => Key::F(3),
    "14~" => Key::F(4),
    "15~" => Key::F(5),
    "17~" => Key::F(6),
    "18~" => Key::F(7),
    "19~" => Key::F(8),
    "20~" => Key::F(9),
    "21~" => Key::F(10),
    "23~" => Key::F(11),
    "24~" => Key::F(12),
};

/// Stateful decoder. Remembers the last mouse release for double-clicks
/// and a byte read ahead that belongs to the next event.
#[derive(Debug)]
pub struct InputDecoder {
    escape_delay: Duration,
    last_release: Option<(MouseButton, Instant)>,
    pending: Option<u8>,
}

impl InputDecoder {
    pub fn new(escape_delay: Duration) -> Self {
        InputDecoder {
            escape_delay,
            last_release: None,
            pending: None,
        }
    }

    /// Waits up to `timeout` for input and decodes one event.
    pub fn next_event<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        timeout: Duration,
    ) -> io::Result<Option<Event>> {
        let byte = match self.pending.take() {
            Some(b) => b,
            None => match src.read_byte(timeout)? {
                Some(b) => b,
                None => return Ok(None),
            },
        };
        match byte {
            ESC => {}
            0xc2..=0xf4 => return self.utf8(src, byte),
            _ => return Ok(Some(Event::Key(Key::Byte(byte)))),
        }
        match src.read_byte(self.escape_delay)? {
            None => Ok(Some(Event::Key(Key::Escape))),
            Some(b'[') => self.csi(src),
            Some(b'O') => self.ss3(src),
            Some(ESC) => {
                self.pending = Some(ESC);
                Ok(Some(Event::Key(Key::Escape)))
            }
            Some(b) => Ok(Some(Event::Key(Key::Alt(b)))),
        }
    }

    /// Collects the continuation bytes of a character starting with `lead`.
    /// A byte that cannot continue it is kept for the next event.
    fn utf8<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        lead: u8,
    ) -> io::Result<Option<Event>> {
        let len = match lead {
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            _ => 4,
        };
        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            match src.read_byte(self.escape_delay)? {
                Some(b) if b & 0xc0 == 0x80 => *slot = b,
                Some(b) => {
                    self.pending = Some(b);
                    return Ok(None);
                }
                None => return Ok(None),
            }
        }
        let key = std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Key::Char);
        Ok(key.map(Event::Key))
    }

    fn ss3<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Option<Event>> {
        let Some(b) = src.read_byte(self.escape_delay)? else {
            return Ok(None);
        };
        let name = [b];
        let key = std::str::from_utf8(&name)
            .ok()
            .and_then(|s| SEQUENCES.get(s))
            .copied();
        Ok(key.map(Event::Key))
    }

    fn csi<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Option<Event>> {
        let mut params = String::new();
        let final_byte = loop {
            let Some(b) = src.read_byte(self.escape_delay)? else {
                return Ok(None);
            };
            match b {
                0x30..=0x3f => params.push(b as char),
                0x20..=0x2f => {}
                0x40..=0x7e => break b,
                _ => return Ok(None),
            }
            if params.len() > MAX_SEQUENCE {
                return Ok(None);
            }
        };

        if let Some(mouse) = params.strip_prefix('<') {
            return Ok(self.sgr_mouse(mouse, final_byte, src.now()).map(Event::Mouse));
        }

        let first = params.split(';').next().unwrap_or("");
        let first = if final_byte != b'~' && first == "1" {
            ""
        } else {
            first
        };
        let name = format!("{}{}", first, final_byte as char);
        Ok(SEQUENCES.get(name.as_str()).copied().map(Event::Key))
    }

    fn sgr_mouse(&mut self, params: &str, final_byte: u8, now: Instant) -> Option<Mouse> {
        let mut fields = params.split(';').map(|f| f.parse::<u16>().ok());
        let (Some(Some(code)), Some(Some(x)), Some(Some(y)), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return None;
        };

        let button = || match code & 0b11 {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        };
        let kind = if code & 64 != 0 {
            match code & 0b11 {
                0 => MouseKind::WheelUp,
                1 => MouseKind::WheelDown,
                _ => return None,
            }
        } else {
            let button = button()?;
            match final_byte {
                b'm' => self.release(button, now),
                b'M' if code & 32 != 0 => MouseKind::Drag(button),
                b'M' => MouseKind::Press(button),
                _ => return None,
            }
        };

        Some(Mouse {
            kind,
            x: x.saturating_sub(1),
            y: y.saturating_sub(1),
        })
    }

    fn release(&mut self, button: MouseButton, now: Instant) -> MouseKind {
        let double = matches!(
            self.last_release,
            Some((prev, at)) if prev == button && now.saturating_duration_since(at) < DOUBLE_CLICK
        );
        if double {
            self.last_release = None;
            MouseKind::DoubleClick(button)
        } else {
            self.last_release = Some((button, now));
            MouseKind::Release(button)
        }
    }
}

/// Reads from the terminal with `poll`, also waking up when `wake_fd` (the
/// signal pipe) becomes readable.
#[derive(Debug)]
pub struct TtyInput {
    fd: RawFd,
    wake_fd: Option<RawFd>,
    buf: [u8; 256],
    start: usize,
    end: usize,
}

impl TtyInput {
    pub fn new(fd: RawFd, wake_fd: Option<RawFd>) -> Self {
        TtyInput {
            fd,
            wake_fd,
            buf: [0; 256],
            start: 0,
            end: 0,
        }
    }

    fn fill(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds = [
            libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.wake_fd.unwrap_or(-1),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        // SAFETY: `fds` is a valid array of two pollfd structs for the duration of the call.
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            };
        }
        if fds[0].revents & libc::POLLIN == 0 {
            return Ok(false);
        }
        // SAFETY: reading into our own buffer, bounded by its length.
        let n = unsafe { libc::read(self.fd, self.buf.as_mut_ptr().cast(), self.buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(false),
                _ => Err(err),
            };
        }
        self.start = 0;
        self.end = n as usize;
        Ok(n > 0)
    }
}

impl ByteSource for TtyInput {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if self.start == self.end && !self.fill(timeout)? {
            return Ok(None);
        }
        let b = self.buf[self.start];
        self.start += 1;
        Ok(Some(b))
    }
}
