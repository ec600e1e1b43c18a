//! End-to-end tests for bb's browsing core.
//!
//! These drive the public library surface the way the main loop does:
//! populate a directory, run commands against the state, drain the command
//! file and decode raw input.
//!
//! Temporary directories are cleaned up when the tests complete.

use bbrowse::app::cmdfile;
use bbrowse::app::{BrowserSettings, BrowserState, CommandFile, CommandResult, run_command};
use bbrowse::core::input::{ByteSource, Event, InputDecoder, MouseButton, MouseKind};
use bbrowse::core::sort::{SortMethod, SortSpec};
use bbrowse::utils::cli::{Separator, write_paths};

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn names(state: &BrowserState) -> Vec<String> {
    (0..state.nfiles())
        .filter_map(|i| state.entry_at(i))
        .map(|e| e.name().to_string_lossy().into_owned())
        .collect()
}

fn touch(dir: &Path, names: &[&str]) -> io::Result<()> {
    for name in names {
        File::create(dir.join(name))?;
    }
    Ok(())
}

fn open_with_height(dir: &Path, height: usize) -> Result<BrowserState, Box<dyn std::error::Error>> {
    let settings = BrowserSettings {
        viewport_height: height,
        ..BrowserSettings::default()
    };
    Ok(BrowserState::open(dir, settings)?)
}

#[test]
fn natural_name_order() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["file2", "file10", "file1"])?;
    let state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
    assert_eq!(names(&state), vec!["..", "file1", "file2", "file10"]);
    Ok(())
}

#[test]
fn directories_first_under_every_sort() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["a", "zz", "m"])?;
    fs::write(tmp.path().join("big"), vec![0u8; 4096])?;
    for dir in ["d1", "D2", "x"] {
        fs::create_dir(tmp.path().join(dir))?;
    }
    let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;

    for method in SortMethod::ALL {
        for sign in ['+', '-'] {
            let spec = SortSpec::parse(&format!("{}{}", sign, method.as_char())).ok_or("spec")?;
            state.set_sort(spec);
            let kinds: Vec<bool> = (1..state.nfiles())
                .filter_map(|i| state.entry_at(i))
                .map(|e| e.is_dir())
                .collect();
            let first_file = kinds.iter().position(|d| !d).unwrap_or(kinds.len());
            assert!(
                kinds[first_file..].iter().all(|d| !d),
                "directory after file with sort {}{}",
                sign,
                method.as_char()
            );
            assert_eq!(state.entry_at(0).map(|e| e.is_parent_ref()), Some(true));
        }
    }
    Ok(())
}

#[test]
fn selection_survives_navigation() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["keep", "other"])?;
    fs::create_dir(tmp.path().join("sub"))?;
    let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;

    assert_eq!(run_command(&mut state, "select:keep"), CommandResult::Dirty);
    let before = state.store().selection();
    assert_eq!(run_command(&mut state, "select:keep"), CommandResult::NoOp);
    assert_eq!(state.store().selection_len(), 1);

    assert_eq!(run_command(&mut state, "cd:sub"), CommandResult::Refresh);
    state.populate()?;
    assert_eq!(state.store().selection_len(), 1);

    assert_eq!(run_command(&mut state, "cd:.."), CommandResult::Refresh);
    state.populate()?;
    let idx = state.find("keep".as_ref()).ok_or("keep missing")?;
    assert!(state.is_selected_at(idx));
    assert_eq!(state.view()[idx], before[0]);
    assert_eq!(state.store().selection(), before);
    Ok(())
}

#[test]
fn symlinked_dir_selection_is_the_listed_entry() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let root = fs::canonicalize(tmp.path())?;
    let real = root.join("real");
    fs::create_dir(&real)?;
    fs::create_dir(root.join("elsewhere"))?;
    File::create(real.join("f"))?;
    std::os::unix::fs::symlink(&real, root.join("link"))?;

    let mut state = BrowserState::open(&root.join("elsewhere"), BrowserSettings::default())?;
    let via_link = format!("select:{}", root.join("link/f").display());
    assert_eq!(run_command(&mut state, &via_link), CommandResult::Dirty);
    assert_eq!(run_command(&mut state, &via_link), CommandResult::NoOp);
    assert_eq!(state.selection_paths(), vec![real.join("f")]);

    let cd = format!("cd:{}", real.display());
    assert_eq!(run_command(&mut state, &cd), CommandResult::Refresh);
    state.populate()?;
    let idx = state.find("f".as_ref()).ok_or("f missing")?;
    assert!(state.is_selected_at(idx));
    assert_eq!(run_command(&mut state, "select:f"), CommandResult::NoOp);
    assert_eq!(state.store().selection_len(), 1);

    // From inside the real directory the link path names the listed entry.
    assert_eq!(run_command(&mut state, &format!("de{}", via_link)), CommandResult::Dirty);
    assert_eq!(state.store().selection_len(), 0);
    assert_eq!(run_command(&mut state, &via_link), CommandResult::Dirty);
    assert!(state.is_selected_at(idx));
    assert_eq!(state.store().selection_len(), 1);
    Ok(())
}

#[test]
fn cursor_clamps_to_view() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["a", "b", "c"])?;
    let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
    state.set_cursor(-100);
    assert_eq!(state.cursor(), 0);
    state.set_cursor(10_000);
    assert_eq!(state.cursor(), state.nfiles() - 1);
    Ok(())
}

#[test]
fn half_page_scroll_on_forty_rows() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    for i in 0..100 {
        File::create(tmp.path().join(format!("f{:03}", i)))?;
    }
    let mut state = open_with_height(tmp.path(), 40)?;
    state.set_cursor(50);
    let scroll = state.scroll();
    assert_eq!(run_command(&mut state, "scroll:+50%"), CommandResult::Dirty);
    assert_eq!(state.scroll(), scroll + 20);
    Ok(())
}

#[test]
fn move_to_end_by_percent_of_entries() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    // 36 files plus the parent reference.
    for i in 0..36 {
        File::create(tmp.path().join(format!("f{:02}", i)))?;
    }
    let mut state = open_with_height(tmp.path(), 20)?;
    assert_eq!(state.nfiles(), 37);
    run_command(&mut state, "move:100%n");
    assert_eq!(state.cursor(), 36);
    Ok(())
}

#[test]
fn child_commands_apply_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["a", "b"])?;
    fs::create_dir(tmp.path().join("sub"))?;
    let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
    let work = tempdir()?;
    let mut cmds = CommandFile::at(work.path().join("cmd"));

    cmdfile::append(cmds.path(), &["select:a", "cd:sub", "select:*"])?;
    assert_eq!(cmds.drain(&mut state)?, CommandResult::Refresh);
    state.populate()?;
    assert_eq!(state.path().file_name().and_then(|n| n.to_str()), Some("sub"));

    // The rest of the file is picked up by the next drain.
    assert_eq!(cmds.drain(&mut state)?, CommandResult::NoOp);
    assert!(!cmds.path().exists());
    assert_eq!(state.store().selection_len(), 1);
    Ok(())
}

#[test]
fn selection_output_lists_full_paths() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    touch(tmp.path(), &["a", "b", "c"])?;
    let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
    run_command(&mut state, "select:a");
    run_command(&mut state, "select:b");

    let mut out = Vec::new();
    write_paths(&mut out, &state.selection_paths(), Separator::Newline, false)?;
    let expected = format!(
        "{}\n{}\n",
        state.path().join("a").display(),
        state.path().join("b").display()
    );
    assert_eq!(String::from_utf8(out)?, expected);
    Ok(())
}

/// In-memory input with a hand-driven clock.
struct Scripted {
    bytes: VecDeque<u8>,
    clock: Instant,
}

impl Scripted {
    fn new() -> Self {
        Scripted {
            bytes: VecDeque::new(),
            clock: Instant::now(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes);
    }

    fn advance(&mut self, by: Duration) {
        self.clock += by;
    }
}

impl ByteSource for Scripted {
    fn read_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Ok(self.bytes.pop_front())
    }

    fn now(&self) -> Instant {
        self.clock
    }
}

fn mouse_kind(event: Option<Event>) -> Option<MouseKind> {
    match event {
        Some(Event::Mouse(m)) => Some(m.kind),
        _ => None,
    }
}

#[test]
fn quick_releases_make_a_double_click() -> Result<(), Box<dyn std::error::Error>> {
    let mut src = Scripted::new();
    let mut decoder = InputDecoder::new(Duration::from_millis(25));
    let release = b"\x1b[<0;4;7m";
    let left = MouseButton::Left;

    src.feed(release);
    let first = decoder.next_event(&mut src, Duration::ZERO)?;
    assert_eq!(mouse_kind(first), Some(MouseKind::Release(left)));

    src.advance(Duration::from_millis(120));
    src.feed(release);
    let second = decoder.next_event(&mut src, Duration::ZERO)?;
    assert_eq!(mouse_kind(second), Some(MouseKind::DoubleClick(left)));

    src.advance(Duration::from_millis(500));
    src.feed(release);
    src.feed(release);
    let third = decoder.next_event(&mut src, Duration::ZERO)?;
    assert_eq!(mouse_kind(third), Some(MouseKind::Release(left)));
    src.advance(Duration::from_millis(250));
    let fourth = decoder.next_event(&mut src, Duration::ZERO)?;
    assert_eq!(mouse_kind(fourth), Some(MouseKind::Release(left)));
    Ok(())
}
