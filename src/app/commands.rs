//! Command interpreter for bb.
//!
//! Commands have the shape `verb[:value]` and come from key bindings, from
//! the command line and from the command file written by child processes.
//! The verb may be any unambiguous prefix of the vocabulary in [Verb].
//!
//! Every command reports its effect as a [CommandResult]; the caller decides
//! how to redraw or whether to re-populate. Malformed or inapplicable
//! commands leave the state untouched and return [CommandResult::Invalid].

use crate::app::state::BrowserState;
use crate::core::sort::SortSpec;
use crate::ui::columns::ColumnSpec;
use crate::utils::helpers::resolve_path;

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Effect of one command on the browser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Nothing visible changed.
    NoOp,
    /// Redraw needed.
    Dirty,
    /// The directory must be populated again.
    Refresh,
    /// Malformed or inapplicable, state unchanged.
    Invalid,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Cd,
    Columns,
    Deselect,
    Dotfiles,
    Goto,
    Interleave,
    Jump,
    Mark,
    Move,
    Quit,
    Refresh,
    Scroll,
    Select,
    Sort,
    Spread,
    Toggle,
}

const VERBS: [(&str, Verb); 16] = [
    ("cd", Verb::Cd),
    ("columns", Verb::Columns),
    ("deselect", Verb::Deselect),
    ("dotfiles", Verb::Dotfiles),
    ("goto", Verb::Goto),
    ("interleave", Verb::Interleave),
    ("jump", Verb::Jump),
    ("mark", Verb::Mark),
    ("move", Verb::Move),
    ("quit", Verb::Quit),
    ("refresh", Verb::Refresh),
    ("scroll", Verb::Scroll),
    ("select", Verb::Select),
    ("sort", Verb::Sort),
    ("spread", Verb::Spread),
    ("toggle", Verb::Toggle),
];

impl Verb {
    /// Resolves a full verb or a unique prefix of one.
    pub fn resolve(word: &str) -> Option<Verb> {
        if word.is_empty() {
            return None;
        }
        if let Some((_, verb)) = VERBS.iter().find(|(name, _)| *name == word) {
            return Some(*verb);
        }
        let mut matches = VERBS.iter().filter(|(name, _)| name.starts_with(word));
        match (matches.next(), matches.next()) {
            (Some((_, verb)), None) => Some(*verb),
            _ => None,
        }
    }
}

/// A parsed `move`/`scroll` amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Absolute(isize),
    Relative(isize),
}

impl Offset {
    /// Parses `[+-]N[%|%n]`. `%` scales by the viewport height, `%n` by the
    /// number of entries.
    pub fn parse(value: &str, viewport_height: usize, nfiles: usize) -> Option<Offset> {
        let (sign, rest) = match value.as_bytes().first() {
            Some(b'+') => (Some(1), &value[1..]),
            Some(b'-') => (Some(-1), &value[1..]),
            _ => (None, value),
        };
        let (digits, scale) = if let Some(d) = rest.strip_suffix("%n") {
            (d, Some(nfiles))
        } else if let Some(d) = rest.strip_suffix('%') {
            (d, Some(viewport_height))
        } else {
            (rest, None)
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let base: isize = digits.parse().ok()?;
        let amount = match scale {
            Some(total) => base.saturating_mul(total as isize) / 100,
            None => base,
        };
        Some(match sign {
            Some(s) => Offset::Relative(s * amount),
            None => Offset::Absolute(amount),
        })
    }

    /// Target position given the current one.
    pub fn apply(self, current: usize) -> isize {
        match self {
            Offset::Absolute(n) => n,
            Offset::Relative(d) => (current as isize).saturating_add(d),
        }
    }
}

/// Executes one command against the state.
pub fn run_command<S: AsRef<OsStr> + ?Sized>(state: &mut BrowserState, cmd: &S) -> CommandResult {
    let cmd = cmd.as_ref();
    let bytes = cmd.as_bytes();
    let (word, value) = match bytes.iter().position(|b| *b == b':') {
        Some(i) => (&bytes[..i], Some(OsStr::from_bytes(&bytes[i + 1..]))),
        None => (bytes, None),
    };

    let verb = std::str::from_utf8(word).ok().and_then(Verb::resolve);
    let result = match verb {
        Some(verb) => execute(state, verb, value),
        None => CommandResult::Invalid,
    };
    tracing::debug!(command = %cmd.to_string_lossy(), ?result, "command");
    result
}

fn execute(state: &mut BrowserState, verb: Verb, value: Option<&OsStr>) -> CommandResult {
    let text = value.and_then(OsStr::to_str);
    match verb {
        Verb::Cd => match value {
            Some(v) => {
                let target = resolve_path(v, state.path());
                change_dir(state, &target)
            }
            None => CommandResult::Invalid,
        },
        Verb::Columns => match text.and_then(ColumnSpec::parse) {
            Some(columns) => {
                state.set_columns(columns);
                CommandResult::Dirty
            }
            None => CommandResult::Invalid,
        },
        Verb::Deselect => deselect(state, value),
        Verb::Dotfiles => set_flag(
            state,
            text,
            BrowserState::show_dotfiles,
            BrowserState::set_show_dotfiles,
        ),
        Verb::Goto => match value {
            Some(v) => goto(state, v),
            None => CommandResult::Invalid,
        },
        Verb::Interleave => set_flag(
            state,
            text,
            BrowserState::interleave,
            BrowserState::set_interleave,
        ),
        Verb::Jump => match text.and_then(single_char) {
            Some(key) => match state.marks().get(key).map(Path::to_path_buf) {
                Some(path) => change_dir(state, &path),
                None => CommandResult::Invalid,
            },
            None => CommandResult::Invalid,
        },
        Verb::Mark => match value {
            Some(v) => mark(state, v),
            None => CommandResult::Invalid,
        },
        Verb::Move => move_or_scroll(state, text, false),
        Verb::Quit => CommandResult::Quit,
        Verb::Refresh => CommandResult::Refresh,
        Verb::Scroll => move_or_scroll(state, text, true),
        Verb::Select => select(state, value),
        Verb::Sort => match text.and_then(SortSpec::parse) {
            Some(spec) => {
                state.set_sort(spec);
                CommandResult::Dirty
            }
            None => CommandResult::Invalid,
        },
        Verb::Spread => spread(state, text),
        Verb::Toggle => toggle(state, value),
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn changed(yes: bool) -> CommandResult {
    if yes {
        CommandResult::Dirty
    } else {
        CommandResult::NoOp
    }
}

fn change_dir(state: &mut BrowserState, target: &Path) -> CommandResult {
    let Ok(target) = target.canonicalize() else {
        return CommandResult::Invalid;
    };
    if !target.is_dir() {
        return CommandResult::Invalid;
    }
    if target == state.path() {
        return CommandResult::NoOp;
    }
    state.focus = if state.path().parent() == Some(target.as_path()) {
        state.path().file_name().map(OsStr::to_os_string)
    } else {
        None
    };
    state.next_path = Some(target);
    CommandResult::Refresh
}

fn goto(state: &mut BrowserState, value: &OsStr) -> CommandResult {
    if let Some(idx) = state.find(value) {
        state.set_cursor(idx as isize);
        return CommandResult::Dirty;
    }
    let path = resolve_path(value, state.path());
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return CommandResult::Invalid;
    };
    let Ok(dir) = dir.canonicalize() else {
        return CommandResult::Invalid;
    };
    if dir == state.path() || !dir.is_dir() {
        return CommandResult::Invalid;
    }
    state.next_path = Some(dir);
    state.focus = Some(name.to_os_string());
    CommandResult::Refresh
}

fn mark(state: &mut BrowserState, value: &OsStr) -> CommandResult {
    let bytes = value.as_bytes();
    let (key, path) = match bytes.iter().position(|b| *b == b'=') {
        Some(i) => (&bytes[..i], Some(OsStr::from_bytes(&bytes[i + 1..]))),
        None => (bytes, None),
    };
    let Some(key) = std::str::from_utf8(key).ok().and_then(single_char) else {
        return CommandResult::Invalid;
    };
    let path: PathBuf = match path {
        Some(p) => {
            let resolved = resolve_path(p, state.path());
            resolved.canonicalize().unwrap_or(resolved)
        }
        None => state.path().to_path_buf(),
    };
    if let Err(e) = state.marks_mut().set(key, path) {
        tracing::warn!(error = %e, "could not save marks");
    }
    CommandResult::NoOp
}

fn parse_offset(state: &BrowserState, text: Option<&str>) -> Option<Offset> {
    text.and_then(|t| Offset::parse(t, state.viewport_height(), state.nfiles()))
}

fn move_or_scroll(state: &mut BrowserState, text: Option<&str>, scroll: bool) -> CommandResult {
    let Some(offset) = parse_offset(state, text) else {
        return CommandResult::Invalid;
    };
    let before = (state.cursor(), state.scroll());
    if scroll {
        state.set_scroll(offset.apply(state.scroll()));
    } else {
        state.set_cursor(offset.apply(state.cursor()));
    }
    changed(before != (state.cursor(), state.scroll()))
}

fn spread(state: &mut BrowserState, text: Option<&str>) -> CommandResult {
    let Some(offset) = parse_offset(state, text) else {
        return CommandResult::Invalid;
    };
    let origin = state.cursor();
    let selecting = state.is_selected_at(origin);
    state.set_cursor(offset.apply(origin));
    let target = state.cursor();

    let (lo, hi) = (origin.min(target), origin.max(target));
    for i in lo..=hi {
        if selecting {
            state.select_at(i);
        } else {
            state.deselect_at(i);
        }
    }
    state.request_full_redraw();
    CommandResult::Dirty
}

fn select(state: &mut BrowserState, value: Option<&OsStr>) -> CommandResult {
    let Some(value) = value else {
        return changed(state.select_at(state.cursor()));
    };
    if value == "*" {
        return changed(state.select_all());
    }
    match state.find(value) {
        Some(idx) => changed(state.select_at(idx)),
        None if Path::new(value).is_absolute() => changed(state.select_path(Path::new(value))),
        None => CommandResult::Invalid,
    }
}

fn deselect(state: &mut BrowserState, value: Option<&OsStr>) -> CommandResult {
    let Some(value) = value else {
        return changed(state.deselect_at(state.cursor()));
    };
    if value == "*" {
        return changed(state.clear_selection());
    }
    match state.find(value) {
        Some(idx) => changed(state.deselect_at(idx)),
        None if Path::new(value).is_absolute() => changed(state.deselect_path(Path::new(value))),
        None => CommandResult::Invalid,
    }
}

fn toggle(state: &mut BrowserState, value: Option<&OsStr>) -> CommandResult {
    let Some(value) = value else {
        return changed(state.toggle_at(state.cursor()));
    };
    match state.find(value) {
        Some(idx) => changed(state.toggle_at(idx)),
        None if Path::new(value).is_absolute() => {
            let path = Path::new(value);
            if state.deselect_path(path) {
                CommandResult::Dirty
            } else {
                changed(state.select_path(path))
            }
        }
        None => CommandResult::Invalid,
    }
}

/// Flips a flag with no value, or sets it from `0`/`1`. Only a real change
/// forces a refresh.
fn set_flag(
    state: &mut BrowserState,
    text: Option<&str>,
    get: fn(&BrowserState) -> bool,
    set: fn(&mut BrowserState, bool) -> bool,
) -> CommandResult {
    let value = match text {
        None | Some("") => !get(state),
        Some("0") => false,
        Some("1") => true,
        Some(_) => return CommandResult::Invalid,
    };
    if set(state, value) {
        CommandResult::Refresh
    } else {
        CommandResult::NoOp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::BrowserSettings;
    use std::fs::{self, File};
    use tempfile::{TempDir, tempdir};

    fn browser(files: &[&str]) -> Result<(TempDir, BrowserState), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        for name in files {
            File::create(tmp.path().join(name))?;
        }
        let state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        Ok((tmp, state))
    }

    #[test]
    fn verb_prefixes() {
        assert_eq!(Verb::resolve("cd"), Some(Verb::Cd));
        assert_eq!(Verb::resolve("q"), Some(Verb::Quit));
        assert_eq!(Verb::resolve("sel"), Some(Verb::Select));
        assert_eq!(Verb::resolve("sp"), Some(Verb::Spread));
        assert_eq!(Verb::resolve("s"), None);
        assert_eq!(Verb::resolve("d"), None);
        assert_eq!(Verb::resolve("mo"), Some(Verb::Move));
        assert_eq!(Verb::resolve("m"), None);
        assert_eq!(Verb::resolve(""), None);
        assert_eq!(Verb::resolve("explode"), None);
    }

    #[test]
    fn offsets() {
        assert_eq!(Offset::parse("3", 40, 10), Some(Offset::Absolute(3)));
        assert_eq!(Offset::parse("-2", 40, 10), Some(Offset::Relative(-2)));
        assert_eq!(Offset::parse("+50%", 40, 10), Some(Offset::Relative(20)));
        assert_eq!(Offset::parse("100%n", 40, 37), Some(Offset::Absolute(37)));
        assert_eq!(Offset::parse("+", 40, 10), None);
        assert_eq!(Offset::parse("1x", 40, 10), None);
        assert_eq!(Offset::parse("%", 40, 10), None);
    }

    #[test]
    fn unknown_and_malformed_commands_are_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["a"])?;
        assert_eq!(run_command(&mut state, "frobnicate"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "move:abc"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "sort:+z"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "columns:q"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "dotfiles:2"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "select:nope"), CommandResult::Invalid);
        assert_eq!(state.cursor(), 0);
        Ok(())
    }

    #[test]
    fn move_and_scroll() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["a", "b", "c"])?;
        assert_eq!(run_command(&mut state, "move:+2"), CommandResult::Dirty);
        assert_eq!(state.cursor(), 2);
        assert_eq!(run_command(&mut state, "m:0"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "mo:0"), CommandResult::Dirty);
        assert_eq!(run_command(&mut state, "move:0"), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "move:100%n"), CommandResult::Dirty);
        assert_eq!(state.cursor(), 3);
        Ok(())
    }

    #[test]
    fn select_toggle_deselect() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["a", "b"])?;
        assert_eq!(run_command(&mut state, "select:a"), CommandResult::Dirty);
        assert_eq!(run_command(&mut state, "select:a"), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "toggle:b"), CommandResult::Dirty);
        assert_eq!(state.store().selection_len(), 2);
        assert_eq!(run_command(&mut state, "toggle:a"), CommandResult::Dirty);
        assert_eq!(state.store().selection_len(), 1);
        assert_eq!(run_command(&mut state, "deselect:*"), CommandResult::Dirty);
        assert_eq!(state.store().selection_len(), 0);
        assert_eq!(run_command(&mut state, "select:*"), CommandResult::Dirty);
        assert_eq!(state.store().selection_len(), 2);
        Ok(())
    }

    #[test]
    fn select_without_value_uses_cursor() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["only"])?;
        run_command(&mut state, "move:1");
        assert_eq!(run_command(&mut state, "select"), CommandResult::Dirty);
        assert_eq!(state.selection_paths(), vec![state.path().join("only")]);
        Ok(())
    }

    #[test]
    fn select_off_view_by_absolute_path() -> Result<(), Box<dyn std::error::Error>> {
        let (other, _) = browser(&["far"])?;
        let far = other.path().canonicalize()?.join("far");
        let (_tmp, mut state) = browser(&["near"])?;

        let cmd = format!("select:{}", far.display());
        assert_eq!(run_command(&mut state, cmd.as_str()), CommandResult::Dirty);
        assert_eq!(state.selection_paths(), vec![far.clone()]);

        let cmd = format!("toggle:{}", far.display());
        assert_eq!(run_command(&mut state, cmd.as_str()), CommandResult::Dirty);
        assert!(state.selection_paths().is_empty());
        Ok(())
    }

    #[test]
    fn cd_and_parent_focus() -> Result<(), Box<dyn std::error::Error>> {
        let (tmp, mut state) = browser(&["file"])?;
        fs::create_dir(tmp.path().join("sub"))?;
        run_command(&mut state, "refresh");
        state.populate()?;

        assert_eq!(run_command(&mut state, "cd:."), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "cd:missing"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "cd:file"), CommandResult::Invalid);

        assert_eq!(run_command(&mut state, "cd:sub"), CommandResult::Refresh);
        state.populate()?;
        assert!(state.path().ends_with("sub"));

        assert_eq!(run_command(&mut state, "cd:.."), CommandResult::Refresh);
        state.populate()?;
        assert_eq!(state.cursor_entry().map(|e| e.name().to_owned()), Some("sub".into()));
        Ok(())
    }

    #[test]
    fn cd_at_root_parent_is_noop() -> Result<(), Box<dyn std::error::Error>> {
        let mut state = BrowserState::open(Path::new("/"), BrowserSettings::default())?;
        assert_eq!(run_command(&mut state, "cd:.."), CommandResult::NoOp);
        Ok(())
    }

    #[test]
    fn goto_across_directories() -> Result<(), Box<dyn std::error::Error>> {
        let (tmp, mut state) = browser(&["here"])?;
        fs::create_dir(tmp.path().join("nested"))?;
        File::create(tmp.path().join("nested").join("target"))?;

        assert_eq!(run_command(&mut state, "goto:here"), CommandResult::Dirty);
        assert_eq!(run_command(&mut state, "goto:nested/target"), CommandResult::Refresh);
        state.populate()?;
        assert!(state.path().ends_with("nested"));
        assert_eq!(state.cursor_entry().map(|e| e.name().to_owned()), Some("target".into()));
        Ok(())
    }

    #[test]
    fn flags_refresh_only_on_change() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&[".hidden"])?;
        assert_eq!(run_command(&mut state, "dotfiles:0"), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "dotfiles:1"), CommandResult::Refresh);
        state.populate()?;
        assert!(state.find(OsStr::new(".hidden")).is_some());
        assert_eq!(run_command(&mut state, "dotfiles"), CommandResult::Refresh);
        assert!(!state.show_dotfiles());
        assert_eq!(run_command(&mut state, "interleave:1"), CommandResult::Refresh);
        Ok(())
    }

    #[test]
    fn spread_propagates_origin_state() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["a", "b", "c", "d"])?;
        run_command(&mut state, "move:1");
        run_command(&mut state, "toggle");
        assert_eq!(run_command(&mut state, "spread:+2"), CommandResult::Dirty);
        assert_eq!(state.cursor(), 3);
        assert_eq!(state.store().selection_len(), 3);

        assert_eq!(run_command(&mut state, "spread:-3"), CommandResult::Dirty);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.store().selection_len(), 3);
        Ok(())
    }

    #[test]
    fn sort_and_columns() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, mut state) = browser(&["file1", "file10", "file2"])?;
        run_command(&mut state, "goto:file2");
        assert_eq!(run_command(&mut state, "sort:-n"), CommandResult::Dirty);
        assert_eq!(state.sort().to_string(), "-n");
        assert_eq!(state.cursor_entry().map(|e| e.name().to_owned()), Some("file2".into()));
        assert_eq!(run_command(&mut state, "columns:nr"), CommandResult::Dirty);
        assert_eq!(state.columns().to_string(), "nr");
        Ok(())
    }

    #[test]
    fn marks_and_jump() -> Result<(), Box<dyn std::error::Error>> {
        let (tmp, mut state) = browser(&[])?;
        fs::create_dir(tmp.path().join("deep"))?;
        let deep = tmp.path().canonicalize()?.join("deep");

        let cmd = format!("mark:d={}", deep.display());
        assert_eq!(run_command(&mut state, cmd.as_str()), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "mark:h"), CommandResult::NoOp);
        assert_eq!(run_command(&mut state, "jump:d"), CommandResult::Refresh);
        state.populate()?;
        assert_eq!(state.path(), deep.as_path());
        assert_eq!(run_command(&mut state, "jump:h"), CommandResult::Refresh);
        assert_eq!(run_command(&mut state, "jump:z"), CommandResult::Invalid);
        assert_eq!(run_command(&mut state, "mark:xy"), CommandResult::Invalid);
        Ok(())
    }
}
