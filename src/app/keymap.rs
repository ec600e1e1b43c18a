//! Key binding table for bb
//!
//! Maps key and mouse triggers to a [BindingAction]. An action string that
//! starts with `+` is a command for the interpreter; anything else is a
//! shell script run by the supervisor with the selection as its arguments.
//!
//! The built-in table below is always loaded; bindings from the config file
//! are applied on top and replace built-ins sharing a trigger.

use crate::config::input::{BindingConfig, parse_trigger};
use crate::core::input::{Key, MouseKind};

use std::collections::HashMap;

/// Prefix marking an action string as an interpreter command.
pub const COMMAND_PREFIX: char = '+';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Key(Key),
    Mouse(MouseKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingAction {
    Command(String),
    Script(String),
    Suspend,
}

impl BindingAction {
    pub fn parse(action: &str) -> Self {
        match action.strip_prefix(COMMAND_PREFIX) {
            Some(cmd) => BindingAction::Command(cmd.to_string()),
            None => BindingAction::Script(action.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    action: BindingAction,
    description: String,
    flags: u8,
}

impl Binding {
    /// Needs the normal screen instead of the alternate one.
    pub const NORMAL_TERM: u8 = 1 << 0;
    pub const SHOW_CURSOR: u8 = 1 << 1;

    pub fn new(action: BindingAction, description: impl Into<String>, flags: u8) -> Self {
        Binding {
            action,
            description: description.into(),
            flags,
        }
    }

    #[inline]
    pub fn action(&self) -> &BindingAction {
        &self.action
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn normal_term(&self) -> bool {
        self.flags & Self::NORMAL_TERM != 0
    }

    #[inline]
    pub fn show_cursor(&self) -> bool {
        self.flags & Self::SHOW_CURSOR != 0
    }
}

const OPEN: &str = r#"if [ -d "$BBFULLCURSOR" ]; then "$BB" "+cd:$BBFULLCURSOR"; else "${PAGER:-less}" "$BBFULLCURSOR"; fi"#;
const SORT_PROMPT: &str = r#"printf 'Sort (n s p m c a r, +/- for direction): '; read -r spec && [ -n "$spec" ] && "$BB" "+sort:$spec""#;
const COLUMNS_PROMPT: &str = r#"printf 'Columns (n s p m c a r): '; read -r cols && [ -n "$cols" ] && "$BB" "+columns:$cols""#;
const GOTO_PROMPT: &str = r#"printf 'Go to: '; read -r name && [ -n "$name" ] && "$BB" "+goto:$name""#;
const MARK_PROMPT: &str = r#"printf 'Mark: '; read -r key && [ -n "$key" ] && "$BB" "+mark:$key""#;
const JUMP_PROMPT: &str = r#"printf 'Jump to: '; read -r key && [ -n "$key" ] && "$BB" "+jump:$key""#;
const SHELL_PROMPT: &str = r#"printf ': '; read -r cmd && sh -c "$cmd" sh "$@"; printf '\nPress Enter to return'; read -r _"#;
const EDIT: &str = r#"if [ $# -gt 0 ]; then "${EDITOR:-vi}" "$@"; else "${EDITOR:-vi}" "$BBFULLCURSOR"; fi"#;

const N: u8 = Binding::NORMAL_TERM;
const C: u8 = Binding::SHOW_CURSOR;

/// Built-in bindings: triggers, action, description, flags.
#[rustfmt::skip]
const BUILTIN: &[(&[&str], &str, &str, u8)] = &[
    (&["q", "Q"],                          "+quit",            "Quit",                  0),
    (&["enter", "l", "right", "doubleclick"], OPEN,            "Open file or directory", C),
    (&["h", "left", "backspace", "<c-h>"], "+cd:..",           "Go to parent",          0),
    (&["j", "down"],                       "+move:+1",         "Move down",             0),
    (&["k", "up"],                         "+move:-1",         "Move up",               0),
    (&["J"],                               "+spread:+1",       "Spread selection down", 0),
    (&["K"],                               "+spread:-1",       "Spread selection up",   0),
    (&["pgdn", "<c-d>"],                   "+scroll:+50%",     "Half page down",        0),
    (&["pgup", "<c-u>"],                   "+scroll:-50%",     "Half page up",          0),
    (&["home", "g"],                       "+move:0",          "First entry",           0),
    (&["end", "G"],                        "+move:100%n",      "Last entry",            0),
    (&["space", "v"],                      "+toggle",          "Toggle selection",      0),
    (&["esc"],                             "+deselect:*",      "Clear selection",       0),
    (&["<c-a>"],                           "+select:*",        "Select all",            0),
    (&["."],                               "+dotfiles",        "Toggle dotfiles",       0),
    (&["r", "f5"],                         "+refresh",         "Refresh",               0),
    (&["~"],                               "+cd:~",            "Go home",               0),
    (&["s"],                               SORT_PROMPT,        "Change sort",           C),
    (&["#"],                               COLUMNS_PROMPT,     "Change columns",        C),
    (&["/"],                               GOTO_PROMPT,        "Go to path",            C),
    (&["m"],                               MARK_PROMPT,        "Set mark",              C),
    (&["'"],                               JUMP_PROMPT,        "Jump to mark",          C),
    (&[":"],                               SHELL_PROMPT,       "Run shell command",     N | C),
    (&["e"],                               EDIT,               "Edit",                  C),
];

/// Trigger to binding lookup.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: Vec<Binding>,
    map: HashMap<Trigger, usize>,
}

impl Keymap {
    pub fn builtin() -> Self {
        let mut keymap = Keymap::default();
        for (keys, action, description, flags) in BUILTIN {
            keymap.bind(keys.iter().copied(), BindingAction::parse(action), description, *flags);
        }
        keymap.bind(["<c-z>"], BindingAction::Suspend, "Suspend", 0);
        keymap
    }

    /// Built-ins overridden by the configured bindings.
    pub fn from_config(bindings: &[BindingConfig]) -> Self {
        let mut keymap = Self::builtin();
        for b in bindings {
            let mut flags = 0;
            if b.normal_term() {
                flags |= Binding::NORMAL_TERM;
            }
            if b.show_cursor() {
                flags |= Binding::SHOW_CURSOR;
            }
            keymap.bind(
                b.keys().iter().map(String::as_str),
                BindingAction::parse(b.action()),
                b.description(),
                flags,
            );
        }
        keymap
    }

    fn bind<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a str>,
        action: BindingAction,
        description: &str,
        flags: u8,
    ) {
        let idx = self.bindings.len();
        let mut bound = false;
        for name in keys {
            match parse_trigger(name) {
                Some(trigger) => {
                    self.map.insert(trigger, idx);
                    bound = true;
                }
                None => tracing::warn!(key = name, "unknown key name in binding"),
            }
        }
        if bound {
            self.bindings.push(Binding::new(action, description, flags));
        }
    }

    pub fn lookup(&self, trigger: Trigger) -> Option<&Binding> {
        self.map.get(&trigger).and_then(|idx| self.bindings.get(*idx))
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}
