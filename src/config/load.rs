//! The main config loading module for bb.
//!
//! Handles loading and deserializing settings from `bb.toml`.
//!
//! Provides the main [Config] struct, as well as the internal [RawConfig] used for parsing.
//!
//! Also implements default config generation for `bb --init`.

use crate::app::state::BrowserSettings;
use crate::config::display::{Display, InternalDisplay};
use crate::config::general::{General, InternalGeneral};
use crate::config::input::BindingConfig;
use crate::config::theme::Theme;
use crate::utils::get_home;

use serde::Deserialize;
use std::{fs, io, path::Path, path::PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BB_CONFIG";

/// Raw configuration as read from the toml file.
/// It is converted into the main [Config] struct, which validates and clamps values.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct RawConfig {
    general: General,
    display: Display,
    theme: Theme,
    bindings: Vec<BindingConfig>,
}

/// Processed configuration used by bb.
#[derive(Debug)]
pub struct Config {
    general: InternalGeneral,
    display: InternalDisplay,
    theme: Theme,
    bindings: Vec<BindingConfig>,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            general: InternalGeneral::from(raw.general),
            display: InternalDisplay::from(raw.display),
            theme: raw.theme,
            bindings: raw.bindings,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    /// A missing or broken file yields the defaults; problems are reported
    /// on stderr before the UI takes over the terminal.
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "config loaded");
                    config
                }
                Err(e) => {
                    eprintln!("[bb] Error parsing {}: {}", path.display(), e);
                    tracing::warn!(path = %path.display(), error = %e, "config parse failed");
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[bb] Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parses config text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawConfig>(content).map(Config::from)
    }

    // Getters

    #[inline]
    pub fn general(&self) -> &InternalGeneral {
        &self.general
    }

    #[inline]
    pub fn display(&self) -> &InternalDisplay {
        &self.display
    }

    #[inline]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    #[inline]
    pub fn bindings(&self) -> &[BindingConfig] {
        &self.bindings
    }

    /// Initial browser settings. The viewport height is fixed up once the
    /// terminal size is known.
    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            show_dotfiles: self.general.show_dotfiles(),
            interleave: self.general.interleave_dirs(),
            sort: self.display.sort().clone(),
            columns: self.display.columns().clone(),
            scroll_margin: self.general.scroll_margin(),
            marks_file: self.general.marks_file().cloned(),
            ..BrowserSettings::default()
        }
    }

    /// Determine the default configuration file path.
    /// Checks the BB_CONFIG environment variable first,
    /// then XDG_CONFIG_HOME,
    /// then defaults to ~/.config/bbrowse/bb.toml.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("bbrowse/bb.toml");
        }

        if let Some(home) = get_home() {
            return home.join(".config/bbrowse/bb.toml");
        }
        PathBuf::from("bb.toml")
    }

    /// Generate a default configuration file at the specified path.
    /// If the file already exists, returns an error.
    pub fn generate_default(path: &Path) -> io::Result<()> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {:?}", path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_TOML)?;
        println!("Default config generated at {:?}", path);
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from(RawConfig::default())
    }
}

const DEFAULT_TOML: &str = r##"# bb.toml - default configuration for bb

# Note:
# Commented values are the internal defaults of bb
# Use hex codes (eg. "#RRGGBB") or terminal colors ("cyan")

[general]
# show_dotfiles = false
# interleave_dirs = false
# input_timeout_ms = 100
# escape_delay_ms = 25
# scroll_margin = 5
# marks_file = "~/.local/share/bbrowse/marks.toml"

[display]
# Columns: n name, s size, p permissions, m/c/a modify/change/access time, r random rank
# columns = "nsm"
# Sort keys in priority order, each with + (ascending) or - (descending)
# sort = "+n"
# strftime pattern, or "relative"
# time_format = "%Y-%m-%d %H:%M"
# footer = "q quit  space select  enter open  h back  s sort  : shell  . dotfiles"

[theme]
# directory = "blue"
# symlink = "cyan"
# executable = "green"
# escape = "red"
# marker = "yellow"
# cursor = { fg = "black", bg = "grey" }
# path = { fg = "magenta" }
# header = { fg = "yellow" }
# footer = { fg = "darkgrey" }

# Bindings replace the built-in ones sharing a key.
# Actions starting with "+" are bb commands; anything else runs in sh with
# the selection (or the cursor entry) as "$@".
#
# [[bindings]]
# keys = ["D"]
# action = "rm -ri -- \"$@\"; \"$BB\" +refresh"
# description = "Delete"
# normal_term = true
#
# [[bindings]]
# keys = ["<c-g>"]
# action = "+cd:~/src"
# description = "Go to sources"
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sort::SortSpec;
    use tempfile::tempdir;

    #[test]
    fn generated_default_parses() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        let path = tmp.path().join("nested/bb.toml");
        Config::generate_default(&path)?;
        let config = Config::parse(&fs::read_to_string(&path)?)?;
        assert!(config.bindings().is_empty());
        assert_eq!(config.display().sort(), &SortSpec::default());

        let again = Config::generate_default(&path);
        assert!(matches!(again, Err(e) if e.kind() == io::ErrorKind::AlreadyExists));
        Ok(())
    }

    #[test]
    fn sections_flow_into_settings() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::parse(
            r#"
            [general]
            show_dotfiles = true
            scroll_margin = 2
            [display]
            columns = "nps"
            sort = "-s+n"
            [[bindings]]
            keys = ["x"]
            action = "+quit"
            "#,
        )?;
        let settings = config.browser_settings();
        assert!(settings.show_dotfiles);
        assert!(!settings.interleave);
        assert_eq!(settings.scroll_margin, 2);
        assert_eq!(settings.columns.to_string(), "nps");
        assert_eq!(settings.sort.to_string(), "-s+n");
        assert_eq!(config.bindings().len(), 1);
        Ok(())
    }

    #[test]
    fn invalid_values_fall_back() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::parse(
            r#"
            [display]
            columns = "nq"
            sort = ""
            "#,
        )?;
        assert_eq!(config.display().columns().to_string(), "nsm");
        assert_eq!(config.display().sort().to_string(), "+n");
        Ok(())
    }
}
