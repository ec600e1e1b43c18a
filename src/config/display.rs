//! Display configuration options for bb.
//!
//! [Display] is read from the `[display]` table of bb.toml and turned into
//! [InternalDisplay], which holds the parsed column spec, sort spec and time
//! format. Values that fail to parse fall back to their defaults with a
//! warning.

use crate::core::formatter::TimeFormat;
use crate::core::sort::SortSpec;
use crate::ui::columns::ColumnSpec;

use serde::Deserialize;

pub const DEFAULT_FOOTER: &str = "q quit  space select  enter open  h back  s sort  : shell  . dotfiles";

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Display {
    columns: String,
    sort: String,
    time_format: String,
    footer: String,
}

impl Default for Display {
    fn default() -> Self {
        Display {
            columns: "nsm".into(),
            sort: "+n".into(),
            time_format: crate::core::formatter::DEFAULT_TIME_FORMAT.into(),
            footer: DEFAULT_FOOTER.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InternalDisplay {
    columns: ColumnSpec,
    sort: SortSpec,
    time_format: TimeFormat,
    footer: String,
}

impl From<Display> for InternalDisplay {
    fn from(d: Display) -> Self {
        let columns = ColumnSpec::parse(&d.columns).unwrap_or_else(|| {
            eprintln!("[Warning] invalid columns {:?}, using defaults", d.columns);
            ColumnSpec::default()
        });
        let sort = SortSpec::parse(&d.sort).unwrap_or_else(|| {
            eprintln!("[Warning] invalid sort {:?}, using defaults", d.sort);
            SortSpec::default()
        });
        Self {
            columns,
            sort,
            time_format: TimeFormat::parse(&d.time_format),
            footer: d.footer,
        }
    }
}

impl Default for InternalDisplay {
    fn default() -> Self {
        InternalDisplay::from(Display::default())
    }
}

impl InternalDisplay {
    #[inline]
    pub fn columns(&self) -> &ColumnSpec {
        &self.columns
    }

    #[inline]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    #[inline]
    pub fn time_format(&self) -> &TimeFormat {
        &self.time_format
    }

    #[inline]
    pub fn footer(&self) -> &str {
        &self.footer
    }
}
