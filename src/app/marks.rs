//! Persistent marks for `mark:` and `jump:`.
//!
//! A mark maps one character to a directory. Marks are stored as a TOML
//! table in the marks file and written back on every change.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MarksFile {
    #[serde(default)]
    marks: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Default)]
pub struct Marks {
    file: Option<PathBuf>,
    marks: BTreeMap<char, PathBuf>,
}

impl Marks {
    /// Loads marks from `file`. A missing or unreadable file gives an empty
    /// set; `None` keeps marks in memory only.
    pub fn load(file: Option<PathBuf>) -> Self {
        let marks = file
            .as_deref()
            .and_then(|path| match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<MarksFile>(&content) {
                    Ok(parsed) => Some(
                        parsed
                            .marks
                            .into_iter()
                            .filter_map(|(k, v)| single_char(&k).map(|c| (c, v)))
                            .collect(),
                    ),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring marks file");
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();
        Marks { file, marks }
    }

    /// Default location under the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("bbrowse").join("marks.toml"))
    }

    pub fn get(&self, key: char) -> Option<&Path> {
        self.marks.get(&key).map(PathBuf::as_path)
    }

    /// Sets a mark and persists the whole table.
    pub fn set(&mut self, key: char, path: PathBuf) -> io::Result<()> {
        self.marks.insert(key, path);
        self.save()
    }

    fn save(&self) -> io::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&MarksFile {
            marks: self
                .marks
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        })
        .map_err(io::Error::other)?;
        fs::write(file, content)
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
