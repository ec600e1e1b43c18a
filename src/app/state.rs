//! Browser state for bb.
//!
//! [BrowserState] is the single mutable object shared by the command
//! interpreter, the renderer and the main loop. It owns the entry arena,
//! the current view, cursor and scroll, and the display settings.
//!
//! Cursor and scroll movement lives in [crate::app::nav].

use crate::app::marks::Marks;
use crate::core::fm::{Entry, EntryId, EntryStore, list_dir, resolve_parent};
use crate::core::sort::{SortSpec, sort_view};
use crate::error::{BrowseError, Result};
use crate::ui::columns::ColumnSpec;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Settings the state is created with. Built from the config file, or
/// defaulted in tests.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub show_dotfiles: bool,
    pub interleave: bool,
    pub sort: SortSpec,
    pub columns: ColumnSpec,
    pub scroll_margin: usize,
    pub viewport_height: usize,
    pub marks_file: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        BrowserSettings {
            show_dotfiles: false,
            interleave: false,
            sort: SortSpec::default(),
            columns: ColumnSpec::default(),
            scroll_margin: 5,
            viewport_height: 20,
            marks_file: None,
        }
    }
}

#[derive(Debug)]
pub struct BrowserState {
    pub(super) path: PathBuf,
    pub(super) store: EntryStore,
    pub(super) view: Vec<EntryId>,
    pub(super) cursor: usize,
    pub(super) scroll: usize,

    pub(super) sort: SortSpec,
    pub(super) columns: ColumnSpec,
    pub(super) show_dotfiles: bool,
    pub(super) interleave: bool,
    pub(super) scroll_margin: usize,
    pub(super) viewport_height: usize,

    pub(super) marks: Marks,

    /// Directory the next populate switches to, set by `cd` and `goto`.
    pub(super) next_path: Option<PathBuf>,
    /// Name the cursor lands on after the next populate.
    pub(super) focus: Option<OsString>,
    populated: bool,
    full_redraw: bool,
}

impl BrowserState {
    /// Opens `path` and populates the first view.
    pub fn open(path: &Path, settings: BrowserSettings) -> Result<Self> {
        let path = path
            .canonicalize()
            .map_err(|e| BrowseError::InvalidPath(format!("{}: {}", path.display(), e)))?;
        if !path.is_dir() {
            return Err(BrowseError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut state = BrowserState {
            path,
            store: EntryStore::new(),
            view: Vec::new(),
            cursor: 0,
            scroll: 0,
            sort: settings.sort,
            columns: settings.columns,
            show_dotfiles: settings.show_dotfiles,
            interleave: settings.interleave,
            scroll_margin: settings.scroll_margin,
            viewport_height: settings.viewport_height.max(1),
            marks: Marks::load(settings.marks_file),
            next_path: None,
            focus: None,
            populated: false,
            full_redraw: true,
        };
        state.populate()?;
        Ok(state)
    }

    // Getters/ accessors

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    #[inline]
    pub fn view(&self) -> &[EntryId] {
        &self.view
    }

    #[inline]
    pub fn nfiles(&self) -> usize {
        self.view.len()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    #[inline]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    #[inline]
    pub fn columns(&self) -> &ColumnSpec {
        &self.columns
    }

    #[inline]
    pub fn show_dotfiles(&self) -> bool {
        self.show_dotfiles
    }

    #[inline]
    pub fn interleave(&self) -> bool {
        self.interleave
    }

    #[inline]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    #[inline]
    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    /// Entry at view position `i`.
    pub fn entry_at(&self, i: usize) -> Option<&Entry> {
        self.view.get(i).and_then(|id| self.store.get(*id))
    }

    pub fn cursor_id(&self) -> Option<EntryId> {
        self.view.get(self.cursor).copied()
    }

    pub fn cursor_entry(&self) -> Option<&Entry> {
        self.entry_at(self.cursor)
    }

    pub fn is_selected_at(&self, i: usize) -> bool {
        self.view.get(i).is_some_and(|id| self.store.is_selected(*id))
    }

    /// Full paths of the selection, in selection order.
    pub fn selection_paths(&self) -> Vec<PathBuf> {
        self.store
            .selection()
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    /// Returns and clears the pending full redraw request.
    pub fn take_full_redraw(&mut self) -> bool {
        std::mem::take(&mut self.full_redraw)
    }

    pub fn request_full_redraw(&mut self) {
        self.full_redraw = true;
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        let height = height.max(1);
        if height != self.viewport_height {
            self.viewport_height = height;
            self.set_cursor(self.cursor as isize);
            self.full_redraw = true;
        }
    }

    // Population

    /// Lists the current directory (or the pending `cd` target) into a fresh
    /// view. Selected entries are reused through the identity table so they
    /// keep their identity and selection membership.
    pub fn populate(&mut self) -> Result<()> {
        let target = self.next_path.take().unwrap_or_else(|| self.path.clone());
        let same_dir = self.populated && target == self.path;

        let prev_identity = self.cursor_entry().map(|e| e.stat().identity());
        let prev_row = self.cursor.saturating_sub(self.scroll);
        let prev_scroll = self.scroll;

        let listing = list_dir(&target, self.show_dotfiles)?;
        let mut table = self.store.identity_table(&target);

        for id in std::mem::take(&mut self.view) {
            if let Some(entry) = self.store.get_mut(id) {
                entry.set_index(None);
            }
            self.store.release(id);
        }

        self.view.reserve(listing.len());
        for fresh in listing {
            let reused = if fresh.is_parent_ref() {
                None
            } else {
                table.remove(&fresh.stat().identity())
            };
            let id = match reused {
                Some(id) => {
                    if let Some(entry) = self.store.get_mut(id) {
                        entry.refresh_from(fresh);
                    }
                    id
                }
                None => self.store.insert(fresh),
            };
            self.view.push(id);
        }

        if self.view.is_empty() {
            return Err(BrowseError::EmptyListing(target));
        }

        self.path = target;
        self.populated = true;
        self.full_redraw = true;
        self.sort_entries();

        let focus = self.focus.take();
        if same_dir {
            let idx = prev_identity.and_then(|key| self.position_of_identity(key));
            self.restore_cursor(idx.unwrap_or(self.cursor), prev_row, Some(prev_scroll));
        } else {
            self.cursor = 0;
            self.scroll = 0;
            if let Some(idx) = focus.and_then(|name| self.find(&name)) {
                self.set_cursor(idx as isize);
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = self.view.len(),
            live = self.store.live_count(),
            refresh = same_dir,
            "populated"
        );
        Ok(())
    }

    /// Sorts the view with the active spec and puts the cursor back on the
    /// entry it was on, keeping its screen row where possible.
    pub fn resort(&mut self) {
        let prev = self.cursor_id();
        let prev_row = self.cursor.saturating_sub(self.scroll);
        self.sort_entries();
        let idx = prev.and_then(|id| self.store.get(id)).and_then(Entry::index);
        self.restore_cursor(idx.unwrap_or(0), prev_row, None);
        self.full_redraw = true;
    }

    fn sort_entries(&mut self) {
        let mut rng = rand::rng();
        sort_view(
            &mut self.store,
            &mut self.view,
            &self.sort,
            self.interleave,
            &mut rng,
        );
    }

    fn restore_cursor(&mut self, idx: usize, row: usize, scroll: Option<usize>) {
        self.scroll = scroll.unwrap_or_else(|| idx.saturating_sub(row));
        self.scroll = self.scroll.min(self.max_scroll());
        self.set_cursor(idx as isize);
    }

    fn position_of_identity(&self, key: (u64, u64)) -> Option<usize> {
        self.view
            .iter()
            .position(|id| self.store.get(*id).is_some_and(|e| e.stat().identity() == key))
    }

    /// Resolves an absolute path (against full paths) or a bare name
    /// (against display names) to a view position. First match wins.
    pub fn find(&self, name: &OsStr) -> Option<usize> {
        let path = Path::new(name);
        if path.is_absolute() {
            self.view
                .iter()
                .position(|id| self.store.get(*id).is_some_and(|e| e.path() == path))
        } else {
            self.view
                .iter()
                .position(|id| self.store.get(*id).is_some_and(|e| e.name() == name))
        }
    }

    // Selection

    /// Selects the entry at view position `i`. Returns `true` if it changed.
    pub fn select_at(&mut self, i: usize) -> bool {
        let Some(id) = self.view.get(i).copied() else {
            return false;
        };
        let changed = self.store.select(id);
        self.note_selection_change(i, changed);
        changed
    }

    pub fn deselect_at(&mut self, i: usize) -> bool {
        let Some(id) = self.view.get(i).copied() else {
            return false;
        };
        let changed = self.store.deselect(id);
        self.note_selection_change(i, changed);
        changed
    }

    pub fn toggle_at(&mut self, i: usize) -> bool {
        if self.is_selected_at(i) {
            self.deselect_at(i)
        } else {
            self.select_at(i)
        }
    }

    pub fn select_all(&mut self) -> bool {
        let mut changed = false;
        for id in self.view.clone() {
            changed |= self.store.select(id);
        }
        self.full_redraw |= changed;
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        if self.store.selection_len() == 0 {
            return false;
        }
        self.store.clear_selection();
        self.full_redraw = true;
        true
    }

    /// Selects an entry outside the current view by its absolute path. A path
    /// that resolves into the current directory selects the listed entry.
    pub fn select_path(&mut self, path: &Path) -> bool {
        let entry = match Entry::load_path(path) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot select");
                return false;
            }
        };
        if entry.parent_dir() == Some(self.path.as_path()) {
            return match self.find(entry.name()) {
                Some(idx) => self.select_at(idx),
                None => false,
            };
        }
        if self.store.find_selected_by_path(entry.path()).is_some() {
            return false;
        }
        let id = self.store.insert(entry);
        let changed = self.store.select(id);
        if !changed {
            self.store.release(id);
        }
        self.full_redraw |= changed;
        changed
    }

    /// Deselects a selected entry by its absolute path, wherever it lives.
    pub fn deselect_path(&mut self, path: &Path) -> bool {
        let path = resolve_parent(path).unwrap_or_else(|_| path.to_path_buf());
        match self.store.find_selected_by_path(&path) {
            Some(id) => {
                self.store.deselect(id);
                self.full_redraw = true;
                true
            }
            None => false,
        }
    }

    // Settings changed by commands

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.resort();
    }

    pub fn set_columns(&mut self, columns: ColumnSpec) {
        self.columns = columns;
        self.full_redraw = true;
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_show_dotfiles(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.show_dotfiles, value) != value
    }

    pub fn set_interleave(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.interleave, value) != value
    }

    pub(super) fn marks_mut(&mut self) -> &mut Marks {
        &mut self.marks
    }

    fn note_selection_change(&mut self, i: usize, changed: bool) {
        if changed && i != self.cursor {
            self.full_redraw = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn names(state: &BrowserState) -> Vec<String> {
        (0..state.nfiles())
            .filter_map(|i| state.entry_at(i))
            .map(|e| e.name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn populate_lists_parent_first_and_dirs_before_files()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        File::create(tmp.path().join("a_file"))?;
        fs::create_dir(tmp.path().join("z_dir"))?;

        let state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        assert_eq!(names(&state), vec!["..", "z_dir", "a_file"]);
        assert_eq!(state.cursor(), 0);
        Ok(())
    }

    #[test]
    fn refresh_keeps_cursor_on_same_entry() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        File::create(tmp.path().join("b"))?;
        File::create(tmp.path().join("c"))?;

        let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        let idx = state.find(OsStr::new("c")).ok_or("c missing")?;
        state.set_cursor(idx as isize);

        File::create(tmp.path().join("a"))?;
        state.populate()?;
        assert_eq!(state.cursor_entry().map(|e| e.name().to_owned()), Some("c".into()));
        assert_eq!(state.cursor(), 3);
        Ok(())
    }

    #[test]
    fn refresh_restores_scroll_in_a_tall_view() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        for i in 0..100 {
            File::create(tmp.path().join(format!("f{:03}", i)))?;
        }
        let settings = BrowserSettings {
            viewport_height: 10,
            ..BrowserSettings::default()
        };
        let mut state = BrowserState::open(tmp.path(), settings)?;
        state.set_cursor(47);
        assert_eq!((state.cursor(), state.scroll()), (47, 42));

        state.populate()?;
        assert_eq!((state.cursor(), state.scroll()), (47, 42));

        // A new entry above the cursor shifts both by one.
        File::create(tmp.path().join("a_new"))?;
        state.populate()?;
        assert_eq!((state.cursor(), state.scroll()), (48, 43));
        assert_eq!(state.cursor_entry().map(|e| e.name().to_owned()), Some("f046".into()));
        Ok(())
    }

    #[test]
    fn refresh_reuses_selected_entries() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        File::create(tmp.path().join("keep"))?;

        let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        let idx = state.find(OsStr::new("keep")).ok_or("keep missing")?;
        let id = state.view()[idx];
        assert!(state.select_at(idx));

        fs::rename(tmp.path().join("keep"), tmp.path().join("renamed"))?;
        state.populate()?;

        let new_idx = state.find(OsStr::new("renamed")).ok_or("renamed missing")?;
        assert_eq!(state.view()[new_idx], id);
        assert!(state.is_selected_at(new_idx));
        assert_eq!(state.store().selection_len(), 1);
        Ok(())
    }

    #[test]
    fn find_by_name_and_absolute_path() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        File::create(tmp.path().join("needle"))?;

        let state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        let by_name = state.find(OsStr::new("needle"));
        let by_path = state.find(state.path().join("needle").as_os_str());
        assert!(by_name.is_some());
        assert_eq!(by_name, by_path);
        assert_eq!(state.find(OsStr::new("missing")), None);
        Ok(())
    }

    #[test]
    fn parent_reference_is_never_selected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        let mut state = BrowserState::open(tmp.path(), BrowserSettings::default())?;
        assert!(!state.select_at(0));
        assert!(!state.select_all());
        assert_eq!(state.store().selection_len(), 0);
        Ok(())
    }

    #[test]
    fn open_rejects_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempdir()?;
        let file = tmp.path().join("plain");
        File::create(&file)?;
        let result = BrowserState::open(&file, BrowserSettings::default());
        assert!(matches!(result, Err(BrowseError::InvalidPath(_))));
        Ok(())
    }
}
