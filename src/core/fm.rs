//! Directory entries and the arena that owns them.
//!
//! Provides the [Entry] struct which is used throughout bb, the [EntryStore]
//! arena that owns every live entry, and [list_dir] which reads a directory
//! into fresh entries.
//!
//! An entry lives in the arena for as long as the current view or the
//! selection set refers to it. Once it is in neither, [EntryStore::release]
//! frees its slot.

use crate::core::formatter::has_nonprintable;
use crate::error::{BrowseError, Result};

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::ops::Index;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Seconds and nanoseconds since the epoch, as reported by `stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub sec: i64,
    pub nsec: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileKind {
    #[default]
    File,
    Directory,
    Symlink,
    Other,
}

/// Metadata snapshot taken when the entry was listed. Never follows symlinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub kind: FileKind,
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub size: u64,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
    pub atime: Timestamp,
}

impl Stat {
    pub fn from_metadata(md: &fs::Metadata) -> Self {
        let ft = md.file_type();
        let kind = if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };
        Stat {
            kind,
            dev: md.dev(),
            ino: md.ino(),
            mode: md.mode(),
            size: md.size(),
            mtime: Timestamp {
                sec: md.mtime(),
                nsec: md.mtime_nsec(),
            },
            ctime: Timestamp {
                sec: md.ctime(),
                nsec: md.ctime_nsec(),
            },
            atime: Timestamp {
                sec: md.atime(),
                nsec: md.atime_nsec(),
            },
        }
    }

    /// Key used by the identity table.
    #[inline]
    pub fn identity(&self) -> (u64, u64) {
        (self.dev, self.ino)
    }

    #[inline]
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// Represents a single item of a directory listing.
#[derive(Debug, Clone)]
pub struct Entry {
    name: OsString,
    path: PathBuf,
    link_target: Option<PathBuf>,
    stat: Stat,
    flags: u8,
    shuffle_rank: usize,
    index: Option<usize>,
}

impl Entry {
    // Flag bit definitions
    pub(crate) const IS_DIR: u8 = 1 << 0;
    pub(crate) const IS_PARENT_REF: u8 = 1 << 1;
    pub(crate) const IS_EXECUTABLE: u8 = 1 << 2;
    pub(crate) const NAME_NONPRINT: u8 = 1 << 3;
    pub(crate) const LINK_NONPRINT: u8 = 1 << 4;

    const EXEC_BITS: u32 = 0o111;

    pub fn new(
        name: OsString,
        path: PathBuf,
        stat: Stat,
        link_target: Option<PathBuf>,
        is_dir: bool,
    ) -> Self {
        let mut flags = 0u8;
        if is_dir {
            flags |= Self::IS_DIR;
        }
        if name.as_bytes() == b".." {
            flags |= Self::IS_PARENT_REF;
        }
        if !is_dir && stat.kind != FileKind::Symlink && stat.mode & Self::EXEC_BITS != 0 {
            flags |= Self::IS_EXECUTABLE;
        }
        if has_nonprintable(name.as_bytes()) {
            flags |= Self::NAME_NONPRINT;
        }
        if let Some(target) = &link_target
            && has_nonprintable(target.as_os_str().as_bytes())
        {
            flags |= Self::LINK_NONPRINT;
        }
        Entry {
            name,
            path,
            link_target,
            stat,
            flags,
            shuffle_rank: 0,
            index: None,
        }
    }

    /// Stats `dir/name` without following symlinks. A symlink additionally
    /// has its target resolved once to decide whether it behaves as a directory.
    pub fn load(dir: &Path, name: &OsStr) -> io::Result<Self> {
        let path = dir.join(name);
        let md = fs::symlink_metadata(&path)?;
        let stat = Stat::from_metadata(&md);
        let (link_target, is_dir) = if stat.kind == FileKind::Symlink {
            let target = fs::read_link(&path).ok();
            let is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
            (target, is_dir)
        } else {
            (None, md.is_dir())
        };
        Ok(Entry::new(name.to_os_string(), path, stat, link_target, is_dir))
    }

    /// Loads a single entry from its full path, outside of any listing. The
    /// directory part is canonicalized so the entry matches the one a listing
    /// of that directory would produce.
    pub fn load_path(path: &Path) -> io::Result<Self> {
        let resolved = resolve_parent(path)?;
        match (resolved.parent(), resolved.file_name()) {
            (Some(dir), Some(name)) => Self::load(dir, name),
            _ => Err(no_file_name()),
        }
    }

    /// The `..` entry of `dir`. At the filesystem root it refers to the root itself.
    pub fn parent_of(dir: &Path) -> io::Result<Self> {
        let target = dir.parent().unwrap_or(dir);
        let md = fs::metadata(target)?;
        Ok(Entry::new(
            OsString::from(".."),
            target.to_path_buf(),
            Stat::from_metadata(&md),
            None,
            true,
        ))
    }

    // Accessors

    #[inline]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the entry was listed in.
    pub fn parent_dir(&self) -> Option<&Path> {
        if self.is_parent_ref() {
            None
        } else {
            self.path.parent()
        }
    }

    #[inline]
    pub fn link_target(&self) -> Option<&Path> {
        self.link_target.as_deref()
    }

    #[inline]
    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags & Self::IS_DIR != 0
    }

    #[inline]
    pub fn is_parent_ref(&self) -> bool {
        self.flags & Self::IS_PARENT_REF != 0
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.stat.kind == FileKind::Symlink
    }

    #[inline]
    pub fn is_executable(&self) -> bool {
        self.flags & Self::IS_EXECUTABLE != 0
    }

    #[inline]
    pub fn name_has_nonprint(&self) -> bool {
        self.flags & Self::NAME_NONPRINT != 0
    }

    #[inline]
    pub fn link_has_nonprint(&self) -> bool {
        self.flags & Self::LINK_NONPRINT != 0
    }

    #[inline]
    pub fn shuffle_rank(&self) -> usize {
        self.shuffle_rank
    }

    pub(crate) fn set_shuffle_rank(&mut self, rank: usize) {
        self.shuffle_rank = rank;
    }

    /// Position in the current view, `None` when not visible.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }

    /// Takes over the freshly listed name and metadata of `fresh`, keeping
    /// identity, view index and shuffle rank.
    pub(crate) fn refresh_from(&mut self, fresh: Entry) {
        let index = self.index;
        let rank = self.shuffle_rank;
        *self = fresh;
        self.index = index;
        self.shuffle_rank = rank;
    }
}

/// Stable handle to an entry inside an [EntryStore].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

/// Arena owning every live entry, plus the cross-directory selection set.
///
/// The selection maps each selected id to the sequence number it was selected
/// with, so membership tests and removal stay O(1) while output keeps the
/// order of selection.
#[derive(Debug, Default)]
pub struct EntryStore {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    selected: HashMap<EntryId, u64>,
    next_seq: u64,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: Entry) -> EntryId {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(entry);
            EntryId(slot)
        } else {
            self.slots.push(Some(entry));
            EntryId(self.slots.len() - 1)
        }
    }

    #[inline]
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live entries, in the view or selected.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Frees the entry unless the view or the selection still refers to it.
    /// Returns `true` if the slot was freed.
    pub fn release(&mut self, id: EntryId) -> bool {
        if self.selected.contains_key(&id) {
            return false;
        }
        match self.get(id) {
            Some(entry) if entry.index.is_none() => {}
            _ => return false,
        }
        self.slots[id.0] = None;
        self.free.push(id.0);
        true
    }

    // Selection

    #[inline]
    pub fn is_selected(&self, id: EntryId) -> bool {
        self.selected.contains_key(&id)
    }

    /// Adds the entry to the selection. The parent reference is never
    /// selectable. Returns `true` only if the entry was newly added.
    pub fn select(&mut self, id: EntryId) -> bool {
        match self.get(id) {
            Some(entry) if !entry.is_parent_ref() => {}
            _ => return false,
        }
        if self.selected.contains_key(&id) {
            return false;
        }
        self.selected.insert(id, self.next_seq);
        self.next_seq += 1;
        true
    }

    /// Removes the entry from the selection, freeing it when it is not in
    /// the current view. Returns `true` if it was selected.
    pub fn deselect(&mut self, id: EntryId) -> bool {
        if self.selected.remove(&id).is_none() {
            return false;
        }
        self.release(id);
        true
    }

    pub fn clear_selection(&mut self) {
        let ids: Vec<EntryId> = self.selected.keys().copied().collect();
        for id in ids {
            self.deselect(id);
        }
    }

    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    /// Selected ids in the order they were selected.
    pub fn selection(&self) -> Vec<EntryId> {
        let mut ids: Vec<(u64, EntryId)> =
            self.selected.iter().map(|(id, seq)| (*seq, *id)).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn find_selected_by_path(&self, path: &Path) -> Option<EntryId> {
        self.selected
            .keys()
            .copied()
            .find(|id| self.get(*id).is_some_and(|e| e.path() == path))
    }

    /// Identity table for a population of `dir`: every selected entry listed
    /// in `dir`, keyed by `(device, inode)`.
    pub fn identity_table(&self, dir: &Path) -> HashMap<(u64, u64), EntryId> {
        let mut table = HashMap::with_capacity(self.selected.len() * 2);
        for id in self.selected.keys() {
            if let Some(entry) = self.get(*id)
                && entry.parent_dir() == Some(dir)
            {
                table.insert(entry.stat().identity(), *id);
            }
        }
        table
    }
}

impl Index<EntryId> for EntryStore {
    type Output = Entry;

    fn index(&self, id: EntryId) -> &Entry {
        self.get(id).expect("stale entry id")
    }
}

/// `path` with its directory part canonicalized. The last component is kept
/// as given since it may itself be a symlink.
pub fn resolve_parent(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(no_file_name)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    Ok(fs::canonicalize(dir)?.join(name))
}

fn no_file_name() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
}

/// Reads `dir` into fresh entries. The self reference is skipped and a
/// parent reference `..` always comes first. Items that vanish between
/// listing and stat are skipped.
pub fn list_dir(dir: &Path, show_dotfiles: bool) -> Result<Vec<Entry>> {
    let open_err = |source| BrowseError::OpenDir {
        path: dir.to_path_buf(),
        source,
    };
    let read = fs::read_dir(dir).map_err(open_err)?;

    let mut entries = Vec::with_capacity(256);
    entries.push(Entry::parent_of(dir).map_err(open_err)?);

    for item in read {
        let Ok(item) = item else {
            continue;
        };
        let name = item.file_name();
        if !show_dotfiles && name.as_bytes().first() == Some(&b'.') {
            continue;
        }
        match Entry::load(dir, &name) {
            Ok(entry) => entries.push(entry),
            Err(_) => continue,
        }
    }
    Ok(entries)
}
