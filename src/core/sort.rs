//! Multi-key sorting of the view.
//!
//! A [SortSpec] is an ordered chain of [SortKey]s: the first key decides,
//! later keys only break ties. Independent of the chain, the parent
//! reference `..` always comes first and directories come before files
//! (unless interleaving is switched on).
//!
//! Written as text, a spec is a list of method characters, each optionally
//! preceded by `+` (ascending) or `-` (descending), eg. `+n-s`.

use crate::core::fm::{Entry, EntryId, EntryStore};

use rand::Rng;
use rand::seq::SliceRandom;

use std::cmp::Ordering;
use std::fmt;
use std::os::unix::ffi::OsStrExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMethod {
    Name,
    Size,
    Permissions,
    ModifyTime,
    ChangeTime,
    AccessTime,
    Random,
}

impl SortMethod {
    pub const ALL: [SortMethod; 7] = [
        SortMethod::Name,
        SortMethod::Size,
        SortMethod::Permissions,
        SortMethod::ModifyTime,
        SortMethod::ChangeTime,
        SortMethod::AccessTime,
        SortMethod::Random,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_char() == c)
    }

    pub fn as_char(self) -> char {
        match self {
            SortMethod::Name => 'n',
            SortMethod::Size => 's',
            SortMethod::Permissions => 'p',
            SortMethod::ModifyTime => 'm',
            SortMethod::ChangeTime => 'c',
            SortMethod::AccessTime => 'a',
            SortMethod::Random => 'r',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub method: SortMethod,
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Parses `[+-]method...`. Repeated methods keep their first occurrence.
    /// Returns `None` for an empty spec or an unknown method character.
    pub fn parse(s: &str) -> Option<Self> {
        let mut keys: Vec<SortKey> = Vec::new();
        let mut reverse = false;
        for c in s.chars() {
            match c {
                '+' => reverse = false,
                '-' => reverse = true,
                c => {
                    let method = SortMethod::from_char(c)?;
                    if !keys.iter().any(|k| k.method == method) {
                        keys.push(SortKey { method, reverse });
                    }
                    reverse = false;
                }
            }
        }
        if keys.is_empty() {
            None
        } else {
            Some(SortSpec { keys })
        }
    }

    #[inline]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    #[inline]
    pub fn primary(&self) -> SortKey {
        self.keys[0]
    }

    pub fn uses_random(&self) -> bool {
        self.keys.iter().any(|k| k.method == SortMethod::Random)
    }

    /// Spec with `method` moved to the front. If it already is the primary
    /// key its direction flips, otherwise it starts ascending.
    pub fn with_primary(&self, method: SortMethod) -> SortSpec {
        let reverse = match self.keys.first() {
            Some(first) if first.method == method => !first.reverse,
            _ => false,
        };
        let mut keys = vec![SortKey { method, reverse }];
        keys.extend(self.keys.iter().filter(|k| k.method != method).copied());
        SortSpec { keys }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            keys: vec![SortKey {
                method: SortMethod::Name,
                reverse: false,
            }],
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.keys {
            write!(f, "{}{}", if key.reverse { '-' } else { '+' }, key.method.as_char())?;
        }
        Ok(())
    }
}

/// Case-insensitive comparison where runs of digits compare by numeric value.
pub fn natural_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let (start_a, start_b) = (i, j);
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let run_a = trim_zeros(&a[start_a..i]);
            let run_b = trim_zeros(&b[start_b..j]);
            let ord = run_a.len().cmp(&run_b.len()).then_with(|| run_a.cmp(run_b));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = a[i].to_ascii_lowercase().cmp(&b[j].to_ascii_lowercase());
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let start = digits.iter().position(|d| *d != b'0').unwrap_or(digits.len());
    &digits[start..]
}

fn compare_by(method: SortMethod, a: &Entry, b: &Entry) -> Ordering {
    let (sa, sb) = (a.stat(), b.stat());
    match method {
        SortMethod::Name => natural_cmp(a.name().as_bytes(), b.name().as_bytes()),
        SortMethod::Size => sa.size.cmp(&sb.size),
        SortMethod::Permissions => sa.permissions().cmp(&sb.permissions()),
        SortMethod::ModifyTime => sa.mtime.cmp(&sb.mtime),
        SortMethod::ChangeTime => sa.ctime.cmp(&sb.ctime),
        SortMethod::AccessTime => sa.atime.cmp(&sb.atime),
        SortMethod::Random => a.shuffle_rank().cmp(&b.shuffle_rank()),
    }
}

/// Full ordering of two entries under `spec`.
pub fn compare_entries(a: &Entry, b: &Entry, spec: &SortSpec, interleave: bool) -> Ordering {
    if a.is_parent_ref() != b.is_parent_ref() {
        return if a.is_parent_ref() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    if !interleave && a.is_dir() != b.is_dir() {
        return if a.is_dir() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    for key in spec.keys() {
        let ord = compare_by(key.method, a, b);
        let ord = if key.reverse { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.name().as_bytes().cmp(b.name().as_bytes())
}

/// Shuffles each partition of the view independently and records every
/// entry's position inside its partition as its shuffle rank.
pub fn shuffle_ranks<R: Rng + ?Sized>(
    store: &mut EntryStore,
    view: &[EntryId],
    interleave: bool,
    rng: &mut R,
) {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for id in view {
        let entry = &store[*id];
        if entry.is_parent_ref() {
            continue;
        }
        if !interleave && entry.is_dir() {
            dirs.push(*id);
        } else {
            files.push(*id);
        }
    }
    for partition in [&mut dirs, &mut files] {
        partition.shuffle(rng);
        for (rank, id) in partition.iter().enumerate() {
            if let Some(entry) = store.get_mut(*id) {
                entry.set_shuffle_rank(rank + 1);
            }
        }
    }
}

/// Sorts the view in place and updates every entry's view index.
pub fn sort_view<R: Rng + ?Sized>(
    store: &mut EntryStore,
    view: &mut [EntryId],
    spec: &SortSpec,
    interleave: bool,
    rng: &mut R,
) {
    if spec.uses_random() {
        shuffle_ranks(store, view, interleave, rng);
    }
    view.sort_by(|a, b| compare_entries(&store[*a], &store[*b], spec, interleave));
    for (i, id) in view.iter().enumerate() {
        if let Some(entry) = store.get_mut(*id) {
            entry.set_index(Some(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fm::{Stat, Timestamp};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn entry(name: &str, is_dir: bool, size: u64, mtime: (i64, i64)) -> Entry {
        let stat = Stat {
            size,
            mode: 0o644,
            mtime: Timestamp {
                sec: mtime.0,
                nsec: mtime.1,
            },
            ..Stat::default()
        };
        Entry::new(
            OsString::from(name),
            PathBuf::from("/t").join(name),
            stat,
            None,
            is_dir,
        )
    }

    fn sorted_names(store: &mut EntryStore, ids: &mut Vec<EntryId>, spec: &str) -> Vec<String> {
        let spec = SortSpec::parse(spec).expect("valid spec");
        let mut rng = StdRng::seed_from_u64(7);
        sort_view(store, ids, &spec, false, &mut rng);
        ids.iter()
            .map(|id| store[*id].name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn natural_name_order() {
        let mut store = EntryStore::new();
        let mut ids: Vec<EntryId> = ["file2", "file10", "file1"]
            .iter()
            .map(|n| store.insert(entry(n, false, 0, (0, 0))))
            .collect();
        assert_eq!(
            sorted_names(&mut store, &mut ids, "+n"),
            vec!["file1", "file2", "file10"]
        );
        assert_eq!(
            sorted_names(&mut store, &mut ids, "-n"),
            vec!["file10", "file2", "file1"]
        );
    }

    #[test]
    fn natural_cmp_is_case_insensitive() {
        assert_eq!(natural_cmp(b"Alpha", b"alpha"), Ordering::Equal);
        assert_eq!(natural_cmp(b"a007", b"a7"), Ordering::Equal);
        assert_eq!(natural_cmp(b"b", b"A"), Ordering::Greater);
        assert_eq!(natural_cmp(b"x9y", b"x10"), Ordering::Less);
    }

    #[test]
    fn directories_first_for_every_method_and_direction() {
        let mut store = EntryStore::new();
        let mut ids = vec![
            store.insert(entry("zz_file", false, 1, (5, 0))),
            store.insert(entry("big_file", false, 900, (1, 0))),
            store.insert(entry("a_dir", true, 4096, (9, 0))),
            store.insert(entry("..", true, 4096, (0, 0))),
            store.insert(entry("m_dir", true, 10, (2, 0))),
        ];
        for method in SortMethod::ALL {
            for sign in ['+', '-'] {
                let spec = format!("{}{}", sign, method.as_char());
                let names = sorted_names(&mut store, &mut ids, &spec);
                assert_eq!(names[0], "..", "spec {spec}");
                let first_file = names.iter().position(|n| n.ends_with("file")).unwrap_or(0);
                assert!(
                    names[first_file..].iter().all(|n| n.ends_with("file")),
                    "spec {spec}: {names:?}"
                );
                assert_eq!(first_file, 3, "spec {spec}: {names:?}");
            }
        }
    }

    #[test]
    fn ties_cascade_to_next_key() {
        let mut store = EntryStore::new();
        let mut ids = vec![
            store.insert(entry("b", false, 10, (0, 0))),
            store.insert(entry("a", false, 10, (0, 0))),
            store.insert(entry("c", false, 5, (0, 0))),
        ];
        assert_eq!(sorted_names(&mut store, &mut ids, "-s+n"), vec!["a", "b", "c"]);
        assert_eq!(sorted_names(&mut store, &mut ids, "-s-n"), vec!["b", "a", "c"]);
    }

    #[test]
    fn timestamps_use_subsecond_precision() {
        let mut store = EntryStore::new();
        let mut ids = vec![
            store.insert(entry("later", false, 0, (100, 900))),
            store.insert(entry("earlier", false, 0, (100, 100))),
        ];
        assert_eq!(sorted_names(&mut store, &mut ids, "+m"), vec!["earlier", "later"]);
    }

    #[test]
    fn random_ranks_stay_within_partitions() {
        let mut store = EntryStore::new();
        let mut ids: Vec<EntryId> = (0..6)
            .map(|i| store.insert(entry(&format!("f{i}"), false, 0, (0, 0))))
            .collect();
        ids.extend((0..4).map(|i| store.insert(entry(&format!("d{i}"), true, 0, (0, 0)))));

        let names = sorted_names(&mut store, &mut ids, "r");
        assert!(names[..4].iter().all(|n| n.starts_with('d')));
        assert!(names[4..].iter().all(|n| n.starts_with('f')));

        let dir_ranks: Vec<usize> = ids[..4].iter().map(|id| store[*id].shuffle_rank()).collect();
        let file_ranks: Vec<usize> = ids[4..].iter().map(|id| store[*id].shuffle_rank()).collect();
        assert_eq!(dir_ranks, vec![1, 2, 3, 4]);
        assert_eq!(file_ranks, vec![1, 2, 3, 4, 5, 6]);
        assert!(ids.iter().enumerate().all(|(i, id)| store[*id].index() == Some(i)));
    }

    #[test]
    fn spec_parsing_and_display() {
        let spec = SortSpec::parse("-s+n").expect("valid");
        assert_eq!(spec.to_string(), "-s+n");
        assert_eq!(
            spec.primary(),
            SortKey {
                method: SortMethod::Size,
                reverse: true
            }
        );
        assert_eq!(SortSpec::parse("nm").map(|s| s.to_string()), Some("+n+m".into()));
        assert_eq!(SortSpec::parse("nsn").map(|s| s.keys().len()), Some(2));
        assert!(SortSpec::parse("").is_none());
        assert!(SortSpec::parse("+x").is_none());
    }

    #[test]
    fn with_primary_toggles_direction() {
        let spec = SortSpec::parse("+n+s").expect("valid");
        assert_eq!(spec.with_primary(SortMethod::Name).to_string(), "-n+s");
        assert_eq!(spec.with_primary(SortMethod::Size).to_string(), "+s+n");
    }
}
