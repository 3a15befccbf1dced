#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A queued mutation against a file-mode pak. Identity is the entry name, since indices shift on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    AddFile { name: String, path: PathBuf },
    AddMemory { name: String, data: Vec<u8> },
    ModifyFile { name: String, path: PathBuf },
    ModifyMemory { name: String, data: Vec<u8> },
    Remove { name: String },
}

impl Change {
    pub fn name(&self) -> &str {
        match self {
            Change::AddFile { name, .. }
            | Change::AddMemory { name, .. }
            | Change::ModifyFile { name, .. }
            | Change::ModifyMemory { name, .. }
            | Change::Remove { name } => name,
        }
    }
}

/// Where the bytes of a replaced or appended entry come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source<'a> {
    File(&'a Path),
    Memory(&'a [u8]),
}

/// Net effect of every change queued against one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved<'a> {
    /// `None` means the name ends up removed.
    pub source: Option<Source<'a>>,
    /// An add was seen since the last remove, so a missing name gets appended.
    pub creates: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    changes: Vec<Change>,
}

impl ChangeLog {
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Fold the log per name, last change wins. Names keep the order they were first mentioned in.
    pub fn resolve(&self) -> Vec<(&str, Resolved<'_>)> {
        let mut out: Vec<(&str, Resolved<'_>)> = Vec::new();
        let mut pos: HashMap<&str, usize> = HashMap::new();

        for change in &self.changes {
            let slot = *pos.entry(change.name()).or_insert_with(|| {
                out.push((
                    change.name(),
                    Resolved {
                        source: None,
                        creates: false,
                    },
                ));
                out.len() - 1
            });
            let r = &mut out[slot].1;

            match change {
                Change::AddFile { path, .. } => {
                    r.source = Some(Source::File(path));
                    r.creates = true;
                }
                Change::AddMemory { data, .. } => {
                    r.source = Some(Source::Memory(data));
                    r.creates = true;
                }
                Change::ModifyFile { path, .. } => r.source = Some(Source::File(path)),
                Change::ModifyMemory { data, .. } => r.source = Some(Source::Memory(data)),
                Change::Remove { .. } => {
                    r.source = None;
                    r.creates = false;
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(name: &str, data: &[u8]) -> Change {
        Change::AddMemory {
            name: name.into(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn last_change_wins() {
        let mut log = ChangeLog::default();
        log.push(add("a", b"one"));
        log.push(Change::ModifyMemory {
            name: "a".into(),
            data: b"two".to_vec(),
        });

        let r = log.resolve();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].0, "a");
        assert_eq!(r[0].1.source, Some(Source::Memory(b"two")));
        assert!(r[0].1.creates);
    }

    #[test]
    fn remove_cancels_pending_add() {
        let mut log = ChangeLog::default();
        log.push(add("a", b"x"));
        log.push(Change::Remove { name: "a".into() });

        let r = log.resolve();
        assert_eq!(r[0].1.source, None);
        assert!(!r[0].1.creates);
    }

    #[test]
    fn modify_alone_does_not_create() {
        let mut log = ChangeLog::default();
        log.push(Change::ModifyFile {
            name: "b".into(),
            path: PathBuf::from("b.bin"),
        });

        let r = log.resolve();
        assert!(!r[0].1.creates);
        assert_eq!(r[0].1.source, Some(Source::File(Path::new("b.bin"))));
    }

    #[test]
    fn names_keep_first_mention_order() {
        let mut log = ChangeLog::default();
        log.push(add("z", b"1"));
        log.push(add("a", b"2"));
        log.push(add("z", b"3"));

        let names: Vec<&str> = log.resolve().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["z", "a"]);
    }
}
