#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::pak::change::{Change, ChangeLog};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{fit_name, payload_start, Entry};
use crate::pak::io::{alloc_buf, copy_exact};
use crate::pak::read::{read_table, read_table_mem};
use crate::pak::write::compact;

enum Backing<'a> {
    /// Reopened per operation; only the table and the change log live in memory.
    File { path: PathBuf, changes: ChangeLog },
    /// Borrowed from the caller for the lifetime of the handle.
    Memory(&'a [u8]),
}

/// An open pak, either file-backed (mutable through a change log) or a read-only view over a buffer.
///
/// Entry indices are only stable within one generation: every [`Pak::write`] may renumber them.
pub struct Pak<'a> {
    backing: Backing<'a>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    file_size: u32,
}

fn build_index(entries: &[Entry]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        index.entry(e.name.clone()).or_insert(i);
    }
    index
}

impl Pak<'static> {
    /// Open a pak file, creating an empty one if `path` does not exist.
    ///
    /// An empty file or a header with zero entries opens as an empty pak that only accepts additions.
    pub fn open_file(path: impl AsRef<Path>) -> PakResult<Pak<'static>> {
        let path = path.as_ref();
        Self::open_file_impl(path)
            .inspect_err(|e| tracing::warn!(path = %path.display(), "unable to open pak: {e}"))
    }

    fn open_file_impl(path: &Path) -> PakResult<Pak<'static>> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let table = read_table(&mut file)?;
        if table.entries.is_empty() {
            tracing::debug!(path = %path.display(), "empty pak, additions only");
        } else {
            tracing::debug!(path = %path.display(), entries = table.entries.len(), "opened pak");
        }

        Ok(Pak {
            index: build_index(&table.entries),
            entries: table.entries,
            file_size: table.header.file_size,
            backing: Backing::File {
                path: path.to_path_buf(),
                changes: ChangeLog::default(),
            },
        })
    }
}

impl<'a> Pak<'a> {
    /// View a pak held in memory. Blobs extracted from it borrow `data`.
    pub fn open_memory(data: &'a [u8]) -> PakResult<Pak<'a>> {
        if data.is_empty() {
            tracing::warn!("no pak data passed");
            return Err(PakError::Argument("empty pak buffer".into()));
        }

        let table = read_table_mem(data).inspect_err(|e| tracing::warn!("invalid pak buffer: {e}"))?;
        Ok(Pak {
            index: build_index(&table.entries),
            entries: table.entries,
            file_size: table.header.file_size,
            backing: Backing::Memory(data),
        })
    }

    pub fn is_file_mode(&self) -> bool {
        matches!(self.backing, Backing::File { .. })
    }

    /// Backing file, if this is a file-mode pak.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path),
            Backing::Memory(_) => None,
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Total size recorded in the header.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> PakResult<&Entry> {
        self.entries.get(index).ok_or_else(|| {
            tracing::warn!(index, count = self.entries.len(), "entry index out of range");
            PakError::NotFound(format!(
                "entry index {index} (pak has {} entries)",
                self.entries.len()
            ))
        })
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.name.as_str())
    }

    pub fn offset(&self, index: usize) -> Option<u32> {
        self.entries.get(index).map(|e| e.offset)
    }

    pub fn size(&self, index: usize) -> Option<u32> {
        self.entries.get(index).map(|e| e.size)
    }

    /// Index of the first entry called `name`.
    pub fn find(&self, name: &str) -> PakResult<usize> {
        self.index.get(name).copied().ok_or_else(|| {
            tracing::debug!(entry = name, "no such entry");
            PakError::NotFound(name.to_string())
        })
    }

    /// Bytes of entry `index`. File mode reads into a new buffer; memory mode borrows the backing slice.
    pub fn extract(&self, index: usize) -> PakResult<Cow<'a, [u8]>> {
        let entry = self.entry(index)?;
        match &self.backing {
            Backing::Memory(data) => {
                let data: &'a [u8] = *data;
                Ok(Cow::Borrowed(&data[entry.offset as usize..entry.end() as usize]))
            }
            Backing::File { path, .. } => {
                let mut buf = alloc_buf(entry.size as usize)?;
                read_payload(path, entry, &mut buf)
                    .inspect_err(|e| tracing::warn!(entry = %entry.name, "extract failed: {e}"))?;
                Ok(Cow::Owned(buf))
            }
        }
    }

    /// Copy entry `index` into `dst` without allocating. Returns the number of bytes written.
    pub fn extract_into(&self, index: usize, dst: &mut [u8]) -> PakResult<usize> {
        if dst.is_empty() {
            tracing::warn!("empty output buffer");
            return Err(PakError::Argument("empty output buffer".into()));
        }

        let entry = self.entry(index)?;
        let size = entry.size as usize;
        if dst.len() < size {
            tracing::warn!(entry = %entry.name, size, cap = dst.len(), "output buffer too small");
            return Err(PakError::Argument(format!(
                "output buffer of {} bytes cannot hold {} ({size} bytes)",
                dst.len(),
                entry.name
            )));
        }

        match &self.backing {
            Backing::Memory(data) => {
                dst[..size].copy_from_slice(&data[entry.offset as usize..entry.end() as usize]);
            }
            Backing::File { path, .. } => {
                read_payload(path, entry, &mut dst[..size])
                    .inspect_err(|e| tracing::warn!(entry = %entry.name, "extract failed: {e}"))?;
            }
        }
        Ok(size)
    }

    fn changes_mut(&mut self, op: &str) -> PakResult<&mut ChangeLog> {
        match &mut self.backing {
            Backing::File { changes, .. } => Ok(changes),
            Backing::Memory(_) => {
                tracing::warn!("pak must be opened in file mode to {op}");
                Err(PakError::Argument(format!(
                    "pak must be opened in file mode to {op}"
                )))
            }
        }
    }

    fn queue_file(&mut self, name: &str, path: &Path, modify: bool) -> PakResult<()> {
        let op = if modify { "modify entries" } else { "add entries" };
        self.changes_mut(op)?;
        let name = fit_name(name)?;

        let meta = std::fs::metadata(path)
            .inspect_err(|e| tracing::warn!(path = %path.display(), "unable to stat source: {e}"))?;
        if !meta.is_file() {
            return Err(PakError::Argument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let path = path.to_path_buf();
        let change = if modify {
            Change::ModifyFile { name, path }
        } else {
            Change::AddFile { name, path }
        };
        self.changes_mut(op)?.push(change);
        Ok(())
    }

    /// Queue the file at `path` to be stored as `name` on the next write.
    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> PakResult<()> {
        self.queue_file(name, path.as_ref(), false)
    }

    /// Queue `data` to be stored as `name` on the next write.
    pub fn add_memory(&mut self, name: &str, data: impl Into<Vec<u8>>) -> PakResult<()> {
        self.changes_mut("add entries")?;
        let name = fit_name(name)?;
        let data = data.into();
        self.changes_mut("add entries")?.push(Change::AddMemory { name, data });
        Ok(())
    }

    /// Queue replacement of entry `name` with the contents of the file at `path`.
    pub fn modify_file(&mut self, name: &str, path: impl AsRef<Path>) -> PakResult<()> {
        self.queue_file(name, path.as_ref(), true)
    }

    /// Queue replacement of entry `name` with `data`.
    pub fn modify_memory(&mut self, name: &str, data: impl Into<Vec<u8>>) -> PakResult<()> {
        self.changes_mut("modify entries")?;
        let name = fit_name(name)?;
        let data = data.into();
        self.changes_mut("modify entries")?.push(Change::ModifyMemory { name, data });
        Ok(())
    }

    /// Queue removal of entry `name`.
    pub fn remove(&mut self, name: &str) -> PakResult<()> {
        self.changes_mut("remove entries")?;
        let name = fit_name(name)?;
        self.changes_mut("remove entries")?.push(Change::Remove { name });
        Ok(())
    }

    /// Queue removal of the entry currently at `index`.
    pub fn remove_index(&mut self, index: usize) -> PakResult<()> {
        self.changes_mut("remove entries")?;
        let name = self.entry(index)?.name.clone();
        self.changes_mut("remove entries")?.push(Change::Remove { name });
        Ok(())
    }

    /// Changes queued since the last write.
    pub fn pending(&self) -> &[Change] {
        match &self.backing {
            Backing::File { changes, .. } => changes.as_slice(),
            Backing::Memory(_) => &[],
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending().is_empty()
    }

    /// Apply the change log: rewrite the pak as a new generation and replace the file with it.
    ///
    /// On failure the file on disk and the change log are left as they were.
    pub fn write(&mut self) -> PakResult<()> {
        let Backing::File { path, changes } = &mut self.backing else {
            tracing::warn!("pak must be opened in file mode to write");
            return Err(PakError::Argument("pak must be opened in file mode to write".into()));
        };

        if changes.is_empty() {
            tracing::debug!(path = %path.display(), "no changes in pak");
            return Ok(());
        }

        let pending = changes.len();
        let (entries, file_size) = compact(path, &self.entries, changes)
            .inspect_err(|e| tracing::warn!(path = %path.display(), "pak write failed: {e}"))?;
        changes.clear();

        tracing::debug!(path = %path.display(), pending, entries = entries.len(), "applied changes");
        self.index = build_index(&entries);
        self.entries = entries;
        self.file_size = file_size;
        Ok(())
    }

    /// Flush pending changes and release the handle.
    pub fn close(mut self) -> PakResult<()> {
        if self.is_dirty() {
            self.write()?;
        }
        Ok(())
    }

    /// Check the table against the layout invariants and that every payload can be read.
    pub fn verify(&self) -> PakResult<()> {
        self.verify_impl()
            .inspect_err(|e| tracing::warn!("pak verification failed: {e}"))
    }

    fn verify_impl(&self) -> PakResult<()> {
        let actual_len = match &self.backing {
            Backing::Memory(data) => data.len() as u64,
            Backing::File { path, .. } => std::fs::metadata(path)?.len(),
        };

        let mut expected = payload_start(self.entries.len() as u32);
        for e in &self.entries {
            if e.offset as u64 != expected {
                return Err(PakError::Format(format!(
                    "entry {} starts at {} but the previous one ends at {expected}",
                    e.name, e.offset
                )));
            }
            if e.end() > actual_len {
                return Err(PakError::Format(format!("payload outside file: {}", e.name)));
            }
            expected = e.end();
        }

        if !self.entries.is_empty() && self.file_size as u64 != expected {
            return Err(PakError::Format(format!(
                "header file size {} does not match payload end {expected}",
                self.file_size
            )));
        }

        if let Backing::File { path, .. } = &self.backing {
            let mut f = File::open(path)?;
            for e in &self.entries {
                f.seek(SeekFrom::Start(e.offset as u64))?;
                copy_exact(&mut f, &mut io::sink(), e.size as u64)?;
            }
        }

        Ok(())
    }
}

impl Drop for Pak<'_> {
    fn drop(&mut self) {
        if let Backing::File { path, changes } = &self.backing {
            if !changes.is_empty() {
                tracing::warn!(
                    path = %path.display(),
                    pending = changes.len(),
                    "pak dropped with unwritten changes"
                );
            }
        }
    }
}

fn read_payload(path: &Path, entry: &Entry, dst: &mut [u8]) -> PakResult<()> {
    let mut f = File::open(path)?;
    f.seek(SeekFrom::Start(entry.offset as u64))?;
    f.read_exact(dst)?;
    Ok(())
}
