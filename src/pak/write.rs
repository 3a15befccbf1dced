#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::pak::change::{ChangeLog, Source};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{payload_start, Entry, Header};
use crate::pak::io::copy_exact;

#[derive(Debug, Clone, Copy)]
enum Payload<'a> {
    /// Copied from the current generation at its old offset.
    Keep { offset: u32 },
    New(Source<'a>),
}

#[derive(Debug)]
struct Row<'a> {
    name: &'a str,
    offset: u32,
    size: u32,
    payload: Payload<'a>,
}

fn source_size(src: Source<'_>) -> PakResult<u32> {
    let len = match src {
        Source::Memory(data) => data.len() as u64,
        Source::File(path) => std::fs::metadata(path)?.len(),
    };
    u32::try_from(len).map_err(|_| PakError::Capacity(format!("entry of {len} bytes exceeds 4 GiB")))
}

/// Merge the current table with the change log into the next generation's rows.
fn plan<'a>(entries: &'a [Entry], log: &'a ChangeLog) -> PakResult<Vec<Row<'a>>> {
    let resolved = log.resolve();
    let existing: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();

    let mut rows: Vec<Row<'a>> = Vec::new();
    rows.try_reserve(entries.len() + resolved.len())?;

    for e in entries {
        let change = resolved.iter().find(|(n, _)| *n == e.name).map(|(_, r)| r);
        match change {
            Some(r) => match r.source {
                None => continue,
                Some(src) => rows.push(Row {
                    name: &e.name,
                    offset: 0,
                    size: source_size(src)?,
                    payload: Payload::New(src),
                }),
            },
            None => rows.push(Row {
                name: &e.name,
                offset: 0,
                size: e.size,
                payload: Payload::Keep { offset: e.offset },
            }),
        }
    }

    for &(name, r) in &resolved {
        if existing.contains(&name) {
            continue;
        }
        match r.source {
            Some(src) if r.creates => rows.push(Row {
                name,
                offset: 0,
                size: source_size(src)?,
                payload: Payload::New(src),
            }),
            Some(_) => tracing::warn!(entry = %name, "modify targets a missing entry, dropping"),
            None => {}
        }
    }

    Ok(rows)
}

/// Lay rows out back to back after the table. Returns the total file size.
fn assign_offsets(rows: &mut [Row<'_>]) -> PakResult<u32> {
    let mut offset = payload_start(rows.len() as u32);
    for row in rows.iter_mut() {
        row.offset = u32::try_from(offset)
            .map_err(|_| PakError::Capacity("pak exceeds 4 GiB".into()))?;
        offset += row.size as u64;
    }
    u32::try_from(offset).map_err(|_| PakError::Capacity("pak exceeds 4 GiB".into()))
}

fn write_rows(path: &Path, rows: &[Row<'_>], file_size: u32, out: &mut dyn Write) -> PakResult<()> {
    let header = Header {
        count: rows.len() as u32,
        file_size,
    };
    header.write(out)?;

    for row in rows {
        Entry {
            name: row.name.to_string(),
            offset: row.offset,
            size: row.size,
        }
        .write(out)?;
    }

    let mut base = if rows.iter().any(|r| matches!(r.payload, Payload::Keep { .. })) {
        Some(File::open(path)?)
    } else {
        None
    };

    for row in rows {
        match row.payload {
            Payload::Keep { offset } => {
                let f = base
                    .as_mut()
                    .ok_or_else(|| PakError::Format("no base generation to copy from".into()))?;
                f.seek(SeekFrom::Start(offset as u64))?;
                copy_exact(f, out, row.size as u64)?;
            }
            Payload::New(Source::Memory(data)) => out.write_all(data)?,
            Payload::New(Source::File(src)) => {
                let mut f = File::open(src)?;
                copy_exact(&mut f, out, row.size as u64)?;
            }
        }
    }

    Ok(())
}

/// Write the next generation of the pak at `path` and move it over the original.
///
/// PACK v1 layout:
/// - [MAGIC 4]
/// - [u32 entry_count]
/// - [u32 file_size]
/// - entries... (64 bytes each)
///   - [name 56, NUL-terminated]
///   - [u32 offset]
///   - [u32 size]
/// - payload blobs, contiguous, in table order
///
/// All integers are little-endian.
///
/// The new bytes go to a temporary file in the same directory, so a failure at any point
/// leaves the original untouched. Returns the new table and file size.
pub(crate) fn compact(path: &Path, entries: &[Entry], log: &ChangeLog) -> PakResult<(Vec<Entry>, u32)> {
    let mut rows = plan(entries, log)?;
    let file_size = assign_offsets(&mut rows)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;

    let mut w = BufWriter::new(tmp);
    write_rows(path, &rows, file_size, &mut w)?;
    let tmp = w.into_inner().map_err(|e| PakError::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;
    // The temp file is created owner-only; carry the archive's mode over.
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| PakError::Io(e.error))?;

    tracing::debug!(
        path = %path.display(),
        entries = rows.len(),
        file_size,
        "wrote pak generation"
    );

    let table = rows
        .iter()
        .map(|r| Entry {
            name: r.name.to_string(),
            offset: r.offset,
            size: r.size,
        })
        .collect();
    Ok((table, file_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::change::Change;

    fn table() -> Vec<Entry> {
        vec![
            Entry { name: "a".into(), offset: 140, size: 3 },
            Entry { name: "b".into(), offset: 143, size: 4 },
        ]
    }

    #[test]
    fn plan_keeps_untouched_entries_in_order() {
        let entries = table();
        let log = ChangeLog::default();
        let rows = plan(&entries, &log).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(matches!(rows[1].payload, Payload::Keep { offset: 143 }));
    }

    #[test]
    fn plan_applies_remove_modify_and_add() {
        let entries = table();
        let mut log = ChangeLog::default();
        log.push(Change::Remove { name: "a".into() });
        log.push(Change::ModifyMemory { name: "b".into(), data: b"longer".to_vec() });
        log.push(Change::AddMemory { name: "c".into(), data: b"c".to_vec() });
        log.push(Change::ModifyMemory { name: "ghost".into(), data: b"?".to_vec() });

        let rows = plan(&entries, &log).unwrap();
        let summary: Vec<(&str, u32)> = rows.iter().map(|r| (r.name, r.size)).collect();
        assert_eq!(summary, [("b", 6), ("c", 1)]);
    }

    #[test]
    fn add_of_existing_name_replaces_in_place() {
        let entries = table();
        let mut log = ChangeLog::default();
        log.push(Change::AddMemory { name: "a".into(), data: b"new!".to_vec() });

        let rows = plan(&entries, &log).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[0].size, 4);
    }

    #[test]
    fn offsets_are_contiguous_after_table() {
        let entries = table();
        let mut log = ChangeLog::default();
        log.push(Change::AddMemory { name: "c".into(), data: vec![0; 10] });

        let mut rows = plan(&entries, &log).unwrap();
        let file_size = assign_offsets(&mut rows).unwrap();

        assert_eq!(rows[0].offset, 12 + 64 * 3);
        for w in rows.windows(2) {
            assert_eq!(w[1].offset, w[0].offset + w[0].size);
        }
        assert_eq!(file_size, 12 + 64 * 3 + 3 + 4 + 10);
    }
}
