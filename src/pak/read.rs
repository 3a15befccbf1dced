#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{payload_start, Entry, Header, HEADER_LEN};

/// Table as found on disk or in a buffer.
pub(crate) struct Table {
    pub header: Header,
    pub entries: Vec<Entry>,
}

fn truncated(what: &str) -> impl Fn(PakError) -> PakError + '_ {
    move |e| match e {
        PakError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
            PakError::Format(format!("truncated {what}"))
        }
        other => other,
    }
}

fn read_entries(r: &mut dyn Read, count: u32) -> PakResult<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::new();
    entries.try_reserve_exact(count as usize)?;
    for _ in 0..count {
        entries.push(Entry::read(r).map_err(truncated("entry table"))?);
    }
    Ok(entries)
}

/// Read header and table from a pak file. A zero-length file reads as an empty pak.
pub(crate) fn read_table(file: &mut File) -> PakResult<Table> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Table {
            header: Header { count: 0, file_size: 0 },
            entries: Vec::new(),
        });
    }

    let header = Header::read(file).map_err(truncated("header"))?;
    if header.count == 0 {
        return Ok(Table { header, entries: Vec::new() });
    }
    if payload_start(header.count) > len {
        return Err(PakError::Format(format!(
            "entry table for {} entries runs past end of file ({len} bytes)",
            header.count
        )));
    }

    let entries = read_entries(file, header.count)?;
    Ok(Table { header, entries })
}

/// Read header and table from an in-memory pak, bounds-checking every entry against the buffer.
pub(crate) fn read_table_mem(data: &[u8]) -> PakResult<Table> {
    if data.len() < HEADER_LEN as usize {
        return Err(PakError::Format(format!(
            "buffer of {} bytes is smaller than the header",
            data.len()
        )));
    }

    let mut cur = Cursor::new(data);
    let header = Header::read(&mut cur)?;
    if payload_start(header.count) > data.len() as u64 {
        return Err(PakError::Format(format!(
            "entry table for {} entries runs past end of buffer ({} bytes)",
            header.count,
            data.len()
        )));
    }

    let entries = read_entries(&mut cur, header.count)?;
    for e in &entries {
        if e.end() > data.len() as u64 {
            return Err(PakError::Format(format!("payload outside buffer: {}", e.name)));
        }
    }

    Ok(Table { header, entries })
}
