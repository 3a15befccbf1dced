#![forbid(unsafe_code)]

use std::io::{Read, Write};

use crate::pak::error::{PakError, PakResult};
use crate::pak::io::{read_exact, read_u32, write_u32};

/// PACK v1 header magic.
pub const MAGIC: [u8; 4] = *b"PACK";

/// `[magic 4][u32 count][u32 file_size]`
pub const HEADER_LEN: u32 = 12;

/// `[name 56][u32 offset][u32 size]`
pub const ENTRY_LEN: u32 = 64;

/// Width of the name slot inside an entry record.
pub const NAME_LEN: usize = 56;

/// Longest name that still leaves room for the terminating NUL.
pub const MAX_NAME_LEN: usize = NAME_LEN - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub count: u32,
    pub file_size: u32,
}

impl Header {
    pub fn read(r: &mut dyn Read) -> PakResult<Header> {
        let magic = read_exact::<4>(r)?;
        if magic != MAGIC {
            return Err(PakError::Format("bad header magic".into()));
        }
        let count = read_u32(r)?;
        let file_size = read_u32(r)?;
        Ok(Header { count, file_size })
    }

    pub fn write(&self, w: &mut dyn Write) -> PakResult<()> {
        w.write_all(&MAGIC)?;
        write_u32(w, self.count)?;
        write_u32(w, self.file_size)?;
        Ok(())
    }
}

/// One record of the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// Absolute byte offset from the start of the pak.
    pub offset: u32,
    pub size: u32,
}

impl Entry {
    /// One past the last payload byte.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    pub(crate) fn read(r: &mut dyn Read) -> PakResult<Entry> {
        let raw = read_exact::<NAME_LEN>(r)?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name = String::from_utf8(raw[..len].to_vec())
            .map_err(|_| PakError::Format("entry name is not utf8".into()))?;

        let offset = read_u32(r)?;
        let size = read_u32(r)?;
        Ok(Entry { name, offset, size })
    }

    pub(crate) fn write(&self, w: &mut dyn Write) -> PakResult<()> {
        w.write_all(&encode_name(&self.name))?;
        write_u32(w, self.offset)?;
        write_u32(w, self.size)?;
        Ok(())
    }
}

/// Byte offset where the payload region begins for a table of `count` entries.
pub fn payload_start(count: u32) -> u64 {
    HEADER_LEN as u64 + ENTRY_LEN as u64 * count as u64
}

/// Validate a caller-supplied entry name and cut it down to the slot width.
pub fn fit_name(name: &str) -> PakResult<String> {
    if name.is_empty() {
        return Err(PakError::Argument("empty entry name".into()));
    }
    if name.contains('\0') {
        return Err(PakError::Argument(format!("entry name contains NUL: {name:?}")));
    }
    if name.len() <= MAX_NAME_LEN {
        return Ok(name.to_string());
    }

    let mut cut = MAX_NAME_LEN;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    tracing::warn!(entry = %name, "entry name longer than {MAX_NAME_LEN} bytes, truncating");
    Ok(name[..cut].to_string())
}

fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [0u8; NAME_LEN];
    let bytes = name.as_bytes();
    let n = bytes.len().min(MAX_NAME_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}
