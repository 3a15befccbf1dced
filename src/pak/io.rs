#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Write};

use crate::pak::error::{PakError, PakResult};

/// Chunk size for streaming payload copies.
const COPY_CHUNK: usize = 8 * 1024;

pub fn write_u32(w: &mut dyn Write, v: u32) -> PakResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> PakResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u32(r: &mut dyn Read) -> PakResult<u32> {
    Ok(u32::from_le_bytes(read_exact::<4>(r)?))
}

/// Allocate a zeroed buffer of `len` bytes, reporting allocation failure instead of aborting.
pub fn alloc_buf(len: usize) -> PakResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Copy exactly `len` bytes from `r` to `w` through a fixed-size buffer.
pub fn copy_exact(r: &mut dyn Read, w: &mut dyn Write, len: u64) -> PakResult<()> {
    let mut chunk = [0u8; COPY_CHUNK];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(COPY_CHUNK as u64) as usize;
        let got = match r.read(&mut chunk[..want]) {
            Ok(0) => {
                return Err(PakError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("short read: expected {len} bytes, got {}", len - remaining),
                )))
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        w.write_all(&chunk[..got])?;
        remaining -= got as u64;
    }

    Ok(())
}

pub fn hex64(v: u64) -> String {
    format!("{v:016x}")
}
