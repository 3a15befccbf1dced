#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::pak::io::alloc_buf;
use crate::pak::{content_hash, PakError, PakResult};

/// Where an asset's bytes were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Filesystem,
    Pack,
    /// Handed over by the caller.
    Memory,
}

/// Release state. Only [`crate::asset::AssetMap::update`] moves an asset out of `PendingFree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Live,
    PendingFree,
}

/// Sub-range of a filesystem file an asset was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: u32,
    pub length: u32,
}

/// A loaded blob plus its identity and lifecycle.
///
/// Filesystem loads keep one extra NUL byte after the content so text assets can be
/// handed on as C strings; [`Asset::bytes`] never includes it.
#[derive(Debug, Clone)]
pub struct Asset<'a> {
    pub(crate) id: u32,
    name: String,
    data: Cow<'a, [u8]>,
    len: usize,
    origin: Origin,
    filled: bool,
    state: Lifecycle,
    chunk: Option<Chunk>,
}

impl<'a> Asset<'a> {
    fn new(name: String, data: Cow<'a, [u8]>, len: usize, origin: Origin) -> Self {
        Asset {
            id: 0,
            name,
            data,
            len,
            origin,
            filled: true,
            state: Lifecycle::Live,
            chunk: None,
        }
    }

    /// Wrap caller-owned bytes, e.g. to track them in a map and later write them into a pak.
    pub fn from_memory(name: impl Into<String>, data: impl Into<Cow<'a, [u8]>>) -> Self {
        let data = data.into();
        let len = data.len();
        Asset::new(name.into(), data, len, Origin::Memory)
    }

    pub(crate) fn from_pack(name: &str, data: Cow<'a, [u8]>) -> Self {
        let len = data.len();
        Asset::new(name.to_string(), data, len, Origin::Pack)
    }

    /// Id assigned by the owning map, 0 if untracked.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Content followed by a NUL byte, for filesystem loads.
    pub fn bytes_with_nul(&self) -> Option<&[u8]> {
        (self.data.len() > self.len).then(|| &self.data[..=self.len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn chunk(&self) -> Option<Chunk> {
        self.chunk
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Ask the owning map to release this asset on its next update.
    pub fn request_free(&mut self) {
        self.state = Lifecycle::PendingFree;
    }

    pub fn is_free_requested(&self) -> bool {
        self.state == Lifecycle::PendingFree
    }

    pub fn hash(&self) -> u64 {
        content_hash(self.bytes())
    }

    /// Release the bytes now and clear identity.
    pub fn free(&mut self) {
        self.data = Cow::Owned(Vec::new());
        self.len = 0;
        self.id = 0;
        self.name.clear();
        self.filled = false;
        self.state = Lifecycle::Live;
        self.chunk = None;
    }
}

fn open(path: &Path) -> PakResult<(File, u64)> {
    let f = File::open(path)
        .inspect_err(|e| tracing::warn!(path = %path.display(), "unable to open system file: {e}"))?;
    let len = f.metadata()?.len();
    Ok((f, len))
}

fn read_nul_terminated(f: &mut File, path: &Path, len: u64) -> PakResult<Vec<u8>> {
    let len = usize::try_from(len)
        .map_err(|_| PakError::Capacity(format!("{} is too large to load", path.display())))?;
    let mut data = alloc_buf(len + 1)?;
    f.read_exact(&mut data[..len]).inspect_err(|e| {
        tracing::warn!(path = %path.display(), expected = len, "incomplete read: {e}")
    })?;
    Ok(data)
}

/// Load a whole file from the filesystem.
pub fn load(path: impl AsRef<Path>) -> PakResult<Asset<'static>> {
    let path = path.as_ref();
    let (mut f, len) = open(path)?;
    let data = read_nul_terminated(&mut f, path, len)?;
    let len = data.len() - 1;

    tracing::debug!(path = %path.display(), len, "loaded asset");
    Ok(Asset::new(
        path.to_string_lossy().into_owned(),
        Cow::Owned(data),
        len,
        Origin::Filesystem,
    ))
}

/// Load `length` bytes starting at `start`, clamped to the end of the file.
pub fn load_chunk(path: impl AsRef<Path>, start: u32, length: u32) -> PakResult<Asset<'static>> {
    let path = path.as_ref();
    let (mut f, file_len) = open(path)?;

    if start as u64 > file_len {
        tracing::warn!(path = %path.display(), start, file_len, "chunk starts out of bounds");
        return Err(PakError::Argument(format!(
            "chunk start {start} is past the end of {} ({file_len} bytes)",
            path.display()
        )));
    }

    let clamped = (length as u64).min(file_len - start as u64);
    f.seek(SeekFrom::Start(start as u64))?;
    let data = read_nul_terminated(&mut f, path, clamped)?;
    let len = data.len() - 1;

    let mut asset = Asset::new(
        path.to_string_lossy().into_owned(),
        Cow::Owned(data),
        len,
        Origin::Filesystem,
    );
    asset.chunk = Some(Chunk {
        start,
        length: len as u32,
    });
    Ok(asset)
}

/// Write raw bytes to a filesystem path, replacing any existing file.
pub fn write(path: impl AsRef<Path>, data: &[u8]) -> PakResult<()> {
    let path = path.as_ref();
    std::fs::write(path, data)
        .inspect_err(|e| tracing::warn!(path = %path.display(), "unable to write file: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_keeps_trailing_nul() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        std::fs::write(&p, b"text").unwrap();

        let a = load(&p).unwrap();
        assert_eq!(a.bytes(), b"text");
        assert_eq!(a.bytes_with_nul(), Some(&b"text\0"[..]));
        assert_eq!(a.origin(), Origin::Filesystem);
        assert!(a.is_filled());
        assert_eq!(a.chunk(), None);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, PakError::Io(_)));
    }

    #[test]
    fn chunk_reads_from_start_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.bin");
        let content: Vec<u8> = (0..100u8).collect();
        std::fs::write(&p, &content).unwrap();

        let a = load_chunk(&p, 0, 1_000_000_000).unwrap();
        assert_eq!(a.len(), 100);
        assert_eq!(a.bytes(), &content[..]);

        let b = load_chunk(&p, 90, 50).unwrap();
        assert_eq!(b.bytes(), &content[90..]);
        assert_eq!(b.chunk(), Some(Chunk { start: 90, length: 10 }));

        let end = load_chunk(&p, 100, 5).unwrap();
        assert!(end.is_empty());

        assert!(matches!(load_chunk(&p, 101, 1), Err(PakError::Argument(_))));
    }

    #[test]
    fn free_clears_identity() {
        let mut a = Asset::from_memory("m", vec![1u8, 2, 3]);
        a.id = 7;
        a.request_free();
        a.free();
        assert_eq!(a.id(), 0);
        assert_eq!(a.name(), "");
        assert!(a.is_empty());
        assert!(!a.is_filled());
        assert!(!a.is_free_requested());
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("out.bin");
        write(&p, b"\x00\x01raw").unwrap();
        assert_eq!(load(&p).unwrap().bytes(), b"\x00\x01raw");
    }
}
