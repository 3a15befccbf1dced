#![forbid(unsafe_code)]

//! PACK v1: a single-file container of named blobs, a change log that compacts into a
//! fresh generation of the file, and an asset map that caches blobs loaded from a pak or
//! from the filesystem.

pub mod asset;
pub mod pak;

pub use asset::{Asset, AssetMap};
pub use pak::{Pak, PakError, PakResult};
