#![forbid(unsafe_code)]

mod item;
mod map;

pub use item::{load, load_chunk, write, Asset, Chunk, Lifecycle, Origin};
pub use map::AssetMap;
