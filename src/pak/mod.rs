#![forbid(unsafe_code)]

mod change;
mod error;
mod format;
mod handle;
mod hash;
pub(crate) mod io;
mod path;
mod read;
mod write;

pub use change::Change;
pub use error::{PakError, PakResult};
pub use format::{fit_name, payload_start, Entry, ENTRY_LEN, HEADER_LEN, MAGIC, MAX_NAME_LEN, NAME_LEN};
pub use handle::Pak;
pub use hash::{content_hash, HASH_SEED};
pub use io::hex64;
pub use path::{entry_name, normalize_rel_path, prefixed};
