//! Archive backends: in-memory and JSON-directory

mod dir;
mod memory;

pub use dir::DirArchive;
pub use memory::MemoryArchive;
