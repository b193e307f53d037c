//! Virtual File System
//!
//! A single in-memory backend: a tree of directory and file nodes held in
//! an arena. Content is text; sizes and offsets count characters.
//!
//! Permission enforcement lives with the resolver (traverse bits) and the
//! syscall handlers (everything else); the arena itself is policy-free.

pub mod memory;
pub mod path;

pub use memory::{MemoryFs, Node, NodeKind, Resolved};
pub use path::normalize;

use crate::kernel::users::{FileMode, Gid, Uid};
use serde::Serialize;

/// Block size reported by stat
pub const BLOCK_SIZE: u64 = 4096;

/// Stable index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// The two node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    #[serde(rename = "d")]
    Directory,
    #[serde(rename = "f")]
    File,
}

impl FileType {
    /// The one-letter tag used in listings
    pub fn as_char(&self) -> char {
        match self {
            FileType::Directory => 'd',
            FileType::File => 'f',
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Node metadata as returned by stat and fstat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub name: String,
    pub kind: FileType,
    pub mode: FileMode,
    pub owner: Uid,
    pub group: Gid,
    /// Characters of content; 0 for directories
    pub size: u64,
    /// Inode number, derived from the arena slot
    pub ino: u64,
    pub nlink: u32,
    pub blksize: u64,
    pub blocks: u64,
    pub created: f64,
    pub modified: f64,
}

impl Stat {
    /// Format like one line of `ls -l`
    pub fn long_format(&self) -> String {
        format!(
            "{}{} {} {} {} {:>8} {}",
            self.kind,
            self.mode.to_symbolic(),
            self.nlink,
            self.owner,
            self.group,
            self.size,
            self.name
        )
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
}
