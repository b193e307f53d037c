//! In-memory filesystem
//!
//! Nodes live in a slab arena and refer to each other by [`NodeId`]. A
//! directory maps child names to ids; the root has no parent and is never
//! removed. Data lives only as long as the kernel does.
//!
//! Open descriptors hold a reference on their node. Unlinking a node that
//! is still open only detaches it from its parent; the slot is freed when
//! the last reference goes away.

use super::{BLOCK_SIZE, DirEntry, FileType, NodeId, Stat, path};
use crate::kernel::syscall::{Errno, SyscallResult};
use crate::kernel::users::{Access, Credentials, FileMode, Gid, Uid, check_permission};
use slab::Slab;
use std::collections::BTreeMap;

/// What a node holds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Child name to node id, kept sorted for stable listings
    Directory(BTreeMap<String, NodeId>),
    /// Text content
    File(String),
}

/// A stored file or directory
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub mode: FileMode,
    pub owner: Uid,
    pub group: Gid,
    pub created: f64,
    pub modified: f64,
    /// Number of open descriptors referring to this node
    open_refs: u32,
    /// False once the node has been removed from its parent
    linked: bool,
}

impl Node {
    fn new(kind: NodeKind, mode: FileMode, owner: Uid, group: Gid, now: f64) -> Self {
        Self {
            kind,
            mode,
            owner,
            group,
            created: now,
            modified: now,
            open_refs: 0,
            linked: true,
        }
    }

    pub fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::Directory(_) => FileType::Directory,
            NodeKind::File(_) => FileType::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    /// Content length in characters; 0 for directories
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::File(content) => content.chars().count(),
            NodeKind::Directory(_) => 0,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory(children) => Some(children),
            NodeKind::File(_) => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File(content) => Some(content),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            NodeKind::File(content) => Some(content),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn open_refs(&self) -> u32 {
        self.open_refs
    }

    /// Check `want` against this node's owner, group and mode
    pub fn permits(&self, cred: &Credentials, want: Access) -> bool {
        check_permission(self.owner, self.group, self.mode, cred, want)
    }
}

/// The outcome of resolving a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'p> {
    /// The directory the last segment is looked up in
    pub parent: NodeId,
    /// The last segment, or `/` for the root
    pub name: &'p str,
    /// The node named by the path, if it exists
    pub node: Option<NodeId>,
}

/// In-memory filesystem
#[derive(Debug)]
pub struct MemoryFs {
    nodes: Slab<Node>,
    root: NodeId,
}

impl MemoryFs {
    /// Create a filesystem holding only a root directory owned by root
    pub fn new(root_mode: FileMode, now: f64) -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node::new(
            NodeKind::Directory(BTreeMap::new()),
            root_mode,
            Uid::ROOT,
            Gid::ROOT,
            now,
        )));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including unlinked ones still held open
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Look up `name` in directory `dir`
    pub fn lookup(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.get(dir)?.children()?.get(name).copied()
    }

    /// Resolve a normalized absolute path
    ///
    /// Every intermediate segment must be an existing directory the caller
    /// may traverse. The last segment need not exist.
    pub fn resolve<'p>(&self, path: &'p str, cred: &Credentials) -> SyscallResult<Resolved<'p>> {
        let segments = path::segments(path);
        let Some((&name, dirs)) = segments.split_last() else {
            return Ok(Resolved {
                parent: self.root,
                name: "/",
                node: Some(self.root),
            });
        };

        let mut current = self.root;
        for segment in dirs {
            let next = self
                .lookup(current, segment)
                .filter(|id| self.get(*id).is_some_and(Node::is_dir))
                .ok_or(Errno::NoSuchEntry)?;

            let node = self.get(next).ok_or(Errno::NoSuchEntry)?;
            if !node.permits(cred, Access::EXEC) {
                return Err(Errno::AccessDenied);
            }
            current = next;
        }

        Ok(Resolved {
            parent: current,
            name,
            node: self.lookup(current, name),
        })
    }

    /// Create a new node named `name` in directory `parent`
    pub fn create(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: FileType,
        mode: FileMode,
        owner: Uid,
        group: Gid,
        now: f64,
    ) -> SyscallResult<NodeId> {
        if name.is_empty() || name.contains('/') {
            return Err(Errno::InvalidArgument);
        }
        match self.get(parent).map(|n| &n.kind) {
            Some(NodeKind::Directory(children)) if children.contains_key(name) => {
                return Err(Errno::AlreadyExists);
            }
            Some(NodeKind::Directory(_)) => {}
            Some(NodeKind::File(_)) => return Err(Errno::NotADirectory),
            None => return Err(Errno::NoSuchEntry),
        }

        let kind = match kind {
            FileType::Directory => NodeKind::Directory(BTreeMap::new()),
            FileType::File => NodeKind::File(String::new()),
        };
        let id = NodeId(self.nodes.insert(Node::new(kind, mode, owner, group, now)));

        if let Some(parent) = self.get_mut(parent) {
            if let NodeKind::Directory(children) = &mut parent.kind {
                children.insert(name.to_string(), id);
            }
            parent.modified = now;
        }
        Ok(id)
    }

    /// Remove the entry `name` from directory `parent`
    ///
    /// The node is freed unless a descriptor still holds it.
    pub fn detach(&mut self, parent: NodeId, name: &str, now: f64) -> SyscallResult<NodeId> {
        let id = match self.get_mut(parent).map(|n| (&mut n.kind, &mut n.modified)) {
            Some((NodeKind::Directory(children), modified)) => {
                let id = children.remove(name).ok_or(Errno::NoSuchEntry)?;
                *modified = now;
                id
            }
            Some((NodeKind::File(_), _)) => return Err(Errno::NotADirectory),
            None => return Err(Errno::NoSuchEntry),
        };

        let free = match self.get_mut(id) {
            Some(node) => {
                node.linked = false;
                node.open_refs == 0
            }
            None => false,
        };
        if free {
            self.nodes.remove(id.0);
        }
        Ok(id)
    }

    /// Take a reference on behalf of a new descriptor
    pub fn retain(&mut self, id: NodeId) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.open_refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a descriptor's reference
    ///
    /// Returns true if this freed an unlinked node.
    pub fn release(&mut self, id: NodeId) -> bool {
        let free = match self.get_mut(id) {
            Some(node) => {
                node.open_refs = node.open_refs.saturating_sub(1);
                node.open_refs == 0 && !node.linked
            }
            None => false,
        };
        if free {
            self.nodes.remove(id.0);
        }
        free
    }

    /// Build the stat record for `id`, reported under `name`
    pub fn stat(&self, id: NodeId, name: &str) -> Option<Stat> {
        let node = self.get(id)?;
        let size = node.size() as u64;
        let nlink = match &node.kind {
            NodeKind::Directory(children) => {
                let subdirs = children
                    .values()
                    .filter(|c| self.get(**c).is_some_and(Node::is_dir))
                    .count();
                2 + subdirs as u32
            }
            NodeKind::File(_) => u32::from(node.linked),
        };

        Some(Stat {
            name: name.to_string(),
            kind: node.file_type(),
            mode: node.mode,
            owner: node.owner,
            group: node.group,
            size,
            ino: id.0 as u64 + 1,
            nlink,
            blksize: BLOCK_SIZE,
            blocks: size.div_ceil(BLOCK_SIZE),
            created: node.created,
            modified: node.modified,
        })
    }

    /// List a directory, sorted by name
    pub fn list(&self, dir: NodeId) -> Option<Vec<DirEntry>> {
        let children = self.get(dir)?.children()?;
        Some(
            children
                .iter()
                .filter_map(|(name, id)| {
                    self.get(*id).map(|node| DirEntry {
                        name: name.clone(),
                        kind: node.file_type(),
                    })
                })
                .collect(),
        )
    }
}

/// Overwrite `content` with `data` starting at character `at`
///
/// A position past the end writes at the end instead; nothing is padded.
/// Returns `at` advanced by the length of `data`, which is where the
/// cursor goes next.
pub fn write_at(content: &mut String, at: usize, data: &str) -> usize {
    let mut chars: Vec<char> = content.chars().collect();
    let data: Vec<char> = data.chars().collect();
    let written = data.len();

    let start = at.min(chars.len());
    let stop = at.saturating_add(written).min(chars.len());
    chars.splice(start..stop, data);

    *content = chars.into_iter().collect();
    at.saturating_add(written)
}

/// Characters `[start, start + len)` of `content`, clamped to the end
pub fn read_at(content: &str, start: usize, len: Option<usize>) -> String {
    let chars = content.chars().skip(start);
    match len {
        Some(len) => chars.take(len).collect(),
        None => chars.collect(),
    }
}
