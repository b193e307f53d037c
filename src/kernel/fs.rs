//! Filesystem syscalls
//!
//! Handlers run on the current process's behalf through [`SyscallCtx`].
//! Each one validates fully before touching anything, so a failed call
//! leaves the tree, the descriptor table and the PCB as they were.

use super::process::{Fd, OpenFile, OpenFlags, Whence};
use super::syscall::{Errno, SyscallCtx, SyscallResult};
use super::users::{Access, Credentials, FileMode, Gid, Uid};
use crate::vfs::memory::{read_at, write_at};
use crate::vfs::{DirEntry, FileType, NodeId, Stat, path};

impl SyscallCtx<'_> {
    fn cred(&self) -> Credentials {
        self.pcb.credentials()
    }

    /// Normalize against the cwd; an empty path names nothing
    fn normalize(&self, raw: &str) -> SyscallResult<String> {
        if raw.is_empty() {
            return Err(Errno::NoSuchEntry);
        }
        Ok(path::normalize(&self.pcb.cwd, raw, None))
    }

    fn permits(&self, id: NodeId, want: Access) -> bool {
        let cred = self.cred();
        self.fs.get(id).is_some_and(|n| n.permits(&cred, want))
    }

    /// Resolve to an existing node, or `NoSuchEntry`
    fn existing(&self, path: &str) -> SyscallResult<(NodeId, NodeId)> {
        let resolved = self.fs.resolve(path, &self.cred())?;
        let node = resolved.node.ok_or(Errno::NoSuchEntry)?;
        Ok((resolved.parent, node))
    }

    /// An explicit mode is used as given; only the default is umasked
    fn creation_mode(&self, mode: Option<u16>, default: FileMode) -> FileMode {
        match mode {
            Some(bits) => FileMode::new(bits),
            None => default.with_umask(self.pcb.umask),
        }
    }

    fn is_dir(&self, id: NodeId) -> bool {
        self.fs.get(id).is_some_and(|n| n.is_dir())
    }

    /// Open a file, creating it if asked
    pub fn sys_open(&mut self, path: &str, flags: OpenFlags, mode: Option<u16>) -> SyscallResult<Fd> {
        if flags.access_mode() == OpenFlags::O_ACCMODE {
            return Err(Errno::InvalidArgument);
        }
        let path = self.normalize(path)?;
        let cred = self.cred();
        let resolved = self.fs.resolve(&path, &cred)?;

        let (node, created) = match resolved.node {
            Some(_) if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) => {
                return Err(Errno::AlreadyExists);
            }
            Some(id) => (id, false),
            None if flags.contains(OpenFlags::O_CREAT) => {
                if !self.permits(resolved.parent, Access::WRITE) {
                    return Err(Errno::AccessDenied);
                }
                let mode = self.creation_mode(mode, FileMode::FILE_DEFAULT);
                let id = self.fs.create(
                    resolved.parent,
                    resolved.name,
                    FileType::File,
                    mode,
                    cred.euid,
                    cred.egid,
                    self.now,
                )?;
                (id, true)
            }
            None => return Err(Errno::NoSuchEntry),
        };

        if self.is_dir(node) && flags.access_mode() != OpenFlags::O_RDONLY.bits() {
            return Err(Errno::IsADirectory);
        }

        if !created {
            let want = match flags.access_mode() {
                0 => Access::READ,
                1 => Access::WRITE,
                _ => Access::READ | Access::WRITE,
            };
            if !self.permits(node, want) {
                return Err(Errno::AccessDenied);
            }
        }

        if flags.contains(OpenFlags::O_TRUNC) && flags.writable() {
            if let Some(n) = self.fs.get_mut(node) {
                if let Some(content) = n.content_mut() {
                    content.clear();
                    n.modified = self.now;
                }
            }
        }

        self.fs.retain(node);
        Ok(self.files.alloc(OpenFile {
            node,
            path,
            flags,
            position: 0,
        }))
    }

    /// Read up to `len` characters (default: the rest) from the cursor
    pub fn sys_read(&mut self, fd: Fd, len: Option<usize>) -> SyscallResult<String> {
        let file = self.files.get(fd).ok_or(Errno::BadDescriptor)?;
        let node = self.fs.get(file.node).ok_or(Errno::BadDescriptor)?;
        let content = node.content().ok_or(Errno::IsADirectory)?;
        if !file.flags.readable() {
            return Err(Errno::AccessDenied);
        }

        let start = file.position;
        if start >= node.size() {
            return Ok(String::new());
        }
        let data = read_at(content, start, len);
        let end = start + data.chars().count();

        if let Some(file) = self.files.get_mut(fd) {
            file.position = end;
        }
        Ok(data)
    }

    /// Write at the cursor, or at the end with O_APPEND
    pub fn sys_write(&mut self, fd: Fd, data: &str) -> SyscallResult<usize> {
        let file = self.files.get_mut(fd).ok_or(Errno::BadDescriptor)?;
        let node = self.fs.get_mut(file.node).ok_or(Errno::BadDescriptor)?;
        if node.is_dir() {
            return Err(Errno::IsADirectory);
        }
        if !file.flags.writable() {
            return Err(Errno::AccessDenied);
        }

        let Some(content) = node.content_mut() else {
            return Err(Errno::IsADirectory);
        };
        file.position = if file.flags.contains(OpenFlags::O_APPEND) {
            content.push_str(data);
            content.chars().count()
        } else {
            write_at(content, file.position, data)
        };
        node.modified = self.now;

        Ok(data.chars().count())
    }

    /// Move the cursor
    pub fn sys_lseek(&mut self, fd: Fd, offset: i64, whence: u32) -> SyscallResult<usize> {
        let file = self.files.get_mut(fd).ok_or(Errno::BadDescriptor)?;
        let node = self.fs.get(file.node).ok_or(Errno::BadDescriptor)?;

        // i128 keeps cursors past i64::MAX representable
        let base: i128 = match Whence::from_raw(whence) {
            Some(Whence::Set) => 0,
            Some(Whence::Cur) => file.position as i128,
            Some(Whence::End) if node.is_dir() => return Err(Errno::IsADirectory),
            Some(Whence::End) => node.size() as i128,
            None => return Err(Errno::InvalidArgument),
        };

        let target =
            usize::try_from(base + i128::from(offset)).map_err(|_| Errno::InvalidArgument)?;
        file.position = target;
        Ok(target)
    }

    /// Close a descriptor and drop its node reference
    pub fn sys_close(&mut self, fd: Fd) -> SyscallResult<()> {
        let file = self.files.remove(fd).ok_or(Errno::BadDescriptor)?;
        self.fs.release(file.node);
        Ok(())
    }

    pub fn sys_mkdir(&mut self, path: &str, mode: Option<u16>) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        if path == "/" {
            return Err(Errno::AlreadyExists);
        }
        let cred = self.cred();
        let resolved = self.fs.resolve(&path, &cred)?;

        if !self.permits(resolved.parent, Access::WRITE) {
            return Err(Errno::AccessDenied);
        }
        if resolved.node.is_some() {
            return Err(Errno::AlreadyExists);
        }

        let mode = self.creation_mode(mode, FileMode::DIR_DEFAULT);
        self.fs.create(
            resolved.parent,
            resolved.name,
            FileType::Directory,
            mode,
            cred.euid,
            cred.egid,
            self.now,
        )?;
        Ok(())
    }

    pub fn sys_rmdir(&mut self, path: &str) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        let (parent, node) = self.existing(&path)?;

        let children = self
            .fs
            .get(node)
            .and_then(|n| n.children())
            .ok_or(Errno::NotADirectory)?;
        if node == self.fs.root() {
            return Err(Errno::NotPermitted);
        }
        if !children.is_empty() {
            return Err(Errno::DirectoryNotEmpty);
        }
        if !self.permits(parent, Access::WRITE) {
            return Err(Errno::AccessDenied);
        }

        self.fs.detach(parent, path::file_name(&path), self.now)?;
        Ok(())
    }

    pub fn sys_unlink(&mut self, path: &str) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        let (parent, node) = self.existing(&path)?;

        if self.is_dir(node) {
            return Err(Errno::IsADirectory);
        }
        if !self.permits(parent, Access::WRITE) {
            return Err(Errno::AccessDenied);
        }

        self.fs.detach(parent, path::file_name(&path), self.now)?;
        Ok(())
    }

    pub fn sys_stat(&self, path: &str) -> SyscallResult<Stat> {
        let path = self.normalize(path)?;
        let (parent, node) = self.existing(&path)?;

        if !self.permits(parent, Access::EXEC) {
            return Err(Errno::AccessDenied);
        }
        if self.is_dir(node) && !self.permits(node, Access::EXEC) {
            return Err(Errno::AccessDenied);
        }

        self.fs
            .stat(node, path::file_name(&path))
            .ok_or(Errno::NoSuchEntry)
    }

    /// Stat an open descriptor; access was checked at open
    pub fn sys_fstat(&self, fd: Fd) -> SyscallResult<Stat> {
        let file = self.files.get(fd).ok_or(Errno::BadDescriptor)?;
        self.fs
            .stat(file.node, path::file_name(&file.path))
            .ok_or(Errno::BadDescriptor)
    }

    /// List a directory, sorted by name
    pub fn sys_getdents(&self, path: &str) -> SyscallResult<Vec<DirEntry>> {
        let path = self.normalize(path)?;
        let (_, node) = self.existing(&path)?;

        if !self.is_dir(node) {
            return Err(Errno::NotADirectory);
        }
        if !self.permits(node, Access::READ) {
            return Err(Errno::AccessDenied);
        }
        self.fs.list(node).ok_or(Errno::NotADirectory)
    }

    /// Change permission bits; owner or euid 0 only
    pub fn sys_chmod(&mut self, path: &str, mode: u16) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        let (_, node) = self.existing(&path)?;
        let euid = self.pcb.euid;

        let n = self.fs.get_mut(node).ok_or(Errno::NoSuchEntry)?;
        if !euid.is_root() && n.owner != euid {
            return Err(Errno::NotPermitted);
        }
        n.mode = FileMode::new(mode);
        Ok(())
    }

    /// Change ownership; euid 0 only
    pub fn sys_chown(&mut self, path: &str, uid: Option<Uid>, gid: Option<Gid>) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        let (_, node) = self.existing(&path)?;
        let euid = self.pcb.euid;

        let n = self.fs.get_mut(node).ok_or(Errno::NoSuchEntry)?;
        if !euid.is_root() {
            return Err(Errno::NotPermitted);
        }
        if let Some(uid) = uid {
            n.owner = uid;
        }
        if let Some(gid) = gid {
            n.group = gid;
        }
        Ok(())
    }

    pub fn sys_chdir(&mut self, path: &str) -> SyscallResult<()> {
        let path = self.normalize(path)?;
        let (_, node) = self.existing(&path)?;

        if !self.is_dir(node) {
            return Err(Errno::NotADirectory);
        }
        if !self.permits(node, Access::EXEC) {
            return Err(Errno::AccessDenied);
        }
        self.pcb.cwd = path;
        Ok(())
    }

    pub fn sys_getcwd(&self) -> String {
        self.pcb.cwd.clone()
    }

    /// Set the file creation mask, returning the old one
    pub fn sys_umask(&mut self, mask: u16) -> u16 {
        std::mem::replace(&mut self.pcb.umask, mask & FileMode::MASK)
    }
}
