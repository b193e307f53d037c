//! Process control blocks and the descriptor table
//!
//! A process here is only an identity: who it runs as, where it stands
//! in the tree and which bits it strips from new files. There is no
//! scheduling; exactly one process is "current" and every syscall runs
//! on its behalf.
//!
//! Inspired by Linux process model:
//! - Real, effective and saved user/group ids
//! - A working directory and a umask per process
//! - Small integer descriptors for open files

use super::users::{Credentials, Gid, Uid};
use crate::vfs::NodeId;
use std::collections::HashMap;

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl Pid {
    /// The root process every kernel starts with
    pub const ROOT: Pid = Pid(0);
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// Process control block
#[derive(Debug, Clone, PartialEq)]
pub struct Pcb {
    /// Unique process identifier
    pub pid: Pid,

    /// Parent process
    pub ppid: Pid,

    /// Real user ID (who started the process)
    pub uid: Uid,

    /// Effective user ID (for permission checks)
    pub euid: Uid,

    /// Saved user ID
    ///
    /// Lets a process drop privileges with seteuid() and later take
    /// them back with seteuid(suid).
    pub suid: Uid,

    /// Real group ID
    pub gid: Gid,

    /// Effective group ID (for permission checks)
    pub egid: Gid,

    /// Saved group ID
    pub sgid: Gid,

    /// Current working directory, always normalized and absolute
    pub cwd: String,

    /// Bits removed from the mode of newly created nodes
    pub umask: u16,

    /// Creation time in milliseconds since epoch
    pub started: f64,
}

impl Pcb {
    /// Create a process whose three uids and three gids all start equal
    pub fn new(pid: Pid, ppid: Pid, uid: Uid, gid: Gid, cwd: &str, umask: u16) -> Self {
        Self {
            pid,
            ppid,
            uid,
            euid: uid,
            suid: uid,
            gid,
            egid: gid,
            sgid: gid,
            cwd: cwd.to_string(),
            umask: umask & 0o777,
            started: 0.0,
        }
    }

    /// The identity used for access checks
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.euid, self.egid)
    }
}

/// The PCB registry with its "current process" pointer
///
/// Processes are never destroyed within a session, so `current` always
/// names a registered process.
#[derive(Debug)]
pub struct ProcessTable {
    processes: HashMap<Pid, Pcb>,
    /// Last PID handed out
    last_pid: u32,
    current: Pid,
}

impl ProcessTable {
    /// Create a table holding only the root process, which is current
    pub fn new(umask: u16, now: f64) -> Self {
        let mut root = Pcb::new(Pid::ROOT, Pid::ROOT, Uid::ROOT, Gid::ROOT, "/", umask);
        root.started = now;

        let mut processes = HashMap::new();
        processes.insert(Pid::ROOT, root);

        Self {
            processes,
            // PID 1 is reserved, the first created process gets PID 2
            last_pid: 1,
            current: Pid::ROOT,
        }
    }

    /// Register a new process running as `uid:gid` in `cwd`
    ///
    /// The parent is the root process's parent, like a fresh login.
    pub fn create(&mut self, uid: Uid, gid: Gid, cwd: &str, umask: u16, now: f64) -> Pid {
        self.last_pid += 1;
        let pid = Pid(self.last_pid);
        let ppid = self
            .processes
            .get(&Pid::ROOT)
            .map(|root| root.ppid)
            .unwrap_or(Pid::ROOT);

        let mut pcb = Pcb::new(pid, ppid, uid, gid, cwd, umask);
        pcb.started = now;
        self.processes.insert(pid, pcb);
        pid
    }

    /// Make `pid` the current process; false if it is not registered
    pub fn set_current(&mut self, pid: Pid) -> bool {
        if self.processes.contains_key(&pid) {
            self.current = pid;
            true
        } else {
            false
        }
    }

    pub fn current_pid(&self) -> Pid {
        self.current
    }

    pub fn current(&self) -> Option<&Pcb> {
        self.processes.get(&self.current)
    }

    pub fn current_mut(&mut self) -> Option<&mut Pcb> {
        self.processes.get_mut(&self.current)
    }

    pub fn get(&self, pid: Pid) -> Option<&Pcb> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// All registered PIDs in ascending order
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<_> = self.processes.keys().copied().collect();
        pids.sort();
        pids
    }
}

/// File descriptor - an index into the kernel's file table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub u32);

impl Fd {
    pub const STDIN: Fd = Fd(0);
    pub const STDOUT: Fd = Fd(1);
    pub const STDERR: Fd = Fd(2);
}

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd:{}", self.0)
    }
}

/// Flags for opening files, laid out like Linux `O_*` bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(pub u32);

impl OpenFlags {
    pub const O_RDONLY: OpenFlags = OpenFlags(0x0000);
    pub const O_WRONLY: OpenFlags = OpenFlags(0x0001);
    pub const O_RDWR: OpenFlags = OpenFlags(0x0002);
    pub const O_CREAT: OpenFlags = OpenFlags(0x0040);
    pub const O_EXCL: OpenFlags = OpenFlags(0x0080);
    pub const O_NOCTTY: OpenFlags = OpenFlags(0x0100);
    pub const O_TRUNC: OpenFlags = OpenFlags(0x0200);
    pub const O_APPEND: OpenFlags = OpenFlags(0x0400);

    /// Mask selecting the access mode bits
    pub const O_ACCMODE: u32 = 0x0003;

    // Common combinations
    pub const READ: OpenFlags = Self::O_RDONLY;
    pub const WRITE: OpenFlags = OpenFlags(0x0001 | 0x0040 | 0x0200);
    pub const RDWR: OpenFlags = Self::O_RDWR;
    pub const APPEND: OpenFlags = OpenFlags(0x0001 | 0x0040 | 0x0400);

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// The access mode: 0 (read-only), 1 (write-only), 2 (read-write) or
    /// 3, which is invalid
    pub fn access_mode(&self) -> u32 {
        self.0 & Self::O_ACCMODE
    }

    /// True if all flag bits of `other` are set (access mode excluded)
    pub fn contains(&self, other: OpenFlags) -> bool {
        let bits = other.0 & !Self::O_ACCMODE;
        self.0 & bits == bits
    }

    pub fn readable(&self) -> bool {
        self.access_mode() != Self::O_WRONLY.0
    }

    pub fn writable(&self) -> bool {
        self.access_mode() != Self::O_RDONLY.0
    }
}

impl std::ops::BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

/// Reference point for lseek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl Whence {
    pub fn from_raw(raw: u32) -> Option<Whence> {
        match raw {
            0 => Some(Whence::Set),
            1 => Some(Whence::Cur),
            2 => Some(Whence::End),
            _ => None,
        }
    }
}

/// An open file description
#[derive(Debug, Clone, PartialEq)]
pub struct OpenFile {
    /// The node this descriptor refers to (aliased, not owned)
    pub node: NodeId,
    /// The normalized path it was opened with
    pub path: String,
    pub flags: OpenFlags,
    /// Cursor, in characters from the start of the content
    pub position: usize,
}

/// The first descriptor handed out; 0, 1, 2 are reserved for stdio
pub const FIRST_FD: u32 = 3;

/// The file descriptor table
#[derive(Debug)]
pub struct FileTable {
    /// Next fd to allocate
    next_fd: u32,
    /// Map from fd to open file
    table: HashMap<Fd, OpenFile>,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            next_fd: FIRST_FD,
            table: HashMap::new(),
        }
    }

    /// Allocate a new file descriptor; numbers are never reused
    pub fn alloc(&mut self, file: OpenFile) -> Fd {
        let fd = Fd(self.next_fd);
        self.next_fd += 1;
        self.table.insert(fd, file);
        fd
    }

    /// Get the current number of open file descriptors
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the file table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, fd: Fd) -> Option<&OpenFile> {
        self.table.get(&fd)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Option<&mut OpenFile> {
        self.table.get_mut(&fd)
    }

    pub fn remove(&mut self, fd: Fd) -> Option<OpenFile> {
        self.table.remove(&fd)
    }

    pub fn contains(&self, fd: Fd) -> bool {
        self.table.contains_key(&fd)
    }

    /// Get all file descriptors and their open files
    pub fn iter(&self) -> impl Iterator<Item = (Fd, &OpenFile)> + '_ {
        self.table.iter().map(|(fd, f)| (*fd, f))
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_file(node: usize) -> OpenFile {
        OpenFile {
            node: NodeId(node),
            path: "/x".to_string(),
            flags: OpenFlags::RDWR,
            position: 0,
        }
    }

    #[test]
    fn test_root_process() {
        let procs = ProcessTable::new(0o022, 0.0);
        let root = procs.current().unwrap();
        assert_eq!(root.pid, Pid::ROOT);
        assert_eq!(root.ppid, Pid::ROOT);
        assert_eq!(root.cwd, "/");
        assert_eq!(root.umask, 0o022);
        assert_eq!(root.credentials(), Credentials::root());
    }

    #[test]
    fn test_create_process() {
        let mut procs = ProcessTable::new(0o022, 0.0);
        let pid = procs.create(Uid(1000), Gid(100), "/home", 0o022, 5.0);
        assert_eq!(pid, Pid(2));
        assert_eq!(procs.create(Uid(1001), Gid(100), "/", 0o022, 5.0), Pid(3));

        let pcb = procs.get(pid).unwrap();
        assert_eq!((pcb.uid, pcb.euid, pcb.suid), (Uid(1000), Uid(1000), Uid(1000)));
        assert_eq!((pcb.gid, pcb.egid, pcb.sgid), (Gid(100), Gid(100), Gid(100)));
        assert_eq!(pcb.ppid, Pid::ROOT);
        assert_eq!(pcb.started, 5.0);

        // Creating does not switch
        assert_eq!(procs.current_pid(), Pid::ROOT);
    }

    #[test]
    fn test_set_current() {
        let mut procs = ProcessTable::new(0o022, 0.0);
        let pid = procs.create(Uid(1000), Gid(1000), "/", 0o022, 0.0);
        assert!(procs.set_current(pid));
        assert_eq!(procs.current().unwrap().uid, Uid(1000));
        assert!(!procs.set_current(Pid(99)));
        assert_eq!(procs.current_pid(), pid);
    }

    #[test]
    fn test_file_table_alloc() {
        let mut ft = FileTable::new();
        let fd1 = ft.alloc(open_file(1));
        let fd2 = ft.alloc(open_file(2));

        assert_eq!(fd1, Fd(3)); // First user fd after stdin/stdout/stderr
        assert_eq!(fd2, Fd(4));
        assert_eq!(ft.get(fd1).unwrap().node, NodeId(1));
        assert_eq!(ft.get(fd2).unwrap().node, NodeId(2));
    }

    #[test]
    fn test_file_table_never_reuses() {
        let mut ft = FileTable::new();
        let fd = ft.alloc(open_file(1));
        assert!(ft.remove(fd).is_some());
        assert!(!ft.contains(fd));
        assert_eq!(ft.alloc(open_file(1)), Fd(4));
        assert_eq!(ft.len(), 1);
    }

    #[test]
    fn test_open_flags() {
        let flags = OpenFlags::O_RDWR | OpenFlags::O_CREAT | OpenFlags::O_EXCL;
        assert_eq!(flags.access_mode(), 2);
        assert!(flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL));
        assert!(!flags.contains(OpenFlags::O_TRUNC));
        assert!(flags.readable() && flags.writable());

        assert!(OpenFlags::READ.readable());
        assert!(!OpenFlags::READ.writable());
        assert!(!OpenFlags::WRITE.readable());
        assert!(OpenFlags::APPEND.contains(OpenFlags::O_APPEND));
    }

    #[test]
    fn test_whence() {
        assert_eq!(Whence::from_raw(0), Some(Whence::Set));
        assert_eq!(Whence::from_raw(2), Some(Whence::End));
        assert_eq!(Whence::from_raw(3), None);
    }
}
