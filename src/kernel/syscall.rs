//! System call interface
//!
//! This is the boundary between callers and the kernel. Every filesystem
//! and credential operation goes through [`Kernel::syscall`] (typed) or
//! [`Kernel::syscall_raw`] (number plus loosely typed arguments):
//! - Auditing: all operations go through a single point
//! - Safety: arguments are validated before any handler runs
//! - Tracing: each call can be recorded with its outcome
//!
//! Inspired by Linux syscall architecture:
//! - Each syscall has a unique number (SyscallNr) for ABI stability
//! - A closed set of calls dispatched by one `match`
//! - Standard error codes (Errno) with errno names and numbers
//!
//! [`Kernel::syscall`]: super::Kernel::syscall
//! [`Kernel::syscall_raw`]: super::Kernel::syscall_raw

use super::cred::CredStatus;
use super::process::{Fd, FileTable, OpenFlags, Pcb, Pid};
use super::users::{Gid, Uid};
use crate::vfs::{DirEntry, MemoryFs, Stat};
use std::cell::Cell;

// ========== SYSCALL NUMBERS ==========
// Numbers follow Linux x86_64 where Linux has the call.

/// Syscall numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum SyscallNr {
    // File I/O
    Read = 0,
    Write = 1,
    Open = 2,
    Close = 3,
    Stat = 4,
    Fstat = 5,
    Lseek = 19,

    // Process
    Getpid = 39,

    // Filesystem
    Getdents = 78,
    Getcwd = 79,
    Chdir = 80,
    Mkdir = 83,
    Rmdir = 84,
    Unlink = 87,
    Chmod = 90,
    Chown = 92,
    Umask = 95,

    // Users/Security
    Getuid = 102,
    Getgid = 104,
    Setuid = 105,
    Setgid = 106,
    Geteuid = 107,
    Getegid = 108,
    Getppid = 110,
    Setreuid = 113,
    Setregid = 114,
    Setresuid = 117,
    Getresuid = 118,
    Setresgid = 119,
    Getresgid = 120,
}

impl SyscallNr {
    /// Every syscall, in number order
    pub const ALL: [SyscallNr; 30] = [
        SyscallNr::Read,
        SyscallNr::Write,
        SyscallNr::Open,
        SyscallNr::Close,
        SyscallNr::Stat,
        SyscallNr::Fstat,
        SyscallNr::Lseek,
        SyscallNr::Getpid,
        SyscallNr::Getdents,
        SyscallNr::Getcwd,
        SyscallNr::Chdir,
        SyscallNr::Mkdir,
        SyscallNr::Rmdir,
        SyscallNr::Unlink,
        SyscallNr::Chmod,
        SyscallNr::Chown,
        SyscallNr::Umask,
        SyscallNr::Getuid,
        SyscallNr::Getgid,
        SyscallNr::Setuid,
        SyscallNr::Setgid,
        SyscallNr::Geteuid,
        SyscallNr::Getegid,
        SyscallNr::Getppid,
        SyscallNr::Setreuid,
        SyscallNr::Setregid,
        SyscallNr::Setresuid,
        SyscallNr::Getresuid,
        SyscallNr::Setresgid,
        SyscallNr::Getresgid,
    ];

    /// Get the syscall name (for tracing/debugging)
    pub fn name(&self) -> &'static str {
        match self {
            SyscallNr::Read => "read",
            SyscallNr::Write => "write",
            SyscallNr::Open => "open",
            SyscallNr::Close => "close",
            SyscallNr::Stat => "stat",
            SyscallNr::Fstat => "fstat",
            SyscallNr::Lseek => "lseek",
            SyscallNr::Getpid => "getpid",
            SyscallNr::Getdents => "getdents",
            SyscallNr::Getcwd => "getcwd",
            SyscallNr::Chdir => "chdir",
            SyscallNr::Mkdir => "mkdir",
            SyscallNr::Rmdir => "rmdir",
            SyscallNr::Unlink => "unlink",
            SyscallNr::Chmod => "chmod",
            SyscallNr::Chown => "chown",
            SyscallNr::Umask => "umask",
            SyscallNr::Getuid => "getuid",
            SyscallNr::Getgid => "getgid",
            SyscallNr::Setuid => "setuid",
            SyscallNr::Setgid => "setgid",
            SyscallNr::Geteuid => "geteuid",
            SyscallNr::Getegid => "getegid",
            SyscallNr::Getppid => "getppid",
            SyscallNr::Setreuid => "setreuid",
            SyscallNr::Setregid => "setregid",
            SyscallNr::Setresuid => "setresuid",
            SyscallNr::Getresuid => "getresuid",
            SyscallNr::Setresgid => "setresgid",
            SyscallNr::Getresgid => "getresgid",
        }
    }

    /// Get the syscall number
    pub fn num(&self) -> u32 {
        *self as u32
    }

    /// Look up a syscall by number
    pub fn from_num(num: u32) -> Option<SyscallNr> {
        Self::ALL.iter().copied().find(|nr| nr.num() == num)
    }
}

impl std::fmt::Display for SyscallNr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.num())
    }
}

// ========== ERRORS ==========

/// System call error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errno {
    /// Operation not permitted
    NotPermitted,
    /// Permission bits deny the access
    AccessDenied,
    /// No such file or directory
    NoSuchEntry,
    /// Is a directory
    IsADirectory,
    /// Not a directory
    NotADirectory,
    /// File exists
    AlreadyExists,
    /// Directory not empty
    DirectoryNotEmpty,
    /// Bad file descriptor
    BadDescriptor,
    /// Invalid argument
    InvalidArgument,
}

impl Errno {
    /// The classic errno name
    pub fn name(&self) -> &'static str {
        match self {
            Errno::NotPermitted => "EPERM",
            Errno::AccessDenied => "EACCES",
            Errno::NoSuchEntry => "ENOENT",
            Errno::IsADirectory => "EISDIR",
            Errno::NotADirectory => "ENOTDIR",
            Errno::AlreadyExists => "EEXIST",
            Errno::DirectoryNotEmpty => "ENOTEMPTY",
            Errno::BadDescriptor => "EBADF",
            Errno::InvalidArgument => "EINVAL",
        }
    }

    /// The Linux errno number
    pub fn code(&self) -> i32 {
        match self {
            Errno::NotPermitted => 1,
            Errno::NoSuchEntry => 2,
            Errno::BadDescriptor => 9,
            Errno::AccessDenied => 13,
            Errno::AlreadyExists => 17,
            Errno::NotADirectory => 20,
            Errno::IsADirectory => 21,
            Errno::InvalidArgument => 22,
            Errno::DirectoryNotEmpty => 39,
        }
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Errno::NotPermitted => "operation not permitted",
            Errno::AccessDenied => "permission denied",
            Errno::NoSuchEntry => "no such file or directory",
            Errno::IsADirectory => "is a directory",
            Errno::NotADirectory => "not a directory",
            Errno::AlreadyExists => "file exists",
            Errno::DirectoryNotEmpty => "directory not empty",
            Errno::BadDescriptor => "bad file descriptor",
            Errno::InvalidArgument => "invalid argument",
        };
        write!(f, "{}: {}", self.name(), msg)
    }
}

impl std::error::Error for Errno {}

/// Result type for syscalls
pub type SyscallResult<T> = Result<T, Errno>;

// ========== CALLS AND RESULTS ==========

/// A system call with its arguments
///
/// `None` in an id or mode position means "leave unchanged" or "use the
/// default", the typed form of a raw `-1`.
#[derive(Debug, Clone, PartialEq)]
pub enum Syscall {
    Read { fd: Fd, len: Option<usize> },
    Write { fd: Fd, data: String },
    Open { path: String, flags: OpenFlags, mode: Option<u16> },
    Close { fd: Fd },
    Stat { path: String },
    Fstat { fd: Fd },
    /// `whence` stays raw so a bad descriptor is reported before a bad whence
    Lseek { fd: Fd, offset: i64, whence: u32 },
    Getpid,
    Getdents { path: String },
    Getcwd,
    Chdir { path: String },
    Mkdir { path: String, mode: Option<u16> },
    Rmdir { path: String },
    Unlink { path: String },
    Chmod { path: String, mode: u16 },
    Chown { path: String, uid: Option<Uid>, gid: Option<Gid> },
    Umask { mask: u16 },
    Getuid,
    Getgid,
    Setuid { uid: Uid },
    Setgid { gid: Gid },
    Geteuid,
    Getegid,
    Getppid,
    Setreuid { ruid: Option<Uid>, euid: Option<Uid> },
    Setregid { rgid: Option<Gid>, egid: Option<Gid> },
    Setresuid { ruid: Option<Uid>, euid: Option<Uid>, suid: Option<Uid> },
    Getresuid,
    Setresgid { rgid: Option<Gid>, egid: Option<Gid>, sgid: Option<Gid> },
    Getresgid,
}

impl Syscall {
    /// The number this call is traced under
    pub fn nr(&self) -> SyscallNr {
        match self {
            Syscall::Read { .. } => SyscallNr::Read,
            Syscall::Write { .. } => SyscallNr::Write,
            Syscall::Open { .. } => SyscallNr::Open,
            Syscall::Close { .. } => SyscallNr::Close,
            Syscall::Stat { .. } => SyscallNr::Stat,
            Syscall::Fstat { .. } => SyscallNr::Fstat,
            Syscall::Lseek { .. } => SyscallNr::Lseek,
            Syscall::Getpid => SyscallNr::Getpid,
            Syscall::Getdents { .. } => SyscallNr::Getdents,
            Syscall::Getcwd => SyscallNr::Getcwd,
            Syscall::Chdir { .. } => SyscallNr::Chdir,
            Syscall::Mkdir { .. } => SyscallNr::Mkdir,
            Syscall::Rmdir { .. } => SyscallNr::Rmdir,
            Syscall::Unlink { .. } => SyscallNr::Unlink,
            Syscall::Chmod { .. } => SyscallNr::Chmod,
            Syscall::Chown { .. } => SyscallNr::Chown,
            Syscall::Umask { .. } => SyscallNr::Umask,
            Syscall::Getuid => SyscallNr::Getuid,
            Syscall::Getgid => SyscallNr::Getgid,
            Syscall::Setuid { .. } => SyscallNr::Setuid,
            Syscall::Setgid { .. } => SyscallNr::Setgid,
            Syscall::Geteuid => SyscallNr::Geteuid,
            Syscall::Getegid => SyscallNr::Getegid,
            Syscall::Getppid => SyscallNr::Getppid,
            Syscall::Setreuid { .. } => SyscallNr::Setreuid,
            Syscall::Setregid { .. } => SyscallNr::Setregid,
            Syscall::Setresuid { .. } => SyscallNr::Setresuid,
            Syscall::Getresuid => SyscallNr::Getresuid,
            Syscall::Setresgid { .. } => SyscallNr::Setresgid,
            Syscall::Getresgid => SyscallNr::Getresgid,
        }
    }

    /// Decode a raw call: a number plus positional arguments
    ///
    /// Integer `-1` in an optional position means "unchanged"; a trailing
    /// optional argument may also be omitted. Anything else malformed,
    /// including an unknown number, is `InvalidArgument`.
    pub fn decode(num: u32, args: &[Arg]) -> SyscallResult<Syscall> {
        let nr = SyscallNr::from_num(num).ok_or(Errno::InvalidArgument)?;
        let a = RawArgs(args);

        let call = match nr {
            SyscallNr::Read => Syscall::Read {
                fd: a.fd(0)?,
                len: a.opt_count(1)?,
            },
            SyscallNr::Write => Syscall::Write {
                fd: a.fd(0)?,
                data: a.string(1)?,
            },
            SyscallNr::Open => Syscall::Open {
                path: a.string(0)?,
                flags: OpenFlags(a.u32(1)?),
                mode: a.opt_mode(2)?,
            },
            SyscallNr::Close => Syscall::Close { fd: a.fd(0)? },
            SyscallNr::Stat => Syscall::Stat { path: a.string(0)? },
            SyscallNr::Fstat => Syscall::Fstat { fd: a.fd(0)? },
            SyscallNr::Lseek => Syscall::Lseek {
                fd: a.fd(0)?,
                offset: a.int(1)?,
                whence: a.u32(2)?,
            },
            SyscallNr::Getpid => Syscall::Getpid,
            SyscallNr::Getdents => Syscall::Getdents { path: a.string(0)? },
            SyscallNr::Getcwd => Syscall::Getcwd,
            SyscallNr::Chdir => Syscall::Chdir { path: a.string(0)? },
            SyscallNr::Mkdir => Syscall::Mkdir {
                path: a.string(0)?,
                mode: a.opt_mode(1)?,
            },
            SyscallNr::Rmdir => Syscall::Rmdir { path: a.string(0)? },
            SyscallNr::Unlink => Syscall::Unlink { path: a.string(0)? },
            SyscallNr::Chmod => Syscall::Chmod {
                path: a.string(0)?,
                mode: a.mode(1)?,
            },
            SyscallNr::Chown => Syscall::Chown {
                path: a.string(0)?,
                uid: a.opt_id(1)?.map(Uid),
                gid: a.opt_id(2)?.map(Gid),
            },
            SyscallNr::Umask => Syscall::Umask { mask: a.mode(0)? },
            SyscallNr::Getuid => Syscall::Getuid,
            SyscallNr::Getgid => Syscall::Getgid,
            SyscallNr::Setuid => Syscall::Setuid { uid: Uid(a.u32(0)?) },
            SyscallNr::Setgid => Syscall::Setgid { gid: Gid(a.u32(0)?) },
            SyscallNr::Geteuid => Syscall::Geteuid,
            SyscallNr::Getegid => Syscall::Getegid,
            SyscallNr::Getppid => Syscall::Getppid,
            SyscallNr::Setreuid => Syscall::Setreuid {
                ruid: a.opt_id(0)?.map(Uid),
                euid: a.opt_id(1)?.map(Uid),
            },
            SyscallNr::Setregid => Syscall::Setregid {
                rgid: a.opt_id(0)?.map(Gid),
                egid: a.opt_id(1)?.map(Gid),
            },
            SyscallNr::Setresuid => Syscall::Setresuid {
                ruid: a.opt_id(0)?.map(Uid),
                euid: a.opt_id(1)?.map(Uid),
                suid: a.opt_id(2)?.map(Uid),
            },
            SyscallNr::Getresuid => Syscall::Getresuid,
            SyscallNr::Setresgid => Syscall::Setresgid {
                rgid: a.opt_id(0)?.map(Gid),
                egid: a.opt_id(1)?.map(Gid),
                sgid: a.opt_id(2)?.map(Gid),
            },
            SyscallNr::Getresgid => Syscall::Getresgid,
        };
        Ok(call)
    }
}

/// A loosely typed raw syscall argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int(i64),
    Str(String),
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

/// Positional accessors over raw arguments
struct RawArgs<'a>(&'a [Arg]);

impl RawArgs<'_> {
    fn get(&self, i: usize) -> Option<&Arg> {
        self.0.get(i)
    }

    fn int(&self, i: usize) -> SyscallResult<i64> {
        match self.get(i) {
            Some(Arg::Int(v)) => Ok(*v),
            _ => Err(Errno::InvalidArgument),
        }
    }

    fn string(&self, i: usize) -> SyscallResult<String> {
        match self.get(i) {
            Some(Arg::Str(s)) => Ok(s.clone()),
            _ => Err(Errno::InvalidArgument),
        }
    }

    fn u32(&self, i: usize) -> SyscallResult<u32> {
        u32::try_from(self.int(i)?).map_err(|_| Errno::InvalidArgument)
    }

    fn fd(&self, i: usize) -> SyscallResult<Fd> {
        self.u32(i).map(Fd)
    }

    fn mode(&self, i: usize) -> SyscallResult<u16> {
        u16::try_from(self.int(i)?).map_err(|_| Errno::InvalidArgument)
    }

    /// `None` for a missing argument or `-1`
    fn optional(&self, i: usize) -> SyscallResult<Option<i64>> {
        match self.get(i) {
            None | Some(Arg::Int(-1)) => Ok(None),
            Some(Arg::Int(v)) => Ok(Some(*v)),
            Some(Arg::Str(_)) => Err(Errno::InvalidArgument),
        }
    }

    fn opt_id(&self, i: usize) -> SyscallResult<Option<u32>> {
        self.optional(i)?
            .map(|v| u32::try_from(v).map_err(|_| Errno::InvalidArgument))
            .transpose()
    }

    fn opt_mode(&self, i: usize) -> SyscallResult<Option<u16>> {
        self.optional(i)?
            .map(|v| u16::try_from(v).map_err(|_| Errno::InvalidArgument))
            .transpose()
    }

    fn opt_count(&self, i: usize) -> SyscallResult<Option<usize>> {
        self.optional(i)?
            .map(|v| usize::try_from(v).map_err(|_| Errno::InvalidArgument))
            .transpose()
    }
}

/// The value a successful syscall returns
#[derive(Debug, Clone, PartialEq)]
pub enum SyscallRet {
    Unit,
    Fd(Fd),
    /// Characters written
    Count(usize),
    /// New cursor position
    Offset(usize),
    /// Characters read
    Data(String),
    Stat(Stat),
    Entries(Vec<DirEntry>),
    Pid(Pid),
    Path(String),
    Uid(Uid),
    Gid(Gid),
    ResUid(Uid, Uid, Uid),
    ResGid(Gid, Gid, Gid),
    /// Outcome of a credential setter
    Status(CredStatus),
    /// Previous umask
    Mask(u16),
}

impl SyscallRet {
    pub fn into_unit(self) -> SyscallResult<()> {
        match self {
            SyscallRet::Unit => Ok(()),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_fd(self) -> SyscallResult<Fd> {
        match self {
            SyscallRet::Fd(fd) => Ok(fd),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_count(self) -> SyscallResult<usize> {
        match self {
            SyscallRet::Count(n) => Ok(n),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_offset(self) -> SyscallResult<usize> {
        match self {
            SyscallRet::Offset(n) => Ok(n),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_data(self) -> SyscallResult<String> {
        match self {
            SyscallRet::Data(s) => Ok(s),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_stat(self) -> SyscallResult<Stat> {
        match self {
            SyscallRet::Stat(s) => Ok(s),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_entries(self) -> SyscallResult<Vec<DirEntry>> {
        match self {
            SyscallRet::Entries(e) => Ok(e),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_pid(self) -> SyscallResult<Pid> {
        match self {
            SyscallRet::Pid(p) => Ok(p),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_path(self) -> SyscallResult<String> {
        match self {
            SyscallRet::Path(p) => Ok(p),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_uid(self) -> SyscallResult<Uid> {
        match self {
            SyscallRet::Uid(u) => Ok(u),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_gid(self) -> SyscallResult<Gid> {
        match self {
            SyscallRet::Gid(g) => Ok(g),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_resuid(self) -> SyscallResult<(Uid, Uid, Uid)> {
        match self {
            SyscallRet::ResUid(r, e, s) => Ok((r, e, s)),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_resgid(self) -> SyscallResult<(Gid, Gid, Gid)> {
        match self {
            SyscallRet::ResGid(r, e, s) => Ok((r, e, s)),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_status(self) -> SyscallResult<CredStatus> {
        match self {
            SyscallRet::Status(s) => Ok(s),
            _ => Err(Errno::InvalidArgument),
        }
    }

    pub fn into_mask(self) -> SyscallResult<u16> {
        match self {
            SyscallRet::Mask(m) => Ok(m),
            _ => Err(Errno::InvalidArgument),
        }
    }

    /// The integer a C caller would see for this value, if there is one
    pub fn as_raw(&self) -> Option<i64> {
        match self {
            SyscallRet::Unit => Some(0),
            SyscallRet::Fd(fd) => Some(fd.0 as i64),
            SyscallRet::Count(n) | SyscallRet::Offset(n) => Some(*n as i64),
            SyscallRet::Pid(p) => Some(p.0 as i64),
            SyscallRet::Uid(u) => Some(u.0 as i64),
            SyscallRet::Gid(g) => Some(g.0 as i64),
            SyscallRet::Status(s) => Some(s.as_raw() as i64),
            SyscallRet::Mask(m) => Some(*m as i64),
            _ => None,
        }
    }
}

// ========== THE GATE ==========

/// Execution mode of the syscall gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Kernel,
}

/// Re-entrancy guard for the syscall entry point
#[derive(Debug)]
pub struct Gate {
    mode: Cell<Mode>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            mode: Cell::new(Mode::User),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// Switch to kernel mode for the lifetime of the returned guard
    ///
    /// Fails with `NotPermitted` if a call is already executing.
    pub fn enter(&self) -> SyscallResult<GateGuard<'_>> {
        let previous = self.mode.get();
        if previous == Mode::Kernel {
            return Err(Errno::NotPermitted);
        }
        self.mode.set(Mode::Kernel);
        Ok(GateGuard {
            gate: self,
            previous,
        })
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the previous mode on drop, on every exit path
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a Gate,
    previous: Mode,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.mode.set(self.previous);
    }
}

// ========== DISPATCH ==========

/// Everything a handler may touch, borrowed from the kernel for one call
#[derive(Debug)]
pub struct SyscallCtx<'k> {
    /// The current process
    pub pcb: &'k mut Pcb,
    pub fs: &'k mut MemoryFs,
    pub files: &'k mut FileTable,
    /// Clock reading taken at entry
    pub now: f64,
}

/// Run one syscall against `ctx`
pub fn dispatch(ctx: &mut SyscallCtx<'_>, call: Syscall) -> SyscallResult<SyscallRet> {
    let ret = match call {
        // File I/O
        Syscall::Open { path, flags, mode } => SyscallRet::Fd(ctx.sys_open(&path, flags, mode)?),
        Syscall::Read { fd, len } => SyscallRet::Data(ctx.sys_read(fd, len)?),
        Syscall::Write { fd, data } => SyscallRet::Count(ctx.sys_write(fd, &data)?),
        Syscall::Lseek { fd, offset, whence } => {
            SyscallRet::Offset(ctx.sys_lseek(fd, offset, whence)?)
        }
        Syscall::Close { fd } => {
            ctx.sys_close(fd)?;
            SyscallRet::Unit
        }
        Syscall::Fstat { fd } => SyscallRet::Stat(ctx.sys_fstat(fd)?),

        // Filesystem
        Syscall::Stat { path } => SyscallRet::Stat(ctx.sys_stat(&path)?),
        Syscall::Getdents { path } => SyscallRet::Entries(ctx.sys_getdents(&path)?),
        Syscall::Mkdir { path, mode } => {
            ctx.sys_mkdir(&path, mode)?;
            SyscallRet::Unit
        }
        Syscall::Rmdir { path } => {
            ctx.sys_rmdir(&path)?;
            SyscallRet::Unit
        }
        Syscall::Unlink { path } => {
            ctx.sys_unlink(&path)?;
            SyscallRet::Unit
        }
        Syscall::Chmod { path, mode } => {
            ctx.sys_chmod(&path, mode)?;
            SyscallRet::Unit
        }
        Syscall::Chown { path, uid, gid } => {
            ctx.sys_chown(&path, uid, gid)?;
            SyscallRet::Unit
        }
        Syscall::Chdir { path } => {
            ctx.sys_chdir(&path)?;
            SyscallRet::Unit
        }
        Syscall::Getcwd => SyscallRet::Path(ctx.sys_getcwd()),
        Syscall::Umask { mask } => SyscallRet::Mask(ctx.sys_umask(mask)),

        // Process
        Syscall::Getpid => SyscallRet::Pid(ctx.pcb.pid),
        Syscall::Getppid => SyscallRet::Pid(ctx.pcb.ppid),

        // Users/Security
        Syscall::Getuid => SyscallRet::Uid(ctx.sys_getuid()),
        Syscall::Geteuid => SyscallRet::Uid(ctx.sys_geteuid()),
        Syscall::Getresuid => {
            let (r, e, s) = ctx.sys_getresuid();
            SyscallRet::ResUid(r, e, s)
        }
        Syscall::Getgid => SyscallRet::Gid(ctx.sys_getgid()),
        Syscall::Getegid => SyscallRet::Gid(ctx.sys_getegid()),
        Syscall::Getresgid => {
            let (r, e, s) = ctx.sys_getresgid();
            SyscallRet::ResGid(r, e, s)
        }
        Syscall::Setuid { uid } => SyscallRet::Status(ctx.sys_setuid(uid)),
        Syscall::Setreuid { ruid, euid } => SyscallRet::Status(ctx.sys_setreuid(ruid, euid)),
        Syscall::Setresuid { ruid, euid, suid } => {
            SyscallRet::Status(ctx.sys_setresuid(ruid, euid, suid))
        }
        Syscall::Setgid { gid } => SyscallRet::Status(ctx.sys_setgid(gid)),
        Syscall::Setregid { rgid, egid } => SyscallRet::Status(ctx.sys_setregid(rgid, egid)),
        Syscall::Setresgid { rgid, egid, sgid } => {
            SyscallRet::Status(ctx.sys_setresgid(rgid, egid, sgid))
        }
    };
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_numbers_are_unique_and_round_trip() {
        for nr in SyscallNr::ALL {
            assert_eq!(SyscallNr::from_num(nr.num()), Some(nr));
        }
        assert_eq!(SyscallNr::from_num(6), None);
        assert_eq!(SyscallNr::Open.num(), 2);
        assert_eq!(SyscallNr::Setresuid.num(), 117);
        assert_eq!(SyscallNr::Getdents.to_string(), "getdents(78)");
    }

    #[test]
    fn test_errno_names_and_codes() {
        assert_eq!(Errno::AccessDenied.name(), "EACCES");
        assert_eq!(Errno::AccessDenied.code(), 13);
        assert_eq!(Errno::DirectoryNotEmpty.code(), 39);
        assert_eq!(Errno::NoSuchEntry.to_string(), "ENOENT: no such file or directory");
    }

    #[test]
    fn test_decode_open() {
        let call = Syscall::decode(2, &["/etc/passwd".into(), Arg::Int(0x42), Arg::Int(0o600)]).unwrap();
        assert_eq!(
            call,
            Syscall::Open {
                path: "/etc/passwd".to_string(),
                flags: OpenFlags::O_RDWR | OpenFlags::O_CREAT,
                mode: Some(0o600),
            }
        );

        // Mode may be omitted or -1
        let call = Syscall::decode(2, &["/x".into(), Arg::Int(0)]).unwrap();
        assert!(matches!(call, Syscall::Open { mode: None, .. }));
        let call = Syscall::decode(2, &["/x".into(), Arg::Int(0), Arg::Int(-1)]).unwrap();
        assert!(matches!(call, Syscall::Open { mode: None, .. }));
    }

    #[test]
    fn test_decode_minus_one_means_unchanged() {
        let call = Syscall::decode(117, &[Arg::Int(-1), Arg::Int(1000), Arg::Int(-1)]).unwrap();
        assert_eq!(
            call,
            Syscall::Setresuid {
                ruid: None,
                euid: Some(Uid(1000)),
                suid: None
            }
        );

        let call = Syscall::decode(92, &["/f".into(), Arg::Int(-1), Arg::Int(5)]).unwrap();
        assert_eq!(
            call,
            Syscall::Chown {
                path: "/f".to_string(),
                uid: None,
                gid: Some(Gid(5))
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(Syscall::decode(9999, &[]), Err(Errno::InvalidArgument));
        // Missing required argument
        assert_eq!(Syscall::decode(3, &[]), Err(Errno::InvalidArgument));
        // Wrong type
        assert_eq!(Syscall::decode(3, &["3".into()]), Err(Errno::InvalidArgument));
        assert_eq!(Syscall::decode(2, &[Arg::Int(3), Arg::Int(0)]), Err(Errno::InvalidArgument));
        // Negative where no sentinel is allowed
        assert_eq!(Syscall::decode(105, &[Arg::Int(-1)]), Err(Errno::InvalidArgument));
        assert_eq!(Syscall::decode(113, &[Arg::Int(-2), Arg::Int(0)]), Err(Errno::InvalidArgument));
    }

    #[test]
    fn test_decode_lseek_keeps_raw_whence() {
        let call = Syscall::decode(19, &[Arg::Int(3), Arg::Int(-2), Arg::Int(7)]).unwrap();
        assert_eq!(
            call,
            Syscall::Lseek {
                fd: Fd(3),
                offset: -2,
                whence: 7
            }
        );
        assert_eq!(call.nr(), SyscallNr::Lseek);
    }

    #[test]
    fn test_gate_refuses_reentry() {
        let gate = Gate::new();
        assert_eq!(gate.mode(), Mode::User);
        {
            let _guard = gate.enter().unwrap();
            assert_eq!(gate.mode(), Mode::Kernel);
            assert_eq!(gate.enter().unwrap_err(), Errno::NotPermitted);
            // The refused attempt must not drop us back to user mode
            assert_eq!(gate.mode(), Mode::Kernel);
        }
        assert_eq!(gate.mode(), Mode::User);
        assert!(gate.enter().is_ok());
    }

    #[test]
    fn test_ret_accessors() {
        assert_eq!(SyscallRet::Fd(Fd(3)).into_fd(), Ok(Fd(3)));
        assert_eq!(SyscallRet::Unit.into_fd(), Err(Errno::InvalidArgument));
        assert_eq!(SyscallRet::Status(CredStatus::Denied).as_raw(), Some(-1));
        assert_eq!(SyscallRet::Data(String::new()).as_raw(), None);
    }
}
