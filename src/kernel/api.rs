//! Userspace API
//!
//! One typed method per syscall, each going through [`Kernel::syscall`],
//! plus the whole-file helpers a shell reaches for. Nothing here touches
//! kernel state directly.

use super::cred::CredStatus;
use super::process::{Fd, OpenFlags, Pid, Whence};
use super::syscall::{Errno, Syscall, SyscallResult};
use super::users::{FileMode, Gid, Uid};
use super::Kernel;
use crate::vfs::{DirEntry, FileType, Stat};

impl Kernel {
    // ========== FILE I/O ==========

    /// Open a file; `mode` applies only if it gets created
    pub fn open(&mut self, path: &str, flags: OpenFlags, mode: Option<u16>) -> SyscallResult<Fd> {
        self.syscall(Syscall::Open {
            path: path.to_string(),
            flags,
            mode,
        })?
        .into_fd()
    }

    /// Read up to `len` characters; `None` reads to the end
    pub fn read(&mut self, fd: Fd, len: Option<usize>) -> SyscallResult<String> {
        self.syscall(Syscall::Read { fd, len })?.into_data()
    }

    pub fn write(&mut self, fd: Fd, data: &str) -> SyscallResult<usize> {
        self.syscall(Syscall::Write {
            fd,
            data: data.to_string(),
        })?
        .into_count()
    }

    pub fn lseek(&mut self, fd: Fd, offset: i64, whence: Whence) -> SyscallResult<usize> {
        self.syscall(Syscall::Lseek {
            fd,
            offset,
            whence: whence as u32,
        })?
        .into_offset()
    }

    pub fn close(&mut self, fd: Fd) -> SyscallResult<()> {
        self.syscall(Syscall::Close { fd })?.into_unit()
    }

    pub fn fstat(&mut self, fd: Fd) -> SyscallResult<Stat> {
        self.syscall(Syscall::Fstat { fd })?.into_stat()
    }

    // ========== FILESYSTEM ==========

    pub fn stat(&mut self, path: &str) -> SyscallResult<Stat> {
        self.syscall(Syscall::Stat {
            path: path.to_string(),
        })?
        .into_stat()
    }

    pub fn getdents(&mut self, path: &str) -> SyscallResult<Vec<DirEntry>> {
        self.syscall(Syscall::Getdents {
            path: path.to_string(),
        })?
        .into_entries()
    }

    pub fn mkdir(&mut self, path: &str, mode: Option<u16>) -> SyscallResult<()> {
        self.syscall(Syscall::Mkdir {
            path: path.to_string(),
            mode,
        })?
        .into_unit()
    }

    pub fn rmdir(&mut self, path: &str) -> SyscallResult<()> {
        self.syscall(Syscall::Rmdir {
            path: path.to_string(),
        })?
        .into_unit()
    }

    pub fn unlink(&mut self, path: &str) -> SyscallResult<()> {
        self.syscall(Syscall::Unlink {
            path: path.to_string(),
        })?
        .into_unit()
    }

    pub fn chmod(&mut self, path: &str, mode: u16) -> SyscallResult<()> {
        self.syscall(Syscall::Chmod {
            path: path.to_string(),
            mode,
        })?
        .into_unit()
    }

    pub fn chown(&mut self, path: &str, uid: Option<Uid>, gid: Option<Gid>) -> SyscallResult<()> {
        self.syscall(Syscall::Chown {
            path: path.to_string(),
            uid,
            gid,
        })?
        .into_unit()
    }

    pub fn chdir(&mut self, path: &str) -> SyscallResult<()> {
        self.syscall(Syscall::Chdir {
            path: path.to_string(),
        })?
        .into_unit()
    }

    pub fn getcwd(&mut self) -> SyscallResult<String> {
        self.syscall(Syscall::Getcwd)?.into_path()
    }

    /// Set the creation mask, returning the previous one
    pub fn umask(&mut self, mask: u16) -> SyscallResult<u16> {
        self.syscall(Syscall::Umask { mask })?.into_mask()
    }

    // ========== PROCESS ==========

    pub fn getpid(&mut self) -> SyscallResult<Pid> {
        self.syscall(Syscall::Getpid)?.into_pid()
    }

    pub fn getppid(&mut self) -> SyscallResult<Pid> {
        self.syscall(Syscall::Getppid)?.into_pid()
    }

    // ========== USERS/SECURITY ==========

    pub fn getuid(&mut self) -> SyscallResult<Uid> {
        self.syscall(Syscall::Getuid)?.into_uid()
    }

    pub fn geteuid(&mut self) -> SyscallResult<Uid> {
        self.syscall(Syscall::Geteuid)?.into_uid()
    }

    pub fn getresuid(&mut self) -> SyscallResult<(Uid, Uid, Uid)> {
        self.syscall(Syscall::Getresuid)?.into_resuid()
    }

    pub fn getgid(&mut self) -> SyscallResult<Gid> {
        self.syscall(Syscall::Getgid)?.into_gid()
    }

    pub fn getegid(&mut self) -> SyscallResult<Gid> {
        self.syscall(Syscall::Getegid)?.into_gid()
    }

    pub fn getresgid(&mut self) -> SyscallResult<(Gid, Gid, Gid)> {
        self.syscall(Syscall::Getresgid)?.into_resgid()
    }

    pub fn setuid(&mut self, uid: Uid) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setuid { uid })?.into_status()
    }

    pub fn setreuid(&mut self, ruid: Option<Uid>, euid: Option<Uid>) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setreuid { ruid, euid })?.into_status()
    }

    pub fn setresuid(
        &mut self,
        ruid: Option<Uid>,
        euid: Option<Uid>,
        suid: Option<Uid>,
    ) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setresuid { ruid, euid, suid })?
            .into_status()
    }

    /// Set only the effective user ID
    pub fn seteuid(&mut self, euid: Uid) -> SyscallResult<CredStatus> {
        self.setreuid(None, Some(euid))
    }

    pub fn setgid(&mut self, gid: Gid) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setgid { gid })?.into_status()
    }

    pub fn setregid(&mut self, rgid: Option<Gid>, egid: Option<Gid>) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setregid { rgid, egid })?.into_status()
    }

    pub fn setresgid(
        &mut self,
        rgid: Option<Gid>,
        egid: Option<Gid>,
        sgid: Option<Gid>,
    ) -> SyscallResult<CredStatus> {
        self.syscall(Syscall::Setresgid { rgid, egid, sgid })?
            .into_status()
    }

    /// Set only the effective group ID
    pub fn setegid(&mut self, egid: Gid) -> SyscallResult<CredStatus> {
        self.setregid(None, Some(egid))
    }

    // ========== WHOLE-FILE HELPERS ==========

    /// Read a whole file
    pub fn read_file(&mut self, path: &str) -> SyscallResult<String> {
        let fd = self.open(path, OpenFlags::READ, None)?;
        let content = self.read(fd, None);
        self.close(fd)?;
        content
    }

    /// Write `data` at the start of a file, creating it with `mode` if needed
    ///
    /// Existing content past the written data is kept, as with a plain
    /// `open(O_RDWR | O_CREAT)` followed by one write.
    pub fn write_file(&mut self, path: &str, data: &str, mode: u16) -> SyscallResult<usize> {
        let fd = self.open(path, OpenFlags::RDWR | OpenFlags::O_CREAT, Some(mode))?;
        let written = self.write(fd, data);
        self.close(fd)?;
        written
    }

    /// Append to a file, creating it if needed
    pub fn append_file(&mut self, path: &str, data: &str) -> SyscallResult<usize> {
        let flags = OpenFlags::RDWR | OpenFlags::O_APPEND | OpenFlags::O_CREAT;
        let fd = self.open(path, flags, None)?;
        let written = self.write(fd, data);
        self.close(fd)?;
        written
    }

    /// Create an empty file if it does not exist yet
    pub fn create_file(&mut self, path: &str, mode: u16) -> SyscallResult<()> {
        let fd = self.open(path, OpenFlags::O_CREAT, Some(mode))?;
        self.close(fd)
    }

    /// Remove a file or an empty directory
    pub fn remove(&mut self, path: &str) -> SyscallResult<()> {
        match self.stat(path)?.kind {
            FileType::Directory => self.rmdir(path),
            FileType::File => self.unlink(path),
        }
    }

    /// True if `path` can be stat-ed by the current process
    pub fn exists(&mut self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    /// Permission bits of `path`
    pub fn mode_of(&mut self, path: &str) -> SyscallResult<FileMode> {
        self.stat(path).map(|s| s.mode)
    }

    /// Like [`Kernel::read_file`], but a missing file reads as empty
    pub fn read_file_or_empty(&mut self, path: &str) -> SyscallResult<String> {
        match self.read_file(path) {
            Err(Errno::NoSuchEntry) => Ok(String::new()),
            other => other,
        }
    }
}
