//! Credential syscalls
//!
//! The real/effective/saved id state machine of the current process.
//! Setters never fail with an errno: a refused transition returns
//! [`CredStatus::Denied`] and leaves every id untouched.
//!
//! Rules (POSIX):
//! - A privileged caller (euid 0 for uids, egid 0 for gids) may set any value
//! - An unprivileged caller may only pick among its current real,
//!   effective and saved ids
//! - setre*id updates the saved id whenever the effective id changes

use super::syscall::SyscallCtx;
use super::users::{Gid, Uid};

/// Outcome of a credential setter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CredStatus {
    Ok,
    Denied,
}

impl CredStatus {
    /// The C return value: 0 on success, -1 when denied
    pub fn as_raw(&self) -> i32 {
        match self {
            CredStatus::Ok => 0,
            CredStatus::Denied => -1,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == CredStatus::Ok
    }
}

/// Shared transition logic for one id family (uids or gids)
struct Ids<T> {
    real: T,
    effective: T,
    saved: T,
}

impl<T: Copy + PartialEq> Ids<T> {
    fn may_pick(&self, privileged: bool, value: Option<T>) -> bool {
        match value {
            None => true,
            Some(v) => privileged || v == self.real || v == self.effective || v == self.saved,
        }
    }

    /// setuid/setgid
    fn set(&mut self, privileged: bool, target: T) -> CredStatus {
        if privileged {
            self.real = target;
            self.effective = target;
            self.saved = target;
            CredStatus::Ok
        } else if target == self.real || target == self.saved {
            self.effective = target;
            CredStatus::Ok
        } else {
            CredStatus::Denied
        }
    }

    /// setreuid/setregid
    fn set_re(&mut self, privileged: bool, real: Option<T>, effective: Option<T>) -> CredStatus {
        if !self.may_pick(privileged, real) || !self.may_pick(privileged, effective) {
            return CredStatus::Denied;
        }

        let old_effective = self.effective;
        if let Some(r) = real {
            self.real = r;
        }
        if let Some(e) = effective {
            self.effective = e;
        }
        if self.effective != old_effective {
            self.saved = self.effective;
        }
        CredStatus::Ok
    }

    /// setresuid/setresgid
    fn set_res(
        &mut self,
        privileged: bool,
        real: Option<T>,
        effective: Option<T>,
        saved: Option<T>,
    ) -> CredStatus {
        let allowed = [real, effective, saved]
            .into_iter()
            .all(|v| self.may_pick(privileged, v));
        if !allowed {
            return CredStatus::Denied;
        }

        if let Some(r) = real {
            self.real = r;
        }
        if let Some(e) = effective {
            self.effective = e;
        }
        if let Some(s) = saved {
            self.saved = s;
        }
        CredStatus::Ok
    }
}

impl SyscallCtx<'_> {
    fn uids(&self) -> Ids<Uid> {
        Ids {
            real: self.pcb.uid,
            effective: self.pcb.euid,
            saved: self.pcb.suid,
        }
    }

    fn store_uids(&mut self, ids: Ids<Uid>) {
        self.pcb.uid = ids.real;
        self.pcb.euid = ids.effective;
        self.pcb.suid = ids.saved;
    }

    fn gids(&self) -> Ids<Gid> {
        Ids {
            real: self.pcb.gid,
            effective: self.pcb.egid,
            saved: self.pcb.sgid,
        }
    }

    fn store_gids(&mut self, ids: Ids<Gid>) {
        self.pcb.gid = ids.real;
        self.pcb.egid = ids.effective;
        self.pcb.sgid = ids.saved;
    }

    pub fn sys_getuid(&self) -> Uid {
        self.pcb.uid
    }

    pub fn sys_geteuid(&self) -> Uid {
        self.pcb.euid
    }

    pub fn sys_getresuid(&self) -> (Uid, Uid, Uid) {
        (self.pcb.uid, self.pcb.euid, self.pcb.suid)
    }

    pub fn sys_getgid(&self) -> Gid {
        self.pcb.gid
    }

    pub fn sys_getegid(&self) -> Gid {
        self.pcb.egid
    }

    pub fn sys_getresgid(&self) -> (Gid, Gid, Gid) {
        (self.pcb.gid, self.pcb.egid, self.pcb.sgid)
    }

    /// Set user ID
    ///
    /// Root sets all three ids. Anyone else may only switch the effective
    /// id back to the real or saved one.
    pub fn sys_setuid(&mut self, uid: Uid) -> CredStatus {
        let privileged = self.pcb.euid.is_root();
        let mut ids = self.uids();
        let status = ids.set(privileged, uid);
        if status.is_ok() {
            self.store_uids(ids);
        }
        status
    }

    /// Set real and/or effective user ID
    pub fn sys_setreuid(&mut self, ruid: Option<Uid>, euid: Option<Uid>) -> CredStatus {
        let privileged = self.pcb.euid.is_root();
        let mut ids = self.uids();
        let status = ids.set_re(privileged, ruid, euid);
        if status.is_ok() {
            self.store_uids(ids);
        }
        status
    }

    /// Set real, effective and saved user IDs, all or nothing
    pub fn sys_setresuid(
        &mut self,
        ruid: Option<Uid>,
        euid: Option<Uid>,
        suid: Option<Uid>,
    ) -> CredStatus {
        let privileged = self.pcb.euid.is_root();
        let mut ids = self.uids();
        let status = ids.set_res(privileged, ruid, euid, suid);
        if status.is_ok() {
            self.store_uids(ids);
        }
        status
    }

    /// Set group ID; privileged when the effective gid is 0
    pub fn sys_setgid(&mut self, gid: Gid) -> CredStatus {
        let privileged = self.pcb.egid.is_root();
        let mut ids = self.gids();
        let status = ids.set(privileged, gid);
        if status.is_ok() {
            self.store_gids(ids);
        }
        status
    }

    pub fn sys_setregid(&mut self, rgid: Option<Gid>, egid: Option<Gid>) -> CredStatus {
        let privileged = self.pcb.egid.is_root();
        let mut ids = self.gids();
        let status = ids.set_re(privileged, rgid, egid);
        if status.is_ok() {
            self.store_gids(ids);
        }
        status
    }

    pub fn sys_setresgid(
        &mut self,
        rgid: Option<Gid>,
        egid: Option<Gid>,
        sgid: Option<Gid>,
    ) -> CredStatus {
        let privileged = self.pcb.egid.is_root();
        let mut ids = self.gids();
        let status = ids.set_res(privileged, rgid, egid, sgid);
        if status.is_ok() {
            self.store_gids(ids);
        }
        status
    }
}
