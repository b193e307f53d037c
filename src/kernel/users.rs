//! Identity and permission bits
//!
//! Provides the Unix-like identity primitives every access check needs:
//! - User and group identifiers
//! - The 9 permission bits of a node (rwxrwxrwx)
//! - The effective credentials a check is made with
//! - The permission checker itself

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// User identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl Uid {
    pub const ROOT: Uid = Uid(0);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(pub u32);

impl Gid {
    pub const ROOT: Gid = Gid(0);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl std::fmt::Display for Gid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requested access, a subset of read (4), write (2) and execute (1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Access(u8);

impl Access {
    pub const NONE: Access = Access(0);
    pub const READ: Access = Access(0o4);
    pub const WRITE: Access = Access(0o2);
    /// Execute on files, traverse on directories
    pub const EXEC: Access = Access(0o1);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Access) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Access {
    type Output = Access;

    fn bitor(self, rhs: Access) -> Access {
        Access(self.0 | rhs.0)
    }
}

/// File permission bits (Unix-style), always within 0..=0o777
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(pub u16);

impl FileMode {
    // Permission bits
    pub const S_IRUSR: u16 = 0o400; // Owner read
    pub const S_IWUSR: u16 = 0o200; // Owner write
    pub const S_IXUSR: u16 = 0o100; // Owner execute
    pub const S_IRGRP: u16 = 0o040; // Group read
    pub const S_IWGRP: u16 = 0o020; // Group write
    pub const S_IXGRP: u16 = 0o010; // Group execute
    pub const S_IROTH: u16 = 0o004; // Other read
    pub const S_IWOTH: u16 = 0o002; // Other write
    pub const S_IXOTH: u16 = 0o001; // Other execute

    pub const MASK: u16 = 0o777;

    // Creation defaults before the umask is applied
    pub const FILE_DEFAULT: FileMode = FileMode(0o666);
    pub const DIR_DEFAULT: FileMode = FileMode(0o777);

    pub fn new(mode: u16) -> Self {
        FileMode(mode & Self::MASK)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Apply a umask: bits set in `umask` are cleared
    pub fn with_umask(&self, umask: u16) -> FileMode {
        FileMode::new(self.0 & !umask)
    }

    /// The owner rwx triple
    pub fn owner_bits(&self) -> u8 {
        ((self.0 >> 6) & 0o7) as u8
    }

    /// The group rwx triple
    pub fn group_bits(&self) -> u8 {
        ((self.0 >> 3) & 0o7) as u8
    }

    /// The other rwx triple
    pub fn other_bits(&self) -> u8 {
        (self.0 & 0o7) as u8
    }

    /// Format as symbolic string (e.g., "rwxr-xr-x")
    pub fn to_symbolic(&self) -> String {
        let mut s = String::with_capacity(9);
        for triple in [self.owner_bits(), self.group_bits(), self.other_bits()] {
            s.push(if triple & 0o4 != 0 { 'r' } else { '-' });
            s.push(if triple & 0o2 != 0 { 'w' } else { '-' });
            s.push(if triple & 0o1 != 0 { 'x' } else { '-' });
        }
        s
    }

    /// Parse from octal string (e.g., "755")
    pub fn from_octal_str(s: &str) -> Option<Self> {
        u16::from_str_radix(s, 8)
            .ok()
            .filter(|m| *m <= Self::MASK)
            .map(FileMode)
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// The effective identity an access check is made with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub euid: Uid,
    pub egid: Gid,
}

impl Credentials {
    pub fn new(euid: Uid, egid: Gid) -> Self {
        Self { euid, egid }
    }

    pub fn root() -> Self {
        Self::new(Uid::ROOT, Gid::ROOT)
    }
}

/// Check if `cred` may access a node owned by `owner:group` with `mode`
///
/// Effective gid 0 bypasses the bits entirely. Otherwise exactly one class
/// is consulted: owner if the euid matches, else group if the egid matches,
/// else other. Classes are never OR-ed together, so an owner with `---`
/// is denied even when "other" allows the access.
pub fn check_permission(
    owner: Uid,
    group: Gid,
    mode: FileMode,
    cred: &Credentials,
    want: Access,
) -> bool {
    if cred.egid.is_root() {
        return true;
    }

    let class = if cred.euid == owner {
        mode.owner_bits()
    } else if cred.egid == group {
        mode.group_bits()
    } else {
        mode.other_bits()
    };

    class & want.bits() == want.bits()
}
