//! The kernel - processes, the filesystem and the syscall gate
//!
//! Every privileged operation enters through [`Kernel::syscall`], runs to
//! completion on the current process's behalf, and returns.
//!
//! A [`Kernel`] value owns all state. There is no global instance: callers
//! construct one (usually through [`crate::boot`]) and pass it around.

pub mod api;
pub mod config;
pub mod cred;
pub mod fs;
pub mod process;
pub mod syscall;
pub mod trace;
pub mod users;


pub use config::{ConfigError, DirSpec, FileSpec, KernelConfig};
pub use cred::CredStatus;
pub use process::{Fd, FileTable, OpenFile, OpenFlags, Pcb, Pid, ProcessTable, Whence};
pub use syscall::{Arg, Errno, Gate, Mode, Syscall, SyscallNr, SyscallResult, SyscallRet};
pub use trace::{TraceEvent, TraceSummary, Tracer};
pub use users::{Access, Credentials, FileMode, Gid, Uid};

use crate::console_log;
use crate::vfs::MemoryFs;
use syscall::{SyscallCtx, dispatch};

/// Kernel time source in milliseconds since the Unix epoch
#[derive(Debug, Default)]
struct Clock {
    /// Fixed reading, for deterministic tests
    pinned: Option<f64>,
}

impl Clock {
    fn now(&self) -> f64 {
        self.pinned.unwrap_or_else(platform_now)
    }
}

fn platform_now() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// The kernel manages all system state
#[derive(Debug)]
pub struct Kernel {
    gate: Gate,
    procs: ProcessTable,
    fs: MemoryFs,
    files: FileTable,
    tracer: Tracer,
    clock: Clock,
    /// Umask given to newly created processes
    default_umask: u16,
}

impl Kernel {
    /// A kernel with just a root directory and the root process
    pub fn new() -> Self {
        Self::with_config(&KernelConfig::minimal())
    }

    /// A kernel with `config`'s umask, root mode and tracing
    ///
    /// The directory layout is not created here; see [`crate::boot`].
    pub fn with_config(config: &KernelConfig) -> Self {
        let clock = Clock::default();
        let now = clock.now();
        let umask = config.umask & FileMode::MASK;

        let mut tracer = Tracer::with_capacity(config.trace_capacity);
        if config.trace {
            tracer.enable();
        }

        Self {
            gate: Gate::new(),
            procs: ProcessTable::new(umask, now),
            fs: MemoryFs::new(FileMode::new(config.root_mode.bits()), now),
            files: FileTable::new(),
            tracer,
            clock,
            default_umask: umask,
        }
    }

    // ========== THE GATE ==========

    /// Execute a system call on behalf of the current process
    pub fn syscall(&mut self, call: Syscall) -> SyscallResult<SyscallRet> {
        let nr = call.nr();
        let _guard = match self.gate.enter() {
            Ok(guard) => guard,
            Err(e) => {
                console_log!("[gate] refused {}: already in kernel mode", nr);
                return Err(e);
            }
        };

        let now = self.clock.now();
        let pid = self.procs.current_pid();
        let result = match self.procs.current_mut() {
            Some(pcb) => {
                let mut ctx = SyscallCtx {
                    pcb,
                    fs: &mut self.fs,
                    files: &mut self.files,
                    now,
                };
                dispatch(&mut ctx, call)
            }
            None => Err(Errno::NoSuchEntry),
        };

        self.tracer.record(now, nr, pid, result.as_ref().err().copied());
        result
    }

    /// Execute a system call given by number and raw arguments
    pub fn syscall_raw(&mut self, nr: u32, args: Vec<Arg>) -> SyscallResult<SyscallRet> {
        let call = Syscall::decode(nr, &args)?;
        self.syscall(call)
    }

    // ========== PROCESSES ==========

    /// Register a process running as `uid:gid` in `cwd`
    ///
    /// The new process is not made current.
    pub fn create_process(&mut self, uid: Uid, gid: Gid, cwd: &str) -> Pid {
        let cwd = crate::vfs::normalize("/", cwd, None);
        let now = self.clock.now();
        let pid = self
            .procs
            .create(uid, gid, &cwd, self.default_umask, now);
        console_log!("[proc] created {} uid={} gid={} cwd={}", pid, uid, gid, cwd);
        pid
    }

    /// Make `pid` the current process
    pub fn set_current(&mut self, pid: Pid) -> bool {
        let switched = self.procs.set_current(pid);
        if switched {
            console_log!("[proc] current is now {}", pid);
        } else {
            console_log!("[proc] no such process: {}", pid);
        }
        switched
    }

    pub fn current(&self) -> Option<&Pcb> {
        self.procs.current()
    }

    pub fn process(&self, pid: Pid) -> Option<&Pcb> {
        self.procs.get(pid)
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }

    // ========== INTROSPECTION ==========

    /// Read-only view of the filesystem arena
    pub fn vfs(&self) -> &MemoryFs {
        &self.fs
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    // ========== TIME ==========

    /// Current kernel time in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Pin the clock to `ms`; every later timestamp reads this value
    pub fn set_time(&mut self, ms: f64) {
        self.clock.pinned = Some(ms);
    }

    /// Go back to the platform clock
    pub fn unpin_time(&mut self) {
        self.clock.pinned = None;
    }

    // ========== TRACING ==========

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn trace_enable(&mut self) {
        self.tracer.enable();
    }

    pub fn trace_disable(&mut self) {
        self.tracer.disable();
    }

    pub fn trace_reset(&mut self) {
        self.tracer.reset();
    }

    pub fn trace_summary(&self) -> TraceSummary {
        self.tracer.summary()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
