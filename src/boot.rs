//! Boot sequence
//!
//! Builds a kernel and lays down the initial filesystem through the same
//! syscalls any caller would use, running as the root process.

use crate::console_log;
use crate::kernel::syscall::SyscallResult;
use crate::kernel::{Kernel, KernelConfig};

/// Boot a kernel from `config`
///
/// Directories are created in order, then the seed files are written.
/// Each is created with its configured mode, which the umask leaves alone.
pub fn boot(config: &KernelConfig) -> SyscallResult<Kernel> {
    let mut kernel = Kernel::with_config(config);
    init_filesystem(&mut kernel, config)?;

    console_log!(
        "[boot] {} directories, {} files, umask {:04o}",
        config.directories.len(),
        config.files.len(),
        config.umask
    );
    Ok(kernel)
}

/// Set up the initial filesystem structure using syscalls
fn init_filesystem(kernel: &mut Kernel, config: &KernelConfig) -> SyscallResult<()> {
    for dir in &config.directories {
        kernel.mkdir(&dir.path, Some(dir.mode.bits()))?;
    }

    for file in &config.files {
        kernel.write_file(&file.path, &file.content, file.mode.bits())?;
    }
    Ok(())
}
