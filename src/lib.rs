//! hollow - a synthetic POSIX-like kernel core
//!
//! Everything a shell needs to feel like it is talking to a Unix box,
//! and nothing more:
//! - Processes with real/effective/saved uid and gid
//! - An in-memory filesystem with Unix permission bits
//! - A kernel-wide file descriptor table
//! - One syscall gate that every operation goes through
//!
//! The shell, the account database and the terminal front-end are
//! consumers of [`kernel::Kernel`]; they live elsewhere.
//!
//! Platform support:
//! - Browser (wasm32-unknown-unknown): logs to the console, clock from `Date.now()`
//! - Native: logs to stderr, clock from `SystemTime`

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod boot;
pub mod kernel;
pub mod vfs;

pub use boot::boot;
pub use kernel::{Kernel, KernelConfig};

/// Initialize panic hook for better error messages in browser console
#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WASM entry point. The front-end builds its own kernel via [`boot`].
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    init_panic_hook();
}

/// Console logging helper
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// Log to browser console (WASM)
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format!($($t)*))
    };
}

/// Log to stderr (native)
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}
