//! Kernel configuration
//!
//! What a fresh kernel looks like: the default umask, the root directory's
//! mode, tracing, and the directory tree and seed files laid down at boot.
//! Every field has a default, so a JSON config only names what it changes.

use super::trace::DEFAULT_CAPACITY;
use super::users::FileMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A directory created at boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirSpec {
    pub path: String,
    #[serde(default = "default_dir_mode")]
    pub mode: FileMode,
}

/// A file created at boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_file_mode")]
    pub mode: FileMode,
}

fn default_dir_mode() -> FileMode {
    FileMode(0o755)
}

fn default_file_mode() -> FileMode {
    FileMode(0o644)
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Umask of the root process and of every created process
    pub umask: u16,
    pub root_mode: FileMode,
    /// Start with the tracer enabled
    pub trace: bool,
    /// Events kept in the trace ring buffer
    pub trace_capacity: usize,
    /// Created in order, so parents must come first
    pub directories: Vec<DirSpec>,
    pub files: Vec<FileSpec>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        let dir = |path: &str, mode: u16| DirSpec {
            path: path.to_string(),
            mode: FileMode(mode),
        };
        let file = |path: &str, content: &str| FileSpec {
            path: path.to_string(),
            content: content.to_string(),
            mode: default_file_mode(),
        };

        Self {
            umask: 0o022,
            root_mode: FileMode(0o755),
            trace: false,
            trace_capacity: DEFAULT_CAPACITY,
            directories: vec![
                dir("/boot", 0o755),
                dir("/dev", 0o755),
                dir("/etc", 0o755),
                dir("/home", 0o755),
                dir("/media", 0o755),
                dir("/mnt", 0o755),
                dir("/opt", 0o755),
                dir("/proc", 0o755),
                dir("/root", 0o700),
                dir("/run", 0o755),
                dir("/sys", 0o555),
                dir("/tmp", 0o755),
                dir("/usr", 0o755),
                dir("/var", 0o755),
                dir("/usr/bin", 0o755),
                dir("/usr/include", 0o755),
                dir("/usr/lib", 0o755),
                dir("/usr/lib64", 0o755),
                dir("/usr/libexec", 0o755),
                dir("/usr/local", 0o755),
                dir("/usr/sbin", 0o755),
                dir("/usr/share", 0o755),
                dir("/usr/src", 0o755),
            ],
            files: vec![
                file("/etc/passwd", "root:x:0:0::/root:/bin/bash\n"),
                file("/etc/group", "root:x:0:\n"),
                file("/etc/shadow", "root:x:2048:0:99999:7:::\n"),
                file("/etc/gshadow", "root:*::\n"),
                file("/etc/hosts", ""),
            ],
        }
    }
}

impl KernelConfig {
    /// Just a root directory: no layout, no seed files
    pub fn minimal() -> Self {
        Self {
            directories: Vec::new(),
            files: Vec::new(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check modes fit in 9 bits and boot paths are absolute
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_mode("umask", self.umask)?;
        check_mode("/", self.root_mode.bits())?;

        for dir in &self.directories {
            check_path(&dir.path)?;
            check_mode(&dir.path, dir.mode.bits())?;
        }
        for file in &self.files {
            check_path(&file.path)?;
            check_mode(&file.path, file.mode.bits())?;
        }
        Ok(())
    }
}

fn check_mode(what: &str, mode: u16) -> Result<(), ConfigError> {
    if mode > FileMode::MASK {
        return Err(ConfigError::InvalidMode {
            path: what.to_string(),
            mode,
        });
    }
    Ok(())
}

fn check_path(path: &str) -> Result<(), ConfigError> {
    let segments = crate::vfs::path::segments(path);
    let dotted = segments.iter().any(|s| *s == "." || *s == "..");
    if !path.starts_with('/') || segments.is_empty() || dotted {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Not valid JSON, or the wrong shape
    Parse(String),
    /// A mode or umask outside 0..=0o777
    InvalidMode { path: String, mode: u16 },
    /// A boot path that is relative, the root itself, or contains dot segments
    InvalidPath(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
            ConfigError::InvalidMode { path, mode } => {
                write!(f, "invalid mode {:o} for {}", mode, path)
            }
            ConfigError::InvalidPath(path) => write!(f, "invalid boot path: {}", path),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
