//! Path normalization
//!
//! Turns whatever the caller typed into the canonical absolute form the
//! resolver expects: a leading `/`, no empty, `.` or `..` segments, no
//! trailing slash except for the root itself.

/// Normalize `path` against `cwd`
///
/// A leading `~` is replaced by `home` when one is given. Relative paths
/// are joined onto `cwd`. `..` at the root stays at the root. An empty
/// path normalizes to `cwd`.
pub fn normalize(cwd: &str, path: &str, home: Option<&str>) -> String {
    let expanded;
    let path = match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => {
            expanded = format!("{}{}", home, rest);
            expanded.as_str()
        }
        _ => path,
    };

    let mut stack: Vec<&str> = Vec::new();
    let base = if path.starts_with('/') { "" } else { cwd };

    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }

    format!("/{}", stack.join("/"))
}

/// Split a normalized path into its segments; the root has none
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// The last segment of a normalized path, or `/` for the root
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("/")
}
