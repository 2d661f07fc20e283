use std::path::Path;

use crate::error::MacpineError;
use crate::paths::{self, Paths};

/// Names of all instances on this host: every directory under `~/.macpine`
/// except the cache and hidden entries.
pub fn list_instance_names(paths: &Paths) -> Result<Vec<String>, MacpineError> {
    let entries = match std::fs::read_dir(paths.root()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(MacpineError::io(
                format!("failed to list {}", paths.root().display()),
                e,
            ));
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name != "cache" && !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

/// Process id recorded by the engine for the instance at `location`.
pub fn instance_pid(location: &Path) -> Option<u32> {
    let contents = std::fs::read_to_string(paths::pid_path(location)).ok()?;
    contents.trim().parse().ok()
}
