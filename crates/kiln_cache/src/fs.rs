//! Crash-safe filesystem helpers shared by the cache and artifact persistence.

use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Writes `data` to `path` by writing a sibling temporary file and renaming
/// it into place, so readers never observe a half-written file.
///
/// Parent directories are created as needed. On unix the file is given the
/// permission bits in `mode` before it becomes visible.
pub fn write_atomic(path: &Path, data: &[u8], mode: u32) -> Result<(), CacheError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let tmp = temp_path(path);
    let result = write_and_rename(&tmp, path, data, mode);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, path: &Path, data: &[u8], mode: u32) -> Result<(), CacheError> {
    use std::io::Write;

    let mut file = std::fs::File::create(tmp).map_err(|e| CacheError::io(tmp, e))?;
    file.write_all(data).map_err(|e| CacheError::io(tmp, e))?;
    file.sync_all().map_err(|e| CacheError::io(tmp, e))?;
    drop(file);
    set_mode(tmp, mode)?;
    std::fs::rename(tmp, path).map_err(|e| CacheError::io(path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), CacheError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| CacheError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), CacheError> {
    Ok(())
}

/// Returns the permission bits of an existing file, or `None` on platforms
/// without them.
#[cfg(unix)]
pub fn file_mode(path: &Path) -> Result<Option<u32>, CacheError> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path).map_err(|e| CacheError::io(path, e))?;
    Ok(Some(metadata.permissions().mode() & 0o777))
}

/// Returns the permission bits of an existing file, or `None` on platforms
/// without them.
#[cfg(not(unix))]
pub fn file_mode(_path: &Path) -> Result<Option<u32>, CacheError> {
    Ok(None)
}

/// Gives an existing file the permission bits in `mode`. Returns `true` if
/// they had to change.
pub fn ensure_mode(path: &Path, mode: u32) -> Result<bool, CacheError> {
    match file_mode(path)? {
        Some(current) if current != mode & 0o777 => {
            set_mode(path, mode)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Returns the temporary sibling used while writing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Removes a file, returning `false` if it did not exist.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Removes empty directories from `start` upward, stopping at (and never
/// removing) `root`.
pub fn prune_empty_dirs(start: &Path, root: &Path) -> Result<(), CacheError> {
    let mut current = start.to_path_buf();
    while current.starts_with(root) && current != root {
        let is_empty = match std::fs::read_dir(&current) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(CacheError::io(&current, e)),
        };
        if !is_empty {
            break;
        }
        std::fs::remove_dir(&current).map_err(|e| CacheError::io(&current, e))?;
        if !current.pop() {
            break;
        }
    }
    Ok(())
}
