//! Path, filename and write-permission validation.
//!
//! Every path is checked here before it is read, written, or interpolated into a prompt that
//! ends up in a backend process. Checks are read-only.

use std::fs;
use std::path::{Component, Path, PathBuf};

use nix::unistd::{access, AccessFlags};

use crate::errors::ArchyError;

pub const MAX_PATH_LENGTH: usize = 4096;

pub const BLOCKED_SYSTEM_DIRS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot", "/root"];

/// Reject traversal segments, denied system roots and oversized paths.
///
/// `..` is detected per segment with both `/` and `\` treated as separators, so `a\..\b`
/// is rejected even on Unix where the backslash is a regular character.
pub fn validate_path_security(path: &Path, description: &str) -> Result<(), ArchyError> {
    let s = path.to_string_lossy();

    if s.chars().count() > MAX_PATH_LENGTH {
        return Err(ArchyError::PathTooLong {
            description: description.to_string(),
            length: s.chars().count(),
        });
    }

    if s.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(ArchyError::PathTraversal {
            description: description.to_string(),
            path: s.to_string(),
        });
    }

    if is_blocked_system_path(path) {
        return Err(ArchyError::BlockedSystemDirectory {
            description: description.to_string(),
            path: s.to_string(),
        });
    }

    Ok(())
}

/// True when `path` equals or lies below one of BLOCKED_SYSTEM_DIRS (component-wise,
/// so `/etcetera` is not blocked).
pub fn is_blocked_system_path(path: &Path) -> bool {
    if !path.has_root() {
        return false;
    }
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    BLOCKED_SYSTEM_DIRS
        .iter()
        .any(|blocked| normalized.starts_with(blocked))
}

fn is_safe_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Accept only `[A-Za-z0-9._-]+` (full match).
///
/// `.` and `..` are made of allowed characters but do not name a file.
pub fn validate_filename_safety(name: &str) -> Result<(), ArchyError> {
    if name.is_empty() || name == "." || name == ".." || !name.chars().all(is_safe_filename_char)
    {
        return Err(ArchyError::UnsafeFilename(name.to_string()));
    }
    Ok(())
}

/// Subfolders must be relative, traversal-free and use `[A-Za-z0-9._/-]` only.
pub fn validate_subfolder(subfolder: &str) -> Result<(), ArchyError> {
    if subfolder.is_empty()
        || subfolder.starts_with('/')
        || !subfolder
            .chars()
            .all(|c| is_safe_filename_char(c) || c == '/')
    {
        return Err(ArchyError::UnsafeSubfolder(subfolder.to_string()));
    }
    validate_path_security(Path::new(subfolder), "subfolder")
}

fn is_writable(p: &Path) -> bool {
    access(p, AccessFlags::W_OK).is_ok()
}

/// Where a write to `file_path` actually lands: symlinks are followed, including dangling ones
/// whose target does not exist yet.
fn resolve_write_target(file_path: &Path, dir: &Path) -> Result<PathBuf, ArchyError> {
    let is_link = fs::symlink_metadata(file_path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return Ok(file_path.to_path_buf());
    }
    if let Ok(p) = fs::canonicalize(file_path) {
        return Ok(p);
    }
    let link = fs::read_link(file_path)
        .map_err(|e| ArchyError::io(format!("failed to read link {}", file_path.display()), e))?;
    let target = dir.join(link);
    let parent = match target.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let parent =
        fs::canonicalize(parent).map_err(|_| ArchyError::DirectoryNotWritable(parent.to_path_buf()))?;
    Ok(match target.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    })
}

/// Verify that `file_path` can be created or overwritten, then re-run the security checks on the
/// path the write resolves to.
pub fn validate_write_permission(file_path: &Path) -> Result<(), ArchyError> {
    let dir = match file_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };

    if !dir.is_dir() || !is_writable(dir) {
        return Err(ArchyError::DirectoryNotWritable(dir.to_path_buf()));
    }

    let resolved = resolve_write_target(file_path, dir)?;
    validate_path_security(&resolved, "output file")?;

    match fs::metadata(&resolved) {
        Ok(m) if !m.is_file() || !is_writable(&resolved) => {
            Err(ArchyError::FileNotOverwritable(file_path.to_path_buf()))
        }
        Ok(_) => Ok(()),
        Err(_) => {
            let parent = resolved.parent().unwrap_or(dir);
            if parent.is_dir() && is_writable(parent) {
                Ok(())
            } else {
                Err(ArchyError::DirectoryNotWritable(parent.to_path_buf()))
            }
        }
    }
}
