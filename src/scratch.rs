use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::ArchyError;

/// Owner-only per-run scratch directory holding prompt and response artifacts.
///
/// Removed when dropped, which covers early returns, backend failures and interruptions (the
/// signal handler only sets a flag; the run unwinds through normal error returns).
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh `archy.*` directory under the system temp dir with mode 0700.
    pub fn create() -> Result<Self, ArchyError> {
        let dir = tempfile::Builder::new()
            .prefix("archy.")
            .tempdir()
            .map_err(|e| ArchyError::io("failed to create scratch directory", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700)).map_err(|e| {
                ArchyError::io(
                    format!("failed to restrict {}", dir.path().display()),
                    e,
                )
            })?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the scratch directory.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf, ArchyError> {
        let p = self.dir.path().join(name);
        fs::write(&p, contents)
            .map_err(|e| ArchyError::io(format!("failed to write {}", p.display()), e))?;
        Ok(p)
    }
}
