//! Locked access to SRR files on disk.
//!
//! Readers hold a shared advisory lock and writers an exclusive one for the
//! whole operation. Rewrites go to a temporary file in the same directory
//! which then replaces the original, so a crash leaves either the old or
//! the new content. A lock only counts once the path is checked to still
//! name the locked file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, SrrError};

/// Lock mode taken on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// An open SRR file holding an advisory lock until dropped.
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Open and lock `path`, blocking until the lock is granted.
    ///
    /// A writer may replace the file while we wait on the old one; the lock
    /// is then retaken on whatever the path names now.
    pub fn open(path: impl AsRef<Path>, mode: LockMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        loop {
            let file = match mode {
                LockMode::Shared => File::open(&path)?,
                LockMode::Exclusive => OpenOptions::new().read(true).write(true).open(&path)?,
            };
            let locked = match mode {
                LockMode::Shared => file.lock_shared(),
                LockMode::Exclusive => file.lock(),
            };
            locked.map_err(|source| SrrError::Lock {
                path: path.clone(),
                source,
            })?;

            if is_same_file(&file, &path)? {
                debug!(path = %path.display(), ?mode, "locked");
                return Ok(Self { file, path });
            }
            debug!(path = %path.display(), "replaced while waiting for the lock");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Replace the file content with `data`.
    ///
    /// The original permissions are kept. The lock stays on the replaced
    /// inode until this value is dropped; anyone waiting on it reopens the
    /// new file in [`LockedFile::open`].
    pub fn replace_contents(&self, data: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.as_file()
            .set_permissions(self.file.metadata()?.permissions())?;
        temp.persist(&self.path).map_err(|e| SrrError::Io(e.error))?;
        debug!(path = %self.path.display(), bytes = data.len(), "rewrote");
        Ok(())
    }
}

/// Whether `path` still names the open `file`.
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let open = file.metadata()?;
    let current = std::fs::metadata(path)?;
    Ok(open.dev() == current.dev() && open.ino() == current.ino())
}

/// No stable file identity without unix metadata; trust the first open.
#[cfg(not(unix))]
fn is_same_file(_file: &File, _path: &Path) -> Result<bool> {
    Ok(true)
}
