//! Advisory directory lock held while renumbering.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::AnnoprepError;

/// Name of the lock file created inside the locked directory.
///
/// It is a dot-file, so directory listings never count it as data. The file
/// stays after the lock is released: every process must lock the same inode,
/// and deleting it would let a late opener lock an orphaned copy.
pub const LOCK_FILE_NAME: &str = ".annoprep.lock";

/// Exclusive advisory lock on a directory, released on drop.
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Take the lock without blocking.
    ///
    /// Fails with [`AnnoprepError::DirectoryLocked`] if another handle
    /// already holds it.
    pub fn acquire(dir: &Path) -> Result<Self, AnnoprepError> {
        if !dir.is_dir() {
            return Err(AnnoprepError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(AnnoprepError::Io)?;

        match file.try_lock() {
            Ok(()) => {
                debug!("locked {}", dir.display());
                Ok(Self { file, path })
            }
            Err(TryLockError::WouldBlock) => Err(AnnoprepError::DirectoryLocked {
                path: dir.to_path_buf(),
            }),
            Err(TryLockError::Error(source)) => Err(AnnoprepError::Io(source)),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!("could not release lock {}: {}", self.path.display(), err);
        }
    }
}
