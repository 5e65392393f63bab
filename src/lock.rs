use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use fs4::fs_std::FileExt;
use tracing::debug;
use crate::error::{IoContext, Result};

/// File name of the advisory lock inside the config directory.
pub const LOCK_FILE_NAME: &str = "gvm.lock";

/// An exclusive advisory lock serializing gvm invocations that mutate state.
///
/// Held for the whole load-modify-save sequence and the purge/extract swap.
/// Released when dropped; the OS releases it if the process dies.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Blocks until the lock at `<config_dir>/gvm.lock` is acquired.
    pub fn acquire<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let dir = config_dir.as_ref();
        fs::create_dir_all(dir).io_context(|| format!("could not create {}", dir.display()))?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .io_context(|| format!("could not open lock {}", path.display()))?;
        debug!(path = %path.display(), "waiting for state lock");
        file.lock_exclusive()
            .io_context(|| format!("could not lock {}", path.display()))?;
        debug!(path = %path.display(), "acquired state lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "released state lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_creates_lock_file() {
        let dir = tempdir().unwrap();
        let lock = StateLock::acquire(dir.path().join("gvm")).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn test_lock_can_be_reacquired_after_drop() {
        let dir = tempdir().unwrap();
        {
            let _lock = StateLock::acquire(dir.path()).unwrap();
        }
        let _again = StateLock::acquire(dir.path()).unwrap();
    }
}
