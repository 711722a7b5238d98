//! Sidecar lock files for read-modify-write cycles.
//!
//! Data files here are replaced by renaming a temp file over them, so a lock
//! taken on the data file itself is lost at the first rewrite. Writers lock
//! `<file>.lock` instead, which is never renamed or removed.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::Result;

/// Exclusive hold on a file's sidecar lock; released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until this process holds the lock for `target`
    pub fn acquire(target: &Path) -> Result<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.lock_exclusive()?;
        tracing::trace!("Acquired {:?}", path);
        Ok(Self { file, path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release {:?}: {}", self.path, e);
        }
    }
}

pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_lock_path_is_sidecar() {
        assert_eq!(
            lock_path(Path::new("/data/outbox.jsonl")),
            PathBuf::from("/data/outbox.jsonl.lock")
        );
    }

    #[test]
    fn test_second_holder_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("active_workout.json");
        let guard = FileLock::acquire(&target).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let target = target.clone();
            std::thread::spawn(move || {
                let _lock = FileLock::acquire(&target).unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }
}
