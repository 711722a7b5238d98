//! Session snapshot persistence with file locking.
//!
//! Lets a process pick the active workout back up after a restart. The
//! snapshot is a convenience copy: the durable record of a finished workout
//! is always the database.

use super::SessionStore;
use crate::lock::FileLock;
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl SessionStore {
    /// Load a snapshot with shared locking
    ///
    /// Returns an idle store if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an idle store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No session snapshot found, starting idle");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open session snapshot {:?}: {}. Starting idle.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock session snapshot {:?}: {}. Starting idle.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read session snapshot {:?}: {}. Starting idle.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<SessionStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded session snapshot from {:?}", path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse session snapshot {:?}: {}. Starting idle.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save a snapshot with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames it
    /// over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "snapshot path missing parent",
            ))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved session snapshot to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back in one step
    ///
    /// Holds the snapshot's sidecar lock throughout, so concurrent updates
    /// run one after another. Nothing is saved if `f` fails.
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionStore) -> Result<T>,
    {
        let _lock = FileLock::acquire(path)?;
        let mut store = Self::load(path)?;
        let value = f(&mut store)?;
        store.save(path)?;
        Ok(value)
    }
}
