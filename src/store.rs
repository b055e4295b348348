//! Media Store capability interface
//!
//! The platform catalog that external viewers read. Entries are
//! created, written, then finalized; on stores with staged visibility
//! a partially-written entry is never visible to viewers. The staged
//! and direct behaviors are separate implementations selected at
//! startup, so the pipeline never branches on platform capability.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an entry named '{0}' already exists")]
    AlreadyExists(String),
    #[error("failed to create entry: {0}")]
    Create(std::io::Error),
    #[error("failed to write entry: {0}")]
    Write(std::io::Error),
    #[error("failed to finalize entry: {0}")]
    Finalize(std::io::Error),
}

/// Handle for an entry between `create_pending` and `finalize`.
#[derive(Clone, Debug)]
pub struct EntryHandle {
    pub display_name: String,
    /// Where bytes are written while the entry is pending
    staging_path: PathBuf,
    /// Where the entry lives once visible
    final_path: PathBuf,
}

impl EntryHandle {
    /// Path external viewers see once the entry is finalized.
    pub fn visible_path(&self) -> &Path {
        &self.final_path
    }
}

pub trait MediaStore: Send + Sync {
    /// Create a new, not-yet-visible entry. Display names must be
    /// unique; a collision is refused rather than overwritten.
    fn create_pending(&self, display_name: &str, mime: &str) -> Result<EntryHandle, StoreError>;

    fn write(&self, entry: &EntryHandle, bytes: &[u8]) -> Result<(), StoreError>;

    /// Mark a fully-written entry visible.
    fn finalize(&self, entry: &EntryHandle) -> Result<(), StoreError>;

    /// Best-effort removal of an entry (cleanup path). Failure is
    /// logged, never escalated.
    fn delete(&self, entry: &EntryHandle);
}

fn check_collision(dir: &Path, display_name: &str) -> Result<PathBuf, StoreError> {
    let final_path = dir.join(display_name);
    if final_path.exists() {
        return Err(StoreError::AlreadyExists(display_name.to_string()));
    }
    Ok(final_path)
}

/// Store with staged visibility: bytes land in a `.pending` sibling
/// and finalize renames it into place, so viewers never observe a
/// partial entry.
pub struct StagedMediaStore {
    dir: PathBuf,
}

impl StagedMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl MediaStore for StagedMediaStore {
    fn create_pending(&self, display_name: &str, mime: &str) -> Result<EntryHandle, StoreError> {
        let final_path = check_collision(&self.dir, display_name)?;
        let staging_path = self.dir.join(format!("{display_name}.pending"));
        fs::File::create(&staging_path).map_err(StoreError::Create)?;
        log::debug!("created pending entry {display_name} ({mime})");
        Ok(EntryHandle {
            display_name: display_name.to_string(),
            staging_path,
            final_path,
        })
    }

    fn write(&self, entry: &EntryHandle, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(&entry.staging_path, bytes).map_err(StoreError::Write)
    }

    fn finalize(&self, entry: &EntryHandle) -> Result<(), StoreError> {
        fs::rename(&entry.staging_path, &entry.final_path).map_err(StoreError::Finalize)?;
        log::info!("entry {} now visible", entry.display_name);
        Ok(())
    }

    fn delete(&self, entry: &EntryHandle) {
        for path in [&entry.staging_path, &entry.final_path] {
            if path.exists() {
                if let Err(err) = fs::remove_file(path) {
                    log::warn!("failed to clean up {}: {err}", path.display());
                }
            }
        }
    }
}

/// Store without staged visibility: bytes are written straight to the
/// final name (the pre-staging platform path).
pub struct DirectMediaStore {
    dir: PathBuf,
}

impl DirectMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl MediaStore for DirectMediaStore {
    fn create_pending(&self, display_name: &str, mime: &str) -> Result<EntryHandle, StoreError> {
        let final_path = check_collision(&self.dir, display_name)?;
        fs::File::create(&final_path).map_err(StoreError::Create)?;
        log::debug!("created entry {display_name} ({mime})");
        Ok(EntryHandle {
            display_name: display_name.to_string(),
            staging_path: final_path.clone(),
            final_path,
        })
    }

    fn write(&self, entry: &EntryHandle, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(&entry.staging_path, bytes).map_err(StoreError::Write)
    }

    fn finalize(&self, entry: &EntryHandle) -> Result<(), StoreError> {
        log::info!("entry {} now visible", entry.display_name);
        Ok(())
    }

    fn delete(&self, entry: &EntryHandle) {
        if let Err(err) = fs::remove_file(&entry.final_path) {
            log::warn!("failed to clean up {}: {err}", entry.final_path.display());
        }
    }
}

/// The store used on this platform. Staged visibility is available
/// wherever same-directory renames are atomic, which covers every
/// target we build for.
pub fn platform_store(dir: impl Into<PathBuf>) -> std::io::Result<Box<dyn MediaStore>> {
    Ok(Box::new(StagedMediaStore::new(dir)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Entries visible to an external viewer: final names only, never
    /// `.pending` staging files.
    fn visible_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !name.ends_with(".pending"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn staged_entry_invisible_until_finalized() {
        let dir = TempDir::new().unwrap();
        let store = StagedMediaStore::new(dir.path()).unwrap();

        let entry = store.create_pending("IMG_1.jpg", "image/jpeg").unwrap();
        store.write(&entry, b"bytes").unwrap();
        assert!(visible_entries(dir.path()).is_empty());

        store.finalize(&entry).unwrap();
        assert_eq!(visible_entries(dir.path()), vec!["IMG_1.jpg"]);
        assert_eq!(fs::read(entry.visible_path()).unwrap(), b"bytes");
    }

    #[test]
    fn staged_delete_removes_pending_entry() {
        let dir = TempDir::new().unwrap();
        let store = StagedMediaStore::new(dir.path()).unwrap();

        let entry = store.create_pending("IMG_2.jpg", "image/jpeg").unwrap();
        store.write(&entry, b"partial").unwrap();
        store.delete(&entry);

        assert!(visible_entries(dir.path()).is_empty());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn direct_store_writes_final_name() {
        let dir = TempDir::new().unwrap();
        let store = DirectMediaStore::new(dir.path()).unwrap();

        let entry = store.create_pending("IMG_3.jpg", "image/jpeg").unwrap();
        store.write(&entry, b"bytes").unwrap();
        store.finalize(&entry).unwrap();
        assert_eq!(visible_entries(dir.path()), vec!["IMG_3.jpg"]);
    }

    #[test]
    fn duplicate_display_names_are_refused() {
        let dir = TempDir::new().unwrap();
        let store = StagedMediaStore::new(dir.path()).unwrap();

        let entry = store.create_pending("IMG_4.jpg", "image/jpeg").unwrap();
        store.write(&entry, b"bytes").unwrap();
        store.finalize(&entry).unwrap();

        let err = store.create_pending("IMG_4.jpg", "image/jpeg").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }
}
