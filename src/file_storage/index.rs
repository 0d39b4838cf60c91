//! Index file management for session listing
//!
//! The index keeps session descriptors in creation order so listing never has
//! to open every session file. Read-modify-write cycles on the index are
//! serialized through an advisory lock file.

use super::{atomic_write, ensure_dir, read_json, FileResult};
use crate::models::SessionDescriptor;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Version of the index file format
const INDEX_VERSION: u32 = 1;

const INDEX_FILE_NAME: &str = "index.json";
const LOCK_FILE_NAME: &str = "index.lock";

/// Generic index file wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile<T> {
    /// File format version
    pub version: u32,
    /// When this index was last updated
    pub updated_at: DateTime<Utc>,
    /// The indexed entries
    pub entries: Vec<T>,
}

impl<T> Default for IndexFile<T> {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            updated_at: Utc::now(),
            entries: Vec::new(),
        }
    }
}

/// Exclusive advisory lock held while the index is rewritten.
/// The lock file itself stays on disk; only the lock is released on drop.
pub struct IndexLock {
    file: File,
}

impl IndexLock {
    pub fn acquire(dir: &Path) -> FileResult<Self> {
        ensure_dir(dir)?;
        let lock_path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| format!("Failed to open lock file {:?}: {}", lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| format!("Failed to lock {:?}: {}", lock_path, e))?;
        Ok(Self { file })
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release index lock: {}", e);
        }
    }
}

/// Get the path to the index file in a directory
pub fn get_index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE_NAME)
}

/// Read an index file, returning an empty index if it doesn't exist
pub fn read_index<T: serde::de::DeserializeOwned>(dir: &Path) -> FileResult<IndexFile<T>> {
    let index_path = get_index_path(dir);

    if !index_path.exists() {
        return Ok(IndexFile::default());
    }

    read_json(&index_path)
}

/// Write an index file
pub fn write_index<T: serde::Serialize>(dir: &Path, entries: Vec<T>) -> FileResult<()> {
    ensure_dir(dir)?;

    let index = IndexFile {
        version: INDEX_VERSION,
        updated_at: Utc::now(),
        entries,
    };

    let content = serde_json::to_string_pretty(&index)
        .map_err(|e| format!("Failed to serialize index: {}", e))?;

    atomic_write(&get_index_path(dir), &content)
}

/// Update a single entry in an index file under the index lock.
/// New entries are appended so the index keeps creation order.
pub fn update_index_entry<T, F>(dir: &Path, entry_id: &str, update_fn: F) -> FileResult<()>
where
    T: serde::de::DeserializeOwned + serde::Serialize + Clone + HasId,
    F: FnOnce(Option<T>) -> Option<T>,
{
    let _lock = IndexLock::acquire(dir)?;
    let mut index: IndexFile<T> = read_index(dir)?;

    let existing_idx = index.entries.iter().position(|e| e.get_id() == entry_id);
    let existing = existing_idx.map(|idx| index.entries[idx].clone());

    match (existing_idx, update_fn(existing)) {
        (Some(idx), Some(entry)) => index.entries[idx] = entry,
        (None, Some(entry)) => index.entries.push(entry),
        (Some(idx), None) => {
            index.entries.remove(idx);
        }
        (None, None) => return Ok(()),
    }

    write_index(dir, index.entries)
}

/// Remove an entry from an index file. Returns whether an entry was removed.
pub fn remove_index_entry<T>(dir: &Path, entry_id: &str) -> FileResult<bool>
where
    T: serde::de::DeserializeOwned + serde::Serialize + HasId,
{
    let _lock = IndexLock::acquire(dir)?;
    let mut index: IndexFile<T> = read_index(dir)?;

    let initial_len = index.entries.len();
    index.entries.retain(|e| e.get_id() != entry_id);

    if index.entries.len() == initial_len {
        return Ok(false);
    }

    write_index(dir, index.entries)?;
    Ok(true)
}

/// Rebuild an index from the individual JSON files in a directory
pub fn rebuild_index<T, F, K>(dir: &Path, file_to_entry: F, sort_key: K) -> FileResult<Vec<T>>
where
    T: serde::Serialize + Clone,
    F: Fn(&Path) -> Option<T>,
    K: Fn(&T) -> DateTime<Utc>,
{
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let _lock = IndexLock::acquire(dir)?;

    let mut entries: Vec<T> = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .filter(|path| path.file_name().map_or(true, |name| name != INDEX_FILE_NAME))
        .filter_map(|path| file_to_entry(&path))
        .collect();

    entries.sort_by_key(|e| sort_key(e));

    write_index(dir, entries.clone())?;

    Ok(entries)
}

/// Trait for types that have an ID field
pub trait HasId {
    fn get_id(&self) -> &str;
}

impl HasId for SessionDescriptor {
    fn get_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn descriptor(id: &str, name: &str) -> SessionDescriptor {
        let now = Utc::now();
        SessionDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_read_empty_index() {
        let temp_dir = TempDir::new().unwrap();
        let index: IndexFile<SessionDescriptor> = read_index(temp_dir.path()).unwrap();

        assert_eq!(index.version, INDEX_VERSION);
        assert!(index.entries.is_empty());
    }

    #[test]
    fn test_write_and_read_index() {
        let temp_dir = TempDir::new().unwrap();

        write_index(
            temp_dir.path(),
            vec![descriptor("s-1", "First"), descriptor("s-2", "Second")],
        )
        .unwrap();

        let index: IndexFile<SessionDescriptor> = read_index(temp_dir.path()).unwrap();
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[0].id, "s-1");
        assert_eq!(index.entries[1].id, "s-2");
    }

    #[test]
    fn test_update_index_entry_appends_then_replaces() {
        let temp_dir = TempDir::new().unwrap();

        update_index_entry::<SessionDescriptor, _>(temp_dir.path(), "s-1", |_| {
            Some(descriptor("s-1", "First"))
        })
        .unwrap();
        update_index_entry::<SessionDescriptor, _>(temp_dir.path(), "s-2", |_| {
            Some(descriptor("s-2", "Second"))
        })
        .unwrap();
        update_index_entry::<SessionDescriptor, _>(temp_dir.path(), "s-1", |existing| {
            let mut entry = existing.unwrap();
            entry.name = "Renamed".to_string();
            Some(entry)
        })
        .unwrap();

        let index: IndexFile<SessionDescriptor> = read_index(temp_dir.path()).unwrap();
        let names: Vec<&str> = index.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Renamed", "Second"]);
    }

    #[test]
    fn test_remove_index_entry() {
        let temp_dir = TempDir::new().unwrap();
        write_index(
            temp_dir.path(),
            vec![descriptor("s-1", "First"), descriptor("s-2", "Second")],
        )
        .unwrap();

        assert!(remove_index_entry::<SessionDescriptor>(temp_dir.path(), "s-1").unwrap());
        assert!(!remove_index_entry::<SessionDescriptor>(temp_dir.path(), "s-1").unwrap());

        let index: IndexFile<SessionDescriptor> = read_index(temp_dir.path()).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].id, "s-2");
    }

    #[test]
    fn test_rebuild_index_sorts_by_key() {
        let temp_dir = TempDir::new().unwrap();
        let older = Utc::now() - Duration::hours(1);

        let mut first = descriptor("s-old", "Old");
        first.created_at = older;
        let second = descriptor("s-new", "New");

        crate::file_storage::write_json(&temp_dir.path().join("s-new.json"), &second).unwrap();
        crate::file_storage::write_json(&temp_dir.path().join("s-old.json"), &first).unwrap();

        let entries = rebuild_index(
            temp_dir.path(),
            |path| read_json::<SessionDescriptor>(path).ok(),
            |e: &SessionDescriptor| e.created_at,
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "s-old");
        assert_eq!(entries[1].id, "s-new");
        assert!(get_index_path(temp_dir.path()).exists());
    }

    #[test]
    fn test_lock_file_persists_after_release() {
        let temp_dir = TempDir::new().unwrap();
        {
            let _lock = IndexLock::acquire(temp_dir.path()).unwrap();
        }
        assert!(temp_dir.path().join(LOCK_FILE_NAME).exists());
        // Re-acquiring after release must not block
        let _again = IndexLock::acquire(temp_dir.path()).unwrap();
    }
}
