//! Session file storage
//!
//! Stores each research session in `sessions/{id}.json` as a versioned file
//! holding the descriptor and the full document. Every mutation rewrites the
//! whole file atomically and refreshes `updated_at`.

use super::index::{read_index, rebuild_index, remove_index_entry, update_index_entry, IndexFile};
use super::{read_json, write_json};
use crate::error::{LabError, LabResult};
use crate::models::{SessionDescriptor, SessionDocument, REQUIRED_DOCUMENT_KEYS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Version of the session file format
const SESSION_FILE_VERSION: u32 = 1;

/// Session file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    /// File format version
    pub version: u32,
    /// When this file was last updated
    pub updated_at: DateTime<Utc>,
    pub session: SessionDescriptor,
    pub document: SessionDocument,
}

/// Keyed whole-document storage for research sessions
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `{data_dir}/sessions`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("sessions"),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.dir
    }

    /// Session ids are UUIDs; anything else can never name a stored session
    fn session_path(&self, id: &str) -> LabResult<PathBuf> {
        uuid::Uuid::parse_str(id).map_err(|_| LabError::not_found("Session", id))?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    fn read_file(&self, id: &str) -> LabResult<SessionFile> {
        let path = self.session_path(id)?;
        if !path.exists() {
            return Err(LabError::not_found("Session", id));
        }
        read_json(&path).map_err(LabError::Storage)
    }

    fn write_file(&self, file: &SessionFile) -> LabResult<()> {
        let path = self.session_path(&file.session.id)?;
        write_json(&path, file).map_err(LabError::Storage)?;

        // The session file is the source of truth; list() repairs a stale index
        let entry = file.session.clone();
        if let Err(e) =
            update_index_entry::<SessionDescriptor, _>(&self.dir, &file.session.id, |_| Some(entry))
        {
            log::warn!("Failed to update session index for {}: {}", file.session.id, e);
        }
        Ok(())
    }

    /// Create a new empty session and persist it immediately
    pub fn create(&self, name: &str) -> LabResult<SessionDescriptor> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LabError::validation("Session name cannot be empty"));
        }

        let now = Utc::now();
        let descriptor = SessionDescriptor {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.write_file(&SessionFile {
            version: SESSION_FILE_VERSION,
            updated_at: now,
            session: descriptor.clone(),
            document: SessionDocument::default(),
        })?;

        log::info!("Created session '{}' ({})", descriptor.name, descriptor.id);
        Ok(descriptor)
    }

    /// List sessions in creation order. The index is rebuilt from the session
    /// files whenever it does not account for every one of them.
    pub fn list(&self) -> LabResult<Vec<SessionDescriptor>> {
        let index: IndexFile<SessionDescriptor> = match read_index(&self.dir) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Unreadable session index: {}", e);
                IndexFile::default()
            }
        };

        let on_disk = self.session_file_ids();
        let in_sync = index.entries.len() == on_disk.len()
            && index.entries.iter().all(|d| on_disk.contains(&d.id));
        if in_sync {
            return Ok(index.entries);
        }

        log::info!(
            "Session index lists {} of {} sessions, rebuilding from {:?}",
            index.entries.len(),
            on_disk.len(),
            self.dir
        );
        rebuild_index(
            &self.dir,
            |path| {
                read_json::<SessionFile>(path)
                    .map(|f| f.session)
                    .map_err(|e| log::warn!("Skipping unreadable session file: {}", e))
                    .ok()
            },
            |d: &SessionDescriptor| d.created_at,
        )
        .map_err(LabError::Storage)
    }

    /// Ids of the session files present on disk
    fn session_file_ids(&self) -> HashSet<String> {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
                    .filter_map(|path| {
                        path.file_stem()
                            .and_then(|stem| stem.to_str())
                            .filter(|stem| uuid::Uuid::parse_str(stem).is_ok())
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.session_path(id).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn descriptor(&self, id: &str) -> LabResult<SessionDescriptor> {
        Ok(self.read_file(id)?.session)
    }

    pub fn load(&self, id: &str) -> LabResult<SessionDocument> {
        Ok(self.read_file(id)?.document)
    }

    /// Overwrite the whole document of an existing session
    pub fn replace(&self, id: &str, document: &SessionDocument) -> LabResult<SessionDescriptor> {
        let mut file = self.read_file(id)?;
        let now = Utc::now();
        file.version = SESSION_FILE_VERSION;
        file.updated_at = now;
        file.session.updated_at = now;
        file.document = document.clone();
        self.write_file(&file)?;

        log::debug!("Persisted session {}", id);
        Ok(file.session)
    }

    /// Validate an untyped document and overwrite the stored one with it.
    /// Nothing is written when validation fails.
    pub fn replace_raw(&self, id: &str, document: Value) -> LabResult<SessionDescriptor> {
        let document = validate_document(document)?;
        self.replace(id, &document)
    }

    pub fn rename(&self, id: &str, name: &str) -> LabResult<SessionDescriptor> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LabError::validation("Session name cannot be empty"));
        }

        let mut file = self.read_file(id)?;
        let now = Utc::now();
        file.updated_at = now;
        file.session.updated_at = now;
        file.session.name = name.to_string();
        self.write_file(&file)?;
        Ok(file.session)
    }

    /// Delete a session. Deleting an unknown or already deleted id is NotFound.
    pub fn delete(&self, id: &str) -> LabResult<()> {
        let path = self.session_path(id)?;
        if !path.exists() {
            return Err(LabError::not_found("Session", id));
        }

        fs::remove_file(&path)
            .map_err(|e| LabError::storage(format!("Failed to delete {:?}: {}", path, e)))?;
        if let Err(e) = remove_index_entry::<SessionDescriptor>(&self.dir, id) {
            log::warn!("Failed to remove {} from session index: {}", id, e);
        }

        log::info!("Deleted session {}", id);
        Ok(())
    }
}

/// Check that an untyped value is a complete session document
pub fn validate_document(value: Value) -> LabResult<SessionDocument> {
    let object = value
        .as_object()
        .ok_or_else(|| LabError::validation("Session document must be a JSON object"))?;

    let missing: Vec<&str> = REQUIRED_DOCUMENT_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(LabError::validation(format!(
            "Session document is missing required keys: {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| LabError::validation(format!("Malformed session document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Person};
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        (temp_dir, store)
    }

    #[test]
    fn test_create_then_load_is_empty() {
        let (_dir, store) = store();
        let descriptor = store.create("Transit study").unwrap();

        assert_eq!(descriptor.name, "Transit study");
        assert_eq!(store.load(&descriptor.id).unwrap(), SessionDocument::default());
        assert!(store.exists(&descriptor.id));
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let (_dir, store) = store();
        let err = store.create("   ").unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_replace_round_trips() {
        let (_dir, store) = store();
        let descriptor = store.create("Alpha").unwrap();

        let mut doc = SessionDocument::default();
        doc.messages.push(Message::user("We need better buses"));
        doc.summary = "Improve bus ridership".to_string();
        doc.people.push(Person {
            id: "p1".to_string(),
            title: "Economist".to_string(),
            description: "Transport economist".to_string(),
        });

        let updated = store.replace(&descriptor.id, &doc).unwrap();
        assert!(updated.updated_at >= descriptor.updated_at);
        assert_eq!(store.load(&descriptor.id).unwrap(), doc);
    }

    #[test]
    fn test_load_unknown_is_not_found() {
        let (_dir, store) = store();
        let err = store
            .load("6f1c1a7e-0000-4000-8000-000000000000")
            .unwrap_err();
        assert!(matches!(err, LabError::NotFound { .. }));

        let err = store.load("../../etc/passwd").unwrap_err();
        assert!(matches!(err, LabError::NotFound { .. }));
    }

    #[test]
    fn test_replace_raw_missing_key_leaves_document_unchanged() {
        let (_dir, store) = store();
        let descriptor = store.create("Alpha").unwrap();

        let mut doc = SessionDocument::default();
        doc.summary = "kept".to_string();
        store.replace(&descriptor.id, &doc).unwrap();

        let malformed = serde_json::json!({
            "messages": [],
            "summary": "overwritten",
            "people": [],
            "meetings": [],
            "final_report": "",
            "report_chat_messages": []
        });
        let err = store.replace_raw(&descriptor.id, malformed).unwrap_err();
        match err {
            LabError::Validation(msg) => assert!(msg.contains("research_findings")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.load(&descriptor.id).unwrap().summary, "kept");
    }

    #[test]
    fn test_replace_raw_wrong_shape_is_validation() {
        let (_dir, store) = store();
        let descriptor = store.create("Alpha").unwrap();

        let malformed = serde_json::json!({
            "messages": "not a list",
            "summary": "",
            "people": [],
            "research_findings": [],
            "meetings": [],
            "final_report": "",
            "report_chat_messages": []
        });
        let err = store.replace_raw(&descriptor.id, malformed).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_replace_raw_accepts_complete_document() {
        let (_dir, store) = store();
        let descriptor = store.create("Alpha").unwrap();

        let raw = serde_json::to_value(SessionDocument {
            summary: "from raw".to_string(),
            ..Default::default()
        })
        .unwrap();
        store.replace_raw(&descriptor.id, raw).unwrap();
        assert_eq!(store.load(&descriptor.id).unwrap().summary, "from raw");
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let (_dir, store) = store();
        let descriptor = store.create("Doomed").unwrap();

        store.delete(&descriptor.id).unwrap();
        assert!(!store.exists(&descriptor.id));
        let err = store.delete(&descriptor.id).unwrap_err();
        assert!(matches!(err, LabError::NotFound { .. }));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_in_creation_order() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();
        let c = store.create("C").unwrap();

        // Touching an older session must not reorder the listing
        store.replace(&a.id, &SessionDocument::default()).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_list_rebuilds_missing_index() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        fs::remove_file(store.sessions_dir().join("index.json")).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_write_after_index_loss_keeps_every_session_listed() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        fs::remove_file(store.sessions_dir().join("index.json")).unwrap();
        // Recreates the index holding only A
        store.replace(&a.id, &SessionDocument::default()).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["A", "B"]);

        // Once repaired, later listings stay complete
        let c = store.create("C").unwrap();
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_list_drops_entries_whose_file_is_gone() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        fs::remove_file(store.sessions_dir().join(format!("{}.json", b.id))).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id]);
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let (_dir, store) = store();
        let descriptor = store.create("A").unwrap();

        // A directory in the temp file's place makes the write fail
        let temp_path = store.sessions_dir().join(format!("{}.tmp", descriptor.id));
        fs::create_dir(&temp_path).unwrap();

        let mut doc = SessionDocument::default();
        doc.summary = "never stored".to_string();
        let err = store.replace(&descriptor.id, &doc).unwrap_err();
        assert!(matches!(err, LabError::Storage(_)));
        assert_eq!(store.load(&descriptor.id).unwrap(), SessionDocument::default());
    }

    #[test]
    fn test_rename_updates_listing() {
        let (_dir, store) = store();
        let descriptor = store.create("Draft").unwrap();

        store.rename(&descriptor.id, "Final name").unwrap();

        assert_eq!(store.descriptor(&descriptor.id).unwrap().name, "Final name");
        assert_eq!(store.list().unwrap()[0].name, "Final name");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        let mut doc = SessionDocument::default();
        doc.summary = "only in A".to_string();
        store.replace(&a.id, &doc).unwrap();

        assert!(store.load(&b.id).unwrap().summary.is_empty());
    }
}
