//! Server application state shared across handlers

use crate::completion::{OpenAiClient, SharedCompletionClient};
use crate::config::ConfigState;
use crate::error::{LabError, LabResult};
use crate::file_storage::SessionStore;
use crate::research::{MeetingSelection, ResearchSession, WorkflowSettings};
use crate::shutdown::ShutdownState;
use crate::templates::PromptLibrary;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type SessionLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<MeetingSelection>>>>>;

/// Shared state for the server.
///
/// Each session gets its own async lock, so operations on one session run one
/// at a time while different sessions proceed independently. The lock also
/// holds the session's meeting selection between requests.
#[derive(Clone)]
pub struct ServerAppState {
    /// Authentication token for this server run
    pub auth_token: String,

    pub data_dir: PathBuf,

    pub store: SessionStore,

    pub prompts: Arc<RwLock<PromptLibrary>>,

    pub config_state: Arc<ConfigState>,

    pub shutdown_state: ShutdownState,

    /// Used instead of the configured HTTP client when set
    completion_override: Option<SharedCompletionClient>,

    session_locks: SessionLocks,
}

impl ServerAppState {
    pub fn new(
        auth_token: String,
        data_dir: &Path,
        config_state: ConfigState,
        prompts: PromptLibrary,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            auth_token,
            data_dir: data_dir.to_path_buf(),
            store: SessionStore::new(data_dir),
            prompts: Arc::new(RwLock::new(prompts)),
            config_state: Arc::new(config_state),
            shutdown_state,
            completion_override: None,
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Route every completion call through `client`
    pub fn with_completion_client(mut self, client: SharedCompletionClient) -> Self {
        self.completion_override = Some(client);
        self
    }

    /// The completion client for the current configuration
    pub fn completion_client(&self) -> LabResult<SharedCompletionClient> {
        if let Some(client) = &self.completion_override {
            return Ok(client.clone());
        }
        let settings = self.config_state.get_config()?.completion_settings();
        Ok(Arc::new(OpenAiClient::new(settings)?))
    }

    pub fn prompt_library(&self) -> LabResult<PromptLibrary> {
        self.prompts
            .read()
            .map(|p| p.clone())
            .map_err(|e| LabError::storage(format!("Failed to acquire prompt lock: {}", e)))
    }

    /// Run `f` against the shared prompt library with write access
    pub fn modify_prompts<T, F>(&self, f: F) -> LabResult<T>
    where
        F: FnOnce(&mut PromptLibrary) -> LabResult<T>,
    {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|e| LabError::storage(format!("Failed to acquire prompt lock: {}", e)))?;
        f(&mut prompts)
    }

    fn session_lock(&self, id: &str) -> LabResult<Arc<AsyncMutex<MeetingSelection>>> {
        let mut locks = self
            .session_locks
            .lock()
            .map_err(|e| LabError::storage(format!("Failed to acquire session locks: {}", e)))?;
        Ok(locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(MeetingSelection::default())))
            .clone())
    }

    /// Drop the lock entry of a deleted session
    pub fn forget_session(&self, id: &str) {
        if let Ok(mut locks) = self.session_locks.lock() {
            locks.remove(id);
        }
    }

    /// Open a session for exclusive use until the handle is dropped
    pub async fn open_session(&self, id: &str) -> LabResult<SessionHandle> {
        // Unknown ids never get a lock entry
        self.store.descriptor(id)?;

        let guard = self.session_lock(id)?.lock_owned().await;
        let settings = WorkflowSettings::from_config(&self.config_state.get_config()?);
        let mut session = ResearchSession::open(
            self.store.clone(),
            id,
            self.prompt_library()?,
            self.completion_client()?,
            settings,
        )?;
        session.restore_selection(guard.clone());

        Ok(SessionHandle { guard, session })
    }
}

/// A locked, loaded session. The meeting selection is carried over to the
/// next request when the handle is dropped.
pub struct SessionHandle {
    guard: OwnedMutexGuard<MeetingSelection>,
    session: ResearchSession,
}

impl Deref for SessionHandle {
    type Target = ResearchSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for SessionHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        *self.guard = self.session.selection().clone();
    }
}
