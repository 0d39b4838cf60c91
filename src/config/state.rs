// Shared, mutable configuration held by the server

use super::{ApiKeyStatus, ConfigUpdate, LabConfig};
use crate::error::{LabError, LabResult};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub struct ConfigState {
    data_dir: PathBuf,
    config: RwLock<LabConfig>,
}

impl ConfigState {
    /// Load config from the data directory, falling back to defaults on error
    pub fn load(data_dir: &Path) -> Self {
        let config = match LabConfig::load(data_dir) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default config: {}", e);
                LabConfig::default()
            }
        };
        log::info!(
            "Loaded config: model={}, max_tokens={}, report_chat_on_regenerate={:?}",
            config.model,
            config.max_tokens,
            config.report_chat_on_regenerate
        );
        Self::with_config(data_dir, config)
    }

    pub fn with_config(data_dir: &Path, config: LabConfig) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config: RwLock::new(config),
        }
    }

    pub fn get_config(&self) -> LabResult<LabConfig> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|e| LabError::storage(format!("Failed to acquire config lock: {}", e)))
    }

    fn modify<F>(&self, f: F) -> LabResult<LabConfig>
    where
        F: FnOnce(&mut LabConfig),
    {
        let mut guard = self
            .config
            .write()
            .map_err(|e| LabError::storage(format!("Failed to acquire config lock: {}", e)))?;

        let mut updated = guard.clone();
        f(&mut updated);
        updated
            .validate()
            .map_err(|e| LabError::validation(e.to_string()))?;
        updated
            .save(&self.data_dir)
            .map_err(|e| LabError::storage(e.to_string()))?;

        *guard = updated.clone();
        Ok(updated)
    }

    pub fn update(&self, update: ConfigUpdate) -> LabResult<LabConfig> {
        self.modify(|config| config.apply_update(update))
    }

    /// Store a new API key. An empty key removes the stored one.
    pub fn set_api_key(&self, api_key: &str) -> LabResult<ApiKeyStatus> {
        let api_key = api_key.trim().to_string();
        let updated = self.modify(|config| {
            config.api_key = if api_key.is_empty() {
                None
            } else {
                Some(api_key)
            };
        })?;
        Ok(updated.api_key_status())
    }

    pub fn api_key_status(&self) -> LabResult<ApiKeyStatus> {
        Ok(self.get_config()?.api_key_status())
    }
}
