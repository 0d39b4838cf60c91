// User configuration stored in {data_dir}/config.toml
//
// The file holds the completion API key, so it is written with owner-only
// permissions on Unix. The model and base URL can be overridden from the
// environment; OPENAI_API_KEY is only used when no key is stored. Environment
// values are never written back.

pub mod state;

pub use state::ConfigState;

use crate::file_storage::atomic_write;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "VIRTUAL_LAB_MODEL";
pub const ENV_BASE_URL: &str = "VIRTUAL_LAB_BASE_URL";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MEETING_TURNS: usize = 10;

/// What happens to the report Q&A transcript when the report is regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportChatPolicy {
    /// Questions about an old report are discarded
    Clear,
    /// Questions carry over to the new report
    Retain,
}

impl Default for ReportChatPolicy {
    fn default() -> Self {
        ReportChatPolicy::Clear
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LabConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub default_meeting_turns: usize,
    pub report_chat_on_regenerate: ReportChatPolicy,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_meeting_turns: DEFAULT_MEETING_TURNS,
            report_chat_on_regenerate: ReportChatPolicy::Clear,
        }
    }
}

/// Partial update from the settings screen; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub default_meeting_turns: Option<usize>,
    pub report_chat_on_regenerate: Option<ReportChatPolicy>,
}

/// Where the effective API key comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeySource {
    Environment,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub source: Option<ApiKeySource>,
    /// Last four characters only
    pub hint: Option<String>,
}

/// Everything the completion client needs, with environment overrides applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl LabConfig {
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    /// Load config from disk, falling back to defaults when the file is absent
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::config_path(data_dir);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: LabConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to disk with owner-only permissions
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let path = Self::config_path(data_dir);

        let contents = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        atomic_write(&path, &contents).map_err(|e| anyhow!(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, permissions).map_err(|e| {
                anyhow!(
                    "Failed to set permissions on config file '{}': {}",
                    path.display(),
                    e
                )
            })?;
        }

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model cannot be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("base_url cannot be empty"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        if self.default_meeting_turns == 0 {
            return Err(anyhow!("default_meeting_turns must be at least 1"));
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(base_url) = update.base_url {
            self.base_url = base_url;
        }
        if let Some(max_tokens) = update.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(turns) = update.default_meeting_turns {
            self.default_meeting_turns = turns;
        }
        if let Some(policy) = update.report_chat_on_regenerate {
            self.report_chat_on_regenerate = policy;
        }
    }

    /// The stored key wins; the environment is the fallback
    pub fn effective_api_key(&self) -> Option<(String, ApiKeySource)> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some((key.clone(), ApiKeySource::Config));
        }
        env_value(ENV_API_KEY).map(|key| (key, ApiKeySource::Environment))
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        match self.effective_api_key() {
            Some((key, source)) => {
                let tail: String = key
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                ApiKeyStatus {
                    configured: true,
                    source: Some(source),
                    hint: Some(format!("...{}", tail)),
                }
            }
            None => ApiKeyStatus {
                configured: false,
                source: None,
                hint: None,
            },
        }
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            api_key: self.effective_api_key().map(|(key, _)| key),
            model: env_value(ENV_MODEL).unwrap_or_else(|| self.model.clone()),
            base_url: env_value(ENV_BASE_URL).unwrap_or_else(|| self.base_url.clone()),
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
