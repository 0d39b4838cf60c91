// Prompt library
//
// Resolution order for a prompt id:
// 1. User override stored in `{data_dir}/prompts.json`
// 2. Builtin - compiled-in default

pub mod builtin;
pub mod engine;

pub use engine::{render_template, validate_template, TemplateVars};

use crate::error::{LabError, LabResult};
use crate::file_storage::{read_json, write_json};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const PROMPTS_FILE_NAME: &str = "prompts.json";
const PROMPTS_FILE_VERSION: &str = "1.0";

/// A prompt as exposed to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub placeholders: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// On-disk prompt file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptFile {
    version: String,
    prompts: Vec<PromptEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptEntry {
    id: String,
    #[serde(default)]
    name: String,
    content: String,
}

/// Named prompt templates with validated placeholders
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    path: Option<PathBuf>,
    overrides: BTreeMap<String, String>,
}

impl PromptLibrary {
    /// A library that only serves builtins and never touches disk
    pub fn builtin() -> Self {
        Self {
            path: None,
            overrides: BTreeMap::new(),
        }
    }

    pub fn prompts_path(data_dir: &Path) -> PathBuf {
        data_dir.join(PROMPTS_FILE_NAME)
    }

    /// Load the library from `{data_dir}/prompts.json`.
    /// Every stored template is validated; ids that are not stored fall back to builtins.
    pub fn load(data_dir: &Path) -> LabResult<Self> {
        let path = Self::prompts_path(data_dir);
        let mut library = Self {
            path: Some(path.clone()),
            overrides: BTreeMap::new(),
        };

        if !path.exists() {
            log::debug!("No prompt file at {:?}, using builtin prompts", path);
            return Ok(library);
        }

        let file: PromptFile = read_json(&path).map_err(LabError::Storage)?;
        for entry in file.prompts {
            let Some(builtin) = builtin::get_builtin(&entry.id) else {
                log::warn!("Ignoring unknown prompt id '{}' in {:?}", entry.id, path);
                continue;
            };

            let content = engine::upgrade_legacy_placeholders(&entry.content);
            validate_template(&entry.id, &content, builtin.placeholders)?;
            if content != builtin.content {
                library.overrides.insert(entry.id, content);
            }
        }

        log::info!(
            "Loaded prompt library from {:?} ({} customized)",
            path,
            library.overrides.len()
        );
        Ok(library)
    }

    fn save(&self) -> LabResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = PromptFile {
            version: PROMPTS_FILE_VERSION.to_string(),
            prompts: builtin::BUILTIN_PROMPTS
                .iter()
                .map(|p| PromptEntry {
                    id: p.id.to_string(),
                    name: p.name.to_string(),
                    content: self.content(p.id).to_string(),
                })
                .collect(),
        };

        write_json(path, &file).map_err(LabError::Storage)
    }

    fn content(&self, id: &str) -> &str {
        self.overrides
            .get(id)
            .map(String::as_str)
            .or_else(|| builtin::get_builtin(id).map(|p| p.content))
            .unwrap_or_default()
    }

    /// Get a prompt by id
    pub fn get(&self, id: &str) -> LabResult<PromptTemplate> {
        let builtin =
            builtin::get_builtin(id).ok_or_else(|| LabError::not_found("Prompt", id))?;

        Ok(PromptTemplate {
            id: builtin.id.to_string(),
            name: builtin.name.to_string(),
            content: self.content(id).to_string(),
            placeholders: builtin.placeholders.iter().map(|s| s.to_string()).collect(),
            is_default: !self.overrides.contains_key(id),
        })
    }

    /// All prompts in workflow order
    pub fn list(&self) -> Vec<PromptTemplate> {
        builtin::BUILTIN_PROMPTS
            .iter()
            .filter_map(|p| self.get(p.id).ok())
            .collect()
    }

    /// Update several prompts at once. Nothing changes unless every entry validates.
    pub fn update(&mut self, updates: HashMap<String, String>) -> LabResult<()> {
        for (id, content) in &updates {
            let allowed = builtin::allowed_placeholders(id)
                .ok_or_else(|| LabError::not_found("Prompt", id))?;
            validate_template(id, content, allowed)?;
        }

        for (id, content) in updates {
            let is_default = builtin::get_builtin(&id).map_or(false, |p| p.content == content);
            if is_default {
                self.overrides.remove(&id);
            } else {
                self.overrides.insert(id, content);
            }
        }

        self.save()
    }

    /// Drop every customization and persist the builtin set
    pub fn reset_to_defaults(&mut self) -> LabResult<()> {
        self.overrides.clear();
        log::info!("Prompt library reset to defaults");
        self.save()
    }

    /// Render a prompt by id
    pub fn render(&self, id: &str, vars: &TemplateVars) -> LabResult<String> {
        let template = self.get(id)?;
        render_template(id, &template.content, vars)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::builtin::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_file_uses_builtins() {
        let temp_dir = TempDir::new().unwrap();
        let library = PromptLibrary::load(temp_dir.path()).unwrap();

        let prompt = library.get(PEOPLE_USER).unwrap();
        assert!(prompt.is_default);
        assert!(prompt.content.contains("{{ executive_summary }}"));
        assert_eq!(library.list().len(), BUILTIN_PROMPTS.len());
    }

    #[test]
    fn test_render_people_prompt() {
        let library = PromptLibrary::builtin();
        let rendered = library
            .render(
                PEOPLE_USER,
                &TemplateVars::new().with("executive_summary", "Reduce traffic deaths"),
            )
            .unwrap();
        assert!(rendered.contains("Reduce traffic deaths"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let mut library = PromptLibrary::load(temp_dir.path()).unwrap();

        let mut updates = HashMap::new();
        updates.insert(
            DISCOVERY_SUMMARIZE.to_string(),
            "Summarize in one paragraph.".to_string(),
        );
        library.update(updates).unwrap();

        let reloaded = PromptLibrary::load(temp_dir.path()).unwrap();
        let prompt = reloaded.get(DISCOVERY_SUMMARIZE).unwrap();
        assert_eq!(prompt.content, "Summarize in one paragraph.");
        assert!(!prompt.is_default);
    }

    #[test]
    fn test_update_rejects_unknown_placeholder_atomically() {
        let temp_dir = TempDir::new().unwrap();
        let mut library = PromptLibrary::load(temp_dir.path()).unwrap();

        let mut updates = HashMap::new();
        updates.insert(DISCOVERY_SUMMARIZE.to_string(), "Fine text".to_string());
        updates.insert(
            PEOPLE_USER.to_string(),
            "Team for {{ executive_sumary }}".to_string(),
        );

        let err = library.update(updates).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
        assert!(library.get(DISCOVERY_SUMMARIZE).unwrap().is_default);
        assert!(!PromptLibrary::prompts_path(temp_dir.path()).exists());
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut library = PromptLibrary::builtin();
        let mut updates = HashMap::new();
        updates.insert("made-up".to_string(), "text".to_string());
        assert!(matches!(
            library.update(updates).unwrap_err(),
            LabError::NotFound { .. }
        ));
    }

    #[test]
    fn test_reset_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut library = PromptLibrary::load(temp_dir.path()).unwrap();

        let mut updates = HashMap::new();
        updates.insert(REPORT_SYSTEM.to_string(), "Be brief.".to_string());
        library.update(updates).unwrap();
        library.reset_to_defaults().unwrap();

        let reloaded = PromptLibrary::load(temp_dir.path()).unwrap();
        assert!(reloaded.get(REPORT_SYSTEM).unwrap().is_default);
    }

    #[test]
    fn test_load_rejects_invalid_stored_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let file = serde_json::json!({
            "version": "1.0",
            "prompts": [{"id": "report-user-prompt", "name": "x", "content": "{{ nonsense }}"}]
        });
        write_json(&PromptLibrary::prompts_path(temp_dir.path()), &file).unwrap();

        let err = PromptLibrary::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_load_upgrades_legacy_placeholders() {
        let temp_dir = TempDir::new().unwrap();
        let file = serde_json::json!({
            "version": "1.0",
            "prompts": [{
                "id": "meeting-sub-report-prompt",
                "name": "Meeting Sub Report Prompt",
                "content": "Topic {MEETING_TOPIC}: {TRANSCRIPT}"
            }]
        });
        write_json(&PromptLibrary::prompts_path(temp_dir.path()), &file).unwrap();

        let library = PromptLibrary::load(temp_dir.path()).unwrap();
        let rendered = library
            .render(
                MEETING_SUB_REPORT,
                &TemplateVars::new()
                    .with("meeting_topic", "Parking")
                    .with("meeting_description", "")
                    .with("transcript", "[You]:\nHi"),
            )
            .unwrap();
        assert_eq!(rendered, "Topic Parking: [You]:\nHi");
    }
}
