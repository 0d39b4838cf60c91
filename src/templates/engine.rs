// Template rendering engine using Tera
//
// Prompts reference named placeholders (`{{ executive_summary }}`). Each
// prompt id has a fixed placeholder set, checked whenever a template is
// loaded or edited so a typo fails at save time rather than mid-workflow.

use crate::error::{LabError, LabResult};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use tera::{Context, Tera};

/// Variables passed to a template render
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    fn to_context(&self) -> Context {
        let mut context = Context::new();
        for (name, value) in &self.values {
            context.insert(*name, value);
        }
        context
    }
}

static PLACEHOLDER_PATTERN: OnceLock<Regex> = OnceLock::new();
static LEGACY_PLACEHOLDER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_PATTERN.get_or_init(|| Regex::new(r"\{\{-?\s*([A-Za-z_][A-Za-z0-9_]*)").unwrap())
}

fn legacy_placeholder_regex() -> &'static Regex {
    LEGACY_PLACEHOLDER_PATTERN.get_or_init(|| Regex::new(r"\{([A-Z][A-Z0-9_]*)\}").unwrap())
}

/// Names referenced by `{{ name }}` expressions in a template
pub fn extract_placeholders(content: &str) -> BTreeSet<String> {
    placeholder_regex()
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Rewrite `{EXECUTIVE_SUMMARY}` style placeholders from older prompt files
/// into `{{ executive_summary }}`
pub fn upgrade_legacy_placeholders(content: &str) -> String {
    legacy_placeholder_regex()
        .replace_all(content, |caps: &regex::Captures| {
            format!("{{{{ {} }}}}", caps[1].to_lowercase())
        })
        .into_owned()
}

/// Check that a template parses and only references allowed placeholders
pub fn validate_template(id: &str, content: &str, allowed: &[&str]) -> LabResult<()> {
    let mut tera = Tera::default();
    tera.add_raw_template(id, content)
        .map_err(|e| LabError::validation(format!("Prompt '{}' does not parse: {}", id, e)))?;

    let unknown: Vec<String> = extract_placeholders(content)
        .into_iter()
        .filter(|name| !allowed.contains(&name.as_str()))
        .collect();

    if !unknown.is_empty() {
        let allowed_list = if allowed.is_empty() {
            "none".to_string()
        } else {
            allowed.join(", ")
        };
        return Err(LabError::validation(format!(
            "Prompt '{}' references unknown placeholders: {} (allowed: {})",
            id,
            unknown.join(", "),
            allowed_list
        )));
    }

    Ok(())
}

/// Render a template string with the given variables
pub fn render_template(id: &str, content: &str, vars: &TemplateVars) -> LabResult<String> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(id, content)
        .map_err(|e| LabError::validation(format!("Prompt '{}' does not parse: {}", id, e)))?;

    tera.render(id, &vars.to_context())
        .map_err(|e| LabError::validation(format!("Failed to render prompt '{}': {}", id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_named_placeholders() {
        let vars = TemplateVars::new()
            .with("meeting_topic", "Congestion pricing")
            .with("transcript", "[Economist]:\nCharge peak hours");
        let rendered = render_template(
            "t",
            "Topic: {{ meeting_topic }}\n{{ transcript }}",
            &vars,
        )
        .unwrap();
        assert_eq!(
            rendered,
            "Topic: Congestion pricing\n[Economist]:\nCharge peak hours"
        );
    }

    #[test]
    fn test_render_does_not_escape_markup() {
        let vars = TemplateVars::new().with("summary", "<b>A & B</b> \"quoted\"");
        let rendered = render_template("t", "{{ summary }}", &vars).unwrap();
        assert_eq!(rendered, "<b>A & B</b> \"quoted\"");
    }

    #[test]
    fn test_render_keeps_literal_json_braces() {
        let rendered = render_template(
            "t",
            r#"Example: [{"title": "T"}]"#,
            &TemplateVars::new(),
        )
        .unwrap();
        assert_eq!(rendered, r#"Example: [{"title": "T"}]"#);
    }

    #[test]
    fn test_extract_placeholders() {
        let names = extract_placeholders("{{ a }} and {{b}} and {{- c }} and {{ a }}");
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_validate_rejects_unknown_placeholder() {
        let err = validate_template(
            "people-user-prompt",
            "{{ executive_summary }} {{ exec_sumary }}",
            &["executive_summary"],
        )
        .unwrap_err();
        match err {
            LabError::Validation(msg) => {
                assert!(msg.contains("exec_sumary"));
                assert!(msg.contains("executive_summary"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_unparseable_template() {
        let err = validate_template("x", "{{ summary ", &["summary"]).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_validate_accepts_allowed_placeholders() {
        validate_template("x", "Summary: {{ summary }}", &["summary"]).unwrap();
    }

    #[test]
    fn test_upgrade_legacy_placeholders() {
        let upgraded = upgrade_legacy_placeholders(
            "Task:\n{EXECUTIVE_SUMMARY}\nExample: [{\"title\": \"T\"}]",
        );
        assert_eq!(
            upgraded,
            "Task:\n{{ executive_summary }}\nExample: [{\"title\": \"T\"}]"
        );
    }
}
