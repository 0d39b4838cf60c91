//! Parse structured lists out of free-form completion text

use crate::error::{LabError, LabResult};
use crate::models::{Person, ResearchFinding};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;

pub const TEAM_SIZE: usize = 5;
pub const FINDING_COUNT: usize = 10;

static JSON_ARRAY_PATTERN: OnceLock<Regex> = OnceLock::new();

fn json_array_regex() -> &'static Regex {
    JSON_ARRAY_PATTERN.get_or_init(|| Regex::new(r"\[[\s\S]*\]").unwrap())
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    topic: String,
    description: String,
    #[serde(default)]
    citation: String,
}

fn malformed(what: &str, detail: impl std::fmt::Display) -> LabError {
    LabError::upstream(None, format!("Malformed {} response: {}", what, detail))
}

/// Extract the outermost JSON array from completion text.
/// Models often wrap the array in prose or a fenced code block.
pub fn extract_json_array<T: DeserializeOwned>(text: &str, what: &str) -> LabResult<Vec<T>> {
    let json = json_array_regex()
        .find(text)
        .ok_or_else(|| malformed(what, "no JSON array found"))?;

    serde_json::from_str(json.as_str()).map_err(|e| malformed(what, e))
}

/// Parse exactly `TEAM_SIZE` people; extras are dropped, fewer is an error
pub fn parse_people(text: &str) -> LabResult<Vec<Person>> {
    let raw: Vec<RawPerson> = extract_json_array(text, "team")?;
    if raw.len() < TEAM_SIZE {
        return Err(malformed(
            "team",
            format!("expected {} people, got {}", TEAM_SIZE, raw.len()),
        ));
    }

    Ok(raw
        .into_iter()
        .take(TEAM_SIZE)
        .map(|p| Person {
            id: uuid::Uuid::new_v4().to_string(),
            title: p.title,
            description: p.description,
        })
        .collect())
}

/// Parse exactly `FINDING_COUNT` findings; extras are dropped, fewer is an error
pub fn parse_findings(text: &str) -> LabResult<Vec<ResearchFinding>> {
    let raw: Vec<RawFinding> = extract_json_array(text, "research")?;
    if raw.len() < FINDING_COUNT {
        return Err(malformed(
            "research",
            format!("expected {} findings, got {}", FINDING_COUNT, raw.len()),
        ));
    }

    Ok(raw
        .into_iter()
        .take(FINDING_COUNT)
        .map(|f| ResearchFinding {
            id: uuid::Uuid::new_v4().to_string(),
            topic: f.topic,
            description: f.description,
            citation: f.citation,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_json(n: usize) -> String {
        let items: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"title": "Expert {}", "description": "Bio {}"}}"#, i, i))
            .collect();
        format!("[{}]", items.join(", "))
    }

    #[test]
    fn test_parse_people_from_fenced_block() {
        let text = format!(
            "Here is the team:\n```json\n{}\n```\nGood luck!",
            people_json(5)
        );
        let people = parse_people(&text).unwrap();
        assert_eq!(people.len(), 5);
        assert_eq!(people[0].title, "Expert 0");
        assert_ne!(people[0].id, people[1].id);
    }

    #[test]
    fn test_parse_people_truncates_extras() {
        let people = parse_people(&people_json(7)).unwrap();
        assert_eq!(people.len(), 5);
        assert_eq!(people[4].title, "Expert 4");
    }

    #[test]
    fn test_parse_people_too_few_is_upstream_error() {
        let err = parse_people(&people_json(3)).unwrap_err();
        match err {
            LabError::Upstream { status, message } => {
                assert_eq!(status, None);
                assert!(message.contains("expected 5"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_without_array_is_upstream_error() {
        let err = parse_people("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, LabError::Upstream { .. }));
    }

    #[test]
    fn test_parse_findings_defaults_missing_citation() {
        let items: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"topic": "T{}", "description": "D{}"}}"#, i, i))
            .collect();
        let findings = parse_findings(&format!("[{}]", items.join(","))).unwrap();
        assert_eq!(findings.len(), 10);
        assert_eq!(findings[9].topic, "T9");
        assert!(findings[0].citation.is_empty());
    }

    #[test]
    fn test_parse_findings_wrong_shape() {
        let err = parse_findings(r#"[{"name": "missing topic"}]"#).unwrap_err();
        assert!(matches!(err, LabError::Upstream { .. }));
    }
}
